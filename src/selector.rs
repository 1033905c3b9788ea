use crate::catalog::{AugmentationDescriptor, Catalog};
use crate::error::AugmentError;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

/// Augmentations chosen for one file, in application order.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedSequence {
    descriptors: Vec<AugmentationDescriptor>,
}

impl SelectedSequence {
    pub fn descriptors(&self) -> &[AugmentationDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Draws distinct augmentations from a catalog using an owned, seedable RNG.
pub struct Selector<R: Rng = StdRng> {
    rng: R,
}

impl Selector<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> Selector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Picks `k` groups without replacement in random order, then one member
    /// of each. Never loops: infeasible `k` is rejected up front.
    pub fn select(
        &mut self,
        catalog: &Catalog,
        k: usize,
    ) -> Result<SelectedSequence, AugmentError> {
        let groups = catalog.groups();
        if k > groups.len() {
            return Err(AugmentError::SelectionInfeasible {
                requested: k,
                available: groups.len(),
            });
        }

        let mut descriptors = Vec::with_capacity(k);
        for idx in rand::seq::index::sample(&mut self.rng, groups.len(), k) {
            if let Some(choice) = groups[idx].choose(&mut self.rng) {
                descriptors.push((*choice).clone());
            }
        }
        Ok(SelectedSequence { descriptors })
    }
}

/// Rebuilds a previously stored sequence. Returns `None` when the record no
/// longer fits the catalog or the requested length, so the caller redraws.
pub fn replay(catalog: &Catalog, names: &[String], k: usize) -> Option<SelectedSequence> {
    if names.len() != k {
        return None;
    }
    let mut seen = HashSet::new();
    let mut descriptors: Vec<AugmentationDescriptor> = Vec::with_capacity(k);
    for name in names {
        let d = catalog.get(name)?;
        if !seen.insert(name.as_str()) || descriptors.iter().any(|prev| prev.excludes(d)) {
            return None;
        }
        descriptors.push(d.clone());
    }
    Some(SelectedSequence { descriptors })
}
