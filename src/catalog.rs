use crate::error::AugmentError;
use crate::filters;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// One named transform: the filter string handed to the encoder plus an
/// optional exclusion group shared with its alternatives.
#[derive(Debug, Clone, Deserialize)]
pub struct AugmentationDescriptor {
    pub name: String,
    pub parameter: String,
    #[serde(default)]
    pub exclusion_group: Option<String>,
}

impl AugmentationDescriptor {
    pub fn new(name: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter: parameter.into(),
            exclusion_group: None,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.exclusion_group = Some(group.into());
        self
    }

    /// True when both descriptors belong to the same non-null group.
    pub fn excludes(&self, other: &AugmentationDescriptor) -> bool {
        match (&self.exclusion_group, &other.exclusion_group) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for AugmentationDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for AugmentationDescriptor {}

/// Knobs for the built-in augmentations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterTuning {
    pub brightness_delta: f64,
    pub noise_strength: u8,
    pub shift_px: u32,
    pub block_px: u32,
}

impl Default for FilterTuning {
    fn default() -> Self {
        Self {
            brightness_delta: filters::DEFAULT_BRIGHTNESS_DELTA,
            noise_strength: filters::DEFAULT_NOISE_STRENGTH,
            shift_px: filters::DEFAULT_SHIFT_PX,
            block_px: filters::DEFAULT_BLOCK_PX,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "augmentation", default)]
    augmentations: Vec<AugmentationDescriptor>,
}

/// Ordered set of descriptors with unique names.
#[derive(Debug, Clone)]
pub struct Catalog {
    descriptors: Vec<AugmentationDescriptor>,
}

impl Catalog {
    pub fn new(descriptors: Vec<AugmentationDescriptor>) -> Result<Self, AugmentError> {
        if descriptors.is_empty() {
            return Err(AugmentError::Catalog("catalog has no augmentations".into()));
        }
        let mut seen = HashSet::new();
        for d in &descriptors {
            if d.name.trim().is_empty() {
                return Err(AugmentError::Catalog("augmentation name is empty".into()));
            }
            if d.parameter.trim().is_empty() {
                return Err(AugmentError::Catalog(format!(
                    "augmentation `{}` has an empty parameter",
                    d.name
                )));
            }
            if !seen.insert(d.name.as_str()) {
                return Err(AugmentError::Catalog(format!(
                    "duplicate augmentation name `{}`",
                    d.name
                )));
            }
        }
        Ok(Self { descriptors })
    }

    pub fn builtin(tuning: FilterTuning) -> Self {
        Self {
            descriptors: vec![
                AugmentationDescriptor::new(
                    "Brighter",
                    filters::brightness_filter(tuning.brightness_delta),
                )
                .in_group("brightness"),
                AugmentationDescriptor::new(
                    "Dimmer",
                    filters::brightness_filter(-tuning.brightness_delta),
                )
                .in_group("brightness"),
                AugmentationDescriptor::new("Noise", filters::noise_filter(tuning.noise_strength)),
                AugmentationDescriptor::new(
                    "Translation",
                    filters::translation_filter(tuning.shift_px),
                ),
                AugmentationDescriptor::new(
                    "Superpixel",
                    filters::superpixel_filter(tuning.block_px),
                ),
            ],
        }
    }

    /// Reads `[[augmentation]]` tables from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, AugmentError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| AugmentError::io(format!("cannot read {}", path.display()), e))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AugmentError> {
        let file: CatalogFile =
            toml::from_str(raw).map_err(|e| AugmentError::Catalog(e.to_string()))?;
        Self::new(file.augmentations)
    }

    pub fn get(&self, name: &str) -> Option<&AugmentationDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AugmentationDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Partitions the catalog into mutually exclusive choices: every named
    /// group collapses into one entry, every ungrouped descriptor is its own.
    /// Groups keep the catalog order of their first member.
    pub fn groups(&self) -> Vec<Vec<&AugmentationDescriptor>> {
        let mut groups: Vec<Vec<&AugmentationDescriptor>> = Vec::new();
        for d in &self.descriptors {
            let existing = d
                .exclusion_group
                .as_ref()
                .and_then(|_| groups.iter().position(|g| g[0].excludes(d)));
            match existing {
                Some(idx) => groups[idx].push(d),
                None => groups.push(vec![d]),
            }
        }
        groups
    }

    /// Largest sequence length the exclusion constraints allow.
    pub fn group_count(&self) -> usize {
        self.groups().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin(FilterTuning::default());
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.group_count(), 4);
        let names: Vec<&str> = catalog.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            ["Brighter", "Dimmer", "Noise", "Translation", "Superpixel"]
        );
        assert_eq!(
            catalog.get("Dimmer").map(|d| d.parameter.as_str()),
            Some("eq=brightness=-0.3")
        );
        assert!(catalog.get("Sepia").is_none());
    }

    #[test]
    fn test_tuning_flows_into_parameters() {
        let catalog = Catalog::builtin(FilterTuning {
            brightness_delta: 0.1,
            noise_strength: 20,
            shift_px: 8,
            block_px: 4,
        });
        assert_eq!(catalog.get("Brighter").unwrap().parameter, "eq=brightness=0.1");
        assert_eq!(catalog.get("Noise").unwrap().parameter, "noise=c0s=20:c0f=t+u");
        assert!(catalog.get("Translation").unwrap().parameter.contains("pad=iw+8:ih+8:8:8"));
        assert_eq!(
            catalog.get("Superpixel").unwrap().parameter,
            "pixelize=width=4:height=4"
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Catalog::new(vec![
            AugmentationDescriptor::new("Bright", "eq=brightness=0.3"),
            AugmentationDescriptor::new("Bright", "eq=brightness=0.2"),
        ])
        .unwrap_err();
        assert!(matches!(err, AugmentError::Catalog(msg) if msg.contains("Bright")));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(Catalog::new(Vec::new()).is_err());
        assert!(Catalog::new(vec![AugmentationDescriptor::new(" ", "x")]).is_err());
        assert!(Catalog::new(vec![AugmentationDescriptor::new("X", "")]).is_err());
    }

    #[test]
    fn test_groups_collapse_exclusion_labels() {
        let catalog = Catalog::new(vec![
            AugmentationDescriptor::new("A", "a").in_group("g"),
            AugmentationDescriptor::new("B", "b"),
            AugmentationDescriptor::new("C", "c").in_group("g"),
            AugmentationDescriptor::new("D", "d").in_group("h"),
        ])
        .unwrap();
        let groups: Vec<Vec<&str>> = catalog
            .groups()
            .iter()
            .map(|g| g.iter().map(|d| d.name.as_str()).collect())
            .collect();
        assert_eq!(groups, vec![vec!["A", "C"], vec!["B"], vec!["D"]]);
        assert_eq!(catalog.group_count(), 3);
    }

    #[test]
    fn test_descriptor_equality_by_name() {
        let a = AugmentationDescriptor::new("Bright", "eq=brightness=0.3");
        let b = AugmentationDescriptor::new("Bright", "eq=brightness=0.5").in_group("x");
        assert_eq!(a, b);
        assert!(!a.excludes(&b));
    }

    #[test]
    fn test_catalog_from_toml() {
        let raw = r#"
            [[augmentation]]
            name = "Brighter"
            parameter = "eq=brightness=0.3"
            exclusion_group = "brightness"

            [[augmentation]]
            name = "Dimmer"
            parameter = "eq=brightness=-0.3"
            exclusion_group = "brightness"

            [[augmentation]]
            name = "Flip"
            parameter = "hflip"
        "#;
        let catalog = Catalog::from_toml_str(raw).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.group_count(), 2);
        assert_eq!(catalog.get("Flip").unwrap().exclusion_group, None);
    }

    #[test]
    fn test_catalog_from_toml_rejects_garbage() {
        assert!(Catalog::from_toml_str("augmentation = 3").is_err());
        assert!(Catalog::from_toml_str("").is_err());
    }
}
