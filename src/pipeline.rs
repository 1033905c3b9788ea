use crate::catalog::AugmentationDescriptor;
use crate::error::AugmentError;
use crate::selector::SelectedSequence;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const STAGING_PREFIX: &str = ".partial-";

/// Applies one filter parameter to `input`, writing `output`.
pub trait Transformer {
    fn transform(&self, input: &Path, output: &Path, parameter: &str) -> Result<(), AugmentError>;
}

#[derive(Debug)]
pub enum StageOutcome {
    Applied,
    /// Output already present from an earlier run.
    Skipped,
    Failed(AugmentError),
}

#[derive(Debug)]
pub struct StageReport {
    pub index: usize,
    pub name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcome: StageOutcome,
}

#[derive(Debug, Default)]
pub struct PipelineResult {
    pub stages: Vec<StageReport>,
}

impl PipelineResult {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, StageOutcome::Applied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StageOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, StageOutcome::Failed(_)))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&StageOutcome) -> bool) -> usize {
        self.stages.iter().filter(|s| pred(&s.outcome)).count()
    }
}

/// Runs a selected sequence over one source file, stage `i` writing into
/// `stage_folders[i]` and reading what stage `i - 1` left in its folder.
pub struct PipelineRunner<'a, T: Transformer + ?Sized> {
    transformer: &'a T,
    on_stage: Option<Box<dyn Fn(usize, usize, &str) + 'a>>,
}

impl<'a, T: Transformer + ?Sized> PipelineRunner<'a, T> {
    pub fn new(transformer: &'a T) -> Self {
        Self {
            transformer,
            on_stage: None,
        }
    }

    /// Called with `(index, total, name)` before each stage starts.
    pub fn on_stage(mut self, hook: impl Fn(usize, usize, &str) + 'a) -> Self {
        self.on_stage = Some(Box::new(hook));
        self
    }

    pub fn run(
        &self,
        source: &Path,
        sequence: &SelectedSequence,
        stage_folders: &[PathBuf],
    ) -> Result<PipelineResult, AugmentError> {
        if sequence.len() != stage_folders.len() {
            return Err(AugmentError::StageMismatch {
                folders: stage_folders.len(),
                selected: sequence.len(),
            });
        }
        let file_name = source.file_name().ok_or_else(|| AugmentError::MissingInput {
            stage: 0,
            input: source.to_path_buf(),
        })?;

        let mut result = PipelineResult::default();
        let mut input = source.to_path_buf();
        for (index, (descriptor, folder)) in sequence
            .descriptors()
            .iter()
            .zip(stage_folders)
            .enumerate()
        {
            let output = folder.join(file_name);
            if let Some(hook) = &self.on_stage {
                hook(index, stage_folders.len(), &descriptor.name);
            }
            let outcome = self.run_stage(index, descriptor, &input, &output);
            match &outcome {
                StageOutcome::Applied => info!(
                    stage = index,
                    augmentation = %descriptor.name,
                    file = %output.display(),
                    "stage done"
                ),
                StageOutcome::Skipped => info!(
                    stage = index,
                    augmentation = %descriptor.name,
                    file = %output.display(),
                    "skipping stage: output already exists"
                ),
                StageOutcome::Failed(err) => warn!(
                    stage = index,
                    augmentation = %descriptor.name,
                    "stage failed: {err}"
                ),
            }
            result.stages.push(StageReport {
                index,
                name: descriptor.name.clone(),
                input: input.clone(),
                output: output.clone(),
                outcome,
            });
            input = output;
        }
        Ok(result)
    }

    fn run_stage(
        &self,
        index: usize,
        descriptor: &AugmentationDescriptor,
        input: &Path,
        output: &Path,
    ) -> StageOutcome {
        if output.exists() {
            return StageOutcome::Skipped;
        }
        if !input.is_file() {
            return StageOutcome::Failed(AugmentError::MissingInput {
                stage: index,
                input: input.to_path_buf(),
            });
        }

        let staging = staging_path(output);
        if staging.exists() {
            debug!(file = %staging.display(), "removing stale partial output");
            if let Err(e) = fs::remove_file(&staging) {
                return StageOutcome::Failed(AugmentError::io(
                    format!("cannot remove stale {}", staging.display()),
                    e,
                ));
            }
        }

        if let Err(err) = self
            .transformer
            .transform(input, &staging, &descriptor.parameter)
        {
            let _ = fs::remove_file(&staging);
            return StageOutcome::Failed(err);
        }
        if !staging.is_file() {
            return StageOutcome::Failed(AugmentError::Transform {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                reason: "tool reported success but produced no output".into(),
            });
        }
        match fs::rename(&staging, output) {
            Ok(()) => StageOutcome::Applied,
            Err(e) => {
                let _ = fs::remove_file(&staging);
                StageOutcome::Failed(AugmentError::io(
                    format!("cannot move finished output to {}", output.display()),
                    e,
                ))
            }
        }
    }
}

/// Hidden sibling of `output` that keeps its extension, so the encoder
/// still infers the container from it.
pub fn staging_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(STAGING_PREFIX);
    if let Some(file_name) = output.file_name() {
        name.push(file_name);
    }
    output.with_file_name(name)
}

pub fn is_staging_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(STAGING_PREFIX))
}
