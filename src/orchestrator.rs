use crate::catalog::Catalog;
use crate::error::AugmentError;
use crate::metadata::{FolderStats, MetadataProvider, folder_stats, list_media_files};
use crate::pipeline::{PipelineRunner, StageOutcome, Transformer, staging_path};
use crate::plan::{FilePlan, PLAN_FILE_NAME, PlanStore};
use crate::progress::BatchProgress;
use crate::report::{FileFailure, RunReport};
use crate::selector::{SelectedSequence, Selector, replay};
use rand::Rng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const AUGMENTED_DIR: &str = "Augmented Dataset Videos";
pub const HOLDING_DIR: &str = "Not Augmented Videos";
pub const DEFAULT_PROBABILITY: f64 = 0.30;

/// Where every output of a run goes.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub augmented_root: PathBuf,
    pub stage_names: Vec<String>,
    pub stage_folders: Vec<PathBuf>,
    pub holding_folder: PathBuf,
}

impl Layout {
    pub fn new(output_root: &Path, stage_names: &[String]) -> Self {
        let augmented_root = output_root.join(AUGMENTED_DIR);
        Self {
            stage_folders: stage_names.iter().map(|n| augmented_root.join(n)).collect(),
            stage_names: stage_names.to_vec(),
            holding_folder: output_root.join(HOLDING_DIR),
            augmented_root,
        }
    }

    pub fn plan_path(&self) -> PathBuf {
        self.augmented_root.join(PLAN_FILE_NAME)
    }

    pub fn stage_count(&self) -> usize {
        self.stage_folders.len()
    }

    fn create(&self) -> Result<(), AugmentError> {
        let folders = std::iter::once(&self.augmented_root)
            .chain(&self.stage_folders)
            .chain(std::iter::once(&self.holding_folder));
        for folder in folders {
            fs::create_dir_all(folder)
                .map_err(|e| AugmentError::io(format!("cannot create {}", folder.display()), e))?;
            info!("Verified folder: {}", folder.display());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub probability: f64,
    /// Cap on files routed through augmentation in one run.
    pub limit: Option<usize>,
    pub extensions: Vec<String>,
}

impl RunOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            probability: DEFAULT_PROBABILITY,
            limit: None,
            extensions: vec!["mp4".to_string()],
        }
    }
}

/// A NaN probability never includes.
pub fn decide_inclusion<R: Rng>(rng: &mut R, probability: f64) -> bool {
    if probability.is_nan() {
        return false;
    }
    rng.gen_bool(probability.clamp(0.0, 1.0))
}

pub struct Orchestrator<'a, R: Rng = StdRng> {
    catalog: Catalog,
    layout: Layout,
    options: RunOptions,
    transformer: &'a dyn Transformer,
    metadata: &'a dyn MetadataProvider,
    selector: Selector<R>,
    progress: BatchProgress,
}

impl<'a, R: Rng> Orchestrator<'a, R> {
    pub fn new(
        catalog: Catalog,
        layout: Layout,
        options: RunOptions,
        transformer: &'a dyn Transformer,
        metadata: &'a dyn MetadataProvider,
        selector: Selector<R>,
    ) -> Self {
        Self {
            catalog,
            layout,
            options,
            transformer,
            metadata,
            selector,
            progress: BatchProgress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: BatchProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Processes every media file of the input folder. Only setup problems
    /// (infeasible stage count, unlistable input, uncreatable folders) return
    /// an error; per-file problems end up in the report.
    pub fn run(&mut self) -> Result<RunReport, AugmentError> {
        let started = Instant::now();
        let k = self.layout.stage_count();
        let available = self.catalog.group_count();
        if k > available {
            return Err(AugmentError::SelectionInfeasible {
                requested: k,
                available,
            });
        }

        let files = list_media_files(&self.options.input, &self.options.extensions)?;
        self.layout.create()?;

        let mut report = RunReport {
            stage_count: k,
            ..Default::default()
        };

        info!("Calculating total duration of {} videos...", files.len());
        let durations = self.probe_sources(&files, &mut report);
        info!(
            "Original total duration: {}",
            crate::report::format_hms(report.source_before.total_duration_seconds)
        );

        let mut plans = PlanStore::open(self.layout.plan_path());
        self.progress.set_total(files.len() as u64);

        for (position, file) in files.iter().enumerate() {
            if self
                .options
                .limit
                .is_some_and(|limit| report.processed_count >= limit)
            {
                report.skipped_by_limit = files.len() - position;
                info!("Reached limit of {} augmented videos, stopping", report.processed_count);
                break;
            }

            let name = file_key(file);
            self.progress.start_file(&name);
            let stored = plans.get(&name).cloned();
            let augmented = match &stored {
                Some(plan) => plan.augmented,
                None => decide_inclusion(self.selector.rng_mut(), self.options.probability),
            };

            if augmented {
                let duration = durations.get(file).copied().unwrap_or(0.0);
                self.augment(file, &name, duration, stored, &mut plans, &mut report);
            } else {
                self.hold_back(file, &name, stored.is_none(), &mut plans, &mut report);
            }
            self.progress.finish_file();
        }

        report.stage_stats = self
            .layout
            .stage_names
            .iter()
            .zip(&self.layout.stage_folders)
            .map(|(name, folder)| {
                (
                    name.clone(),
                    folder_stats(self.metadata, folder, &self.options.extensions),
                )
            })
            .collect();
        report.holding_stats = folder_stats(
            self.metadata,
            &self.layout.holding_folder,
            &self.options.extensions,
        );

        self.progress.finish();
        report.elapsed = started.elapsed();
        info!(
            processed = report.processed_count,
            excluded = report.excluded_count,
            failures = report.failures.len(),
            "All videos have been processed"
        );
        Ok(report)
    }

    fn probe_sources(&self, files: &[PathBuf], report: &mut RunReport) -> HashMap<PathBuf, f64> {
        let mut durations = HashMap::new();
        let mut before = FolderStats::default();
        for file in files {
            let probed = self
                .metadata
                .duration_seconds(file)
                .and_then(|d| self.metadata.size_bytes(file).map(|s| (d, s)));
            match probed {
                Ok((duration, size)) => {
                    before.total_duration_seconds += duration;
                    before.total_size_bytes += size;
                    before.file_count += 1;
                    durations.insert(file.clone(), duration);
                }
                Err(err) => {
                    warn!("{err}");
                    report.probe_warnings.push(err);
                }
            }
        }
        report.source_before = before;
        durations
    }

    /// Replays the stored sequence when it still fits. A stale one is only
    /// redrawn once none of its stage outputs remain, so a chain never mixes
    /// filters from two sequences.
    fn sequence_for(
        &mut self,
        name: &str,
        stored: Option<FilePlan>,
        k: usize,
    ) -> Result<(SelectedSequence, bool), AugmentError> {
        if let Some(plan) = stored.filter(|p| p.augmented && !p.stages.is_empty()) {
            if let Some(seq) = replay(&self.catalog, &plan.stages, k) {
                return Ok((seq, true));
            }
            let leftovers: Vec<PathBuf> = self
                .layout
                .stage_folders
                .iter()
                .map(|folder| folder.join(name))
                .filter(|output| output.exists())
                .collect();
            if !leftovers.is_empty() {
                return Err(AugmentError::StaleSequence {
                    stored: plan.stages,
                    leftovers,
                });
            }
            warn!(
                "stored sequence {:?} no longer fits the catalog, drawing a new one",
                plan.stages
            );
        }
        Ok((self.selector.select(&self.catalog, k)?, false))
    }

    fn augment(
        &mut self,
        file: &Path,
        name: &str,
        duration: f64,
        stored: Option<FilePlan>,
        plans: &mut PlanStore,
        report: &mut RunReport,
    ) {
        let k = self.layout.stage_count();
        report.processed_count += 1;
        info!("Processing video {}: {name}", report.processed_count);

        let (sequence, replayed) = match self.sequence_for(name, stored, k) {
            Ok(found) => found,
            Err(error) => {
                warn!("cannot select augmentations for {name}: {error}");
                report.failures.push(FileFailure {
                    file: file.to_path_buf(),
                    stage: None,
                    error,
                });
                return;
            }
        };
        if replayed {
            debug!(sequence = ?sequence.names(), "replaying stored sequence");
        } else if let Err(error) = plans.record(
            name,
            FilePlan {
                augmented: true,
                stages: sequence.names(),
            },
        ) {
            warn!("{error}");
            report.failures.push(FileFailure {
                file: file.to_path_buf(),
                stage: None,
                error,
            });
        }

        report.total_source_seconds += duration;
        report.total_augmented_seconds += duration * k as f64;

        let progress = self.progress.clone();
        let result = PipelineRunner::new(self.transformer)
            .on_stage(move |i, total, stage| progress.start_stage(i, total, stage))
            .run(file, &sequence, &self.layout.stage_folders);
        let result = match result {
            Ok(result) => result,
            Err(error) => {
                report.failures.push(FileFailure {
                    file: file.to_path_buf(),
                    stage: None,
                    error,
                });
                return;
            }
        };

        report.stages_applied += result.applied();
        report.stages_skipped += result.skipped();
        report.stages_failed += result.failed();
        for stage in result.stages {
            if let StageOutcome::Failed(error) = stage.outcome {
                report.failures.push(FileFailure {
                    file: file.to_path_buf(),
                    stage: Some(stage.index),
                    error,
                });
            }
        }
    }

    fn hold_back(
        &self,
        file: &Path,
        name: &str,
        fresh: bool,
        plans: &mut PlanStore,
        report: &mut RunReport,
    ) {
        report.excluded_count += 1;
        if fresh {
            let plan = FilePlan {
                augmented: false,
                stages: Vec::new(),
            };
            if let Err(error) = plans.record(name, plan) {
                warn!("{error}");
                report.failures.push(FileFailure {
                    file: file.to_path_buf(),
                    stage: None,
                    error,
                });
            }
        }

        let destination = self.layout.holding_folder.join(name);
        if destination.exists() {
            debug!("{name} already in {}", self.layout.holding_folder.display());
            return;
        }
        match copy_atomically(file, &destination) {
            Ok(()) => {
                report.copied_count += 1;
                debug!("copied {name} unmodified");
            }
            Err(source) => {
                let error = AugmentError::Copy {
                    path: file.to_path_buf(),
                    destination,
                    source,
                };
                warn!("{error}");
                report.failures.push(FileFailure {
                    file: file.to_path_buf(),
                    stage: None,
                    error,
                });
            }
        }
    }
}

fn file_key(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn copy_atomically(from: &Path, to: &Path) -> std::io::Result<()> {
    let staging = staging_path(to);
    let copied = fs::copy(from, &staging).and_then(|_| fs::rename(&staging, to));
    if copied.is_err() {
        let _ = fs::remove_file(&staging);
    }
    copied
}
