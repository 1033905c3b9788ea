use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while augmenting a dataset.
///
/// Only setup problems abort a run; everything else is recorded per file
/// (or per stage) in the run report and the batch keeps going.
#[derive(Error, Debug)]
pub enum AugmentError {
    #[error("could not probe {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("transform of {input} into {output} failed: {reason}")]
    Transform {
        input: PathBuf,
        output: PathBuf,
        reason: String,
    },

    #[error("stage {stage} input is missing: {input}")]
    MissingInput { stage: usize, input: PathBuf },

    #[error("cannot select {requested} distinct augmentations, only {available} independent choices exist")]
    SelectionInfeasible { requested: usize, available: usize },

    #[error(
        "stored sequence {stored:?} no longer fits the catalog; delete {} to redraw it",
        join_paths(.leftovers)
    )]
    StaleSequence {
        stored: Vec<String>,
        leftovers: Vec<PathBuf>,
    },

    #[error("{folders} stage folders given for a sequence of {selected} augmentations")]
    StageMismatch { folders: usize, selected: usize },

    #[error("failed to copy {path} into {destination}: {source}")]
    Copy {
        path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog: {0}")]
    Catalog(String),

    #[error("augmentation plan {path}: {reason}")]
    Plan { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl AugmentError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
