//! Batch augmentation of a video dataset.
//!
//! Each selected video runs through a chain of ffmpeg filters (brightness,
//! noise, translation, pixelization), one stage folder per link of the chain.
//! Videos not selected are copied unmodified into a holding folder. Runs are
//! resumable: finished stage outputs are skipped and per-file decisions are
//! replayed from a sidecar plan.

pub mod catalog;
pub mod cli;
pub mod error;
pub mod ffmpeg;
pub mod filters;
pub mod metadata;
pub mod orchestrator;
pub mod pipeline;
pub mod plan;
pub mod progress;
pub mod report;
pub mod selector;
pub mod tui;

pub use error::AugmentError;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Logs through `writer`; `RUST_LOG` wins over the verbosity flag.
pub fn init_tracing<W>(verbose: bool, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .try_init();
}
