use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use video_augmenter::cli::Cli;
use video_augmenter::ffmpeg::{FfmpegTransformer, FfprobeMetadata, resolve_tools};
use video_augmenter::orchestrator::Orchestrator;
use video_augmenter::progress::BatchProgress;
use video_augmenter::selector::Selector;
use video_augmenter::{init_tracing, tui};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = match cli.into_config()? {
        Some(cfg) => cfg,
        None => tui::interactive_config()?,
    };
    // ffmpeg's own log goes straight to the terminal in verbose mode
    let progress = if cfg.verbose {
        BatchProgress::hidden()
    } else {
        BatchProgress::new()
    };
    init_tracing(cfg.verbose, progress.log_writer());

    let tools = resolve_tools(cfg.ffmpeg.clone(), cfg.ffprobe.clone())?;
    let catalog = cfg.catalog()?;

    let transformer = FfmpegTransformer::new(tools.clone())
        .verbose(cfg.verbose)
        .timeout(cfg.timeout)
        .with_progress(progress.stage_bar());
    let metadata = FfprobeMetadata::new(tools);
    let selector = match cfg.seed {
        Some(seed) => Selector::seeded(seed),
        None => Selector::from_entropy(),
    };

    let mut orchestrator = Orchestrator::new(
        catalog,
        cfg.layout(),
        cfg.run_options(),
        &transformer,
        &metadata,
        selector,
    )
    .with_progress(progress);
    let report = orchestrator.run()?;

    println!("{}", report.summary());
    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
