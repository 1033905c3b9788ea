use crate::catalog::{Catalog, FilterTuning};
use crate::filters::{
    DEFAULT_BLOCK_PX, DEFAULT_BRIGHTNESS_DELTA, DEFAULT_NOISE_STRENGTH, DEFAULT_SHIFT_PX,
    validate_brightness_delta, validate_noise_strength, validate_positive_px,
    validate_probability,
};
use crate::orchestrator::{Layout, RunOptions};
use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueHint};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_STAGES: u16 = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

#[derive(Parser, Debug)]
#[command(
    name = "video_augmenter",
    version,
    about = "Augment a folder of videos with chained brightness, noise, translation and pixelization variants"
)]
pub struct Cli {
    /// Folder of source videos (omit to be prompted interactively)
    #[arg(short = 'i', long, value_hint = ValueHint::DirPath)]
    pub input: Option<PathBuf>,

    /// Where the output folders are created (default: parent of the input folder)
    #[arg(short = 'o', long, value_hint = ValueHint::DirPath)]
    pub output_root: Option<PathBuf>,

    /// Chance (0.0..1.0) that a video is augmented rather than copied unmodified
    #[arg(short = 'p', long, default_value = "0.3", value_parser = validate_probability)]
    pub probability: f64,

    /// Number of chained stages; folders are named "Stage 1", "Stage 2", ...
    #[arg(short = 'k', long, default_value_t = DEFAULT_STAGES,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub stages: u16,

    /// Explicit stage folder name, repeat in stage order (overrides --stages)
    #[arg(long = "stage-name", value_name = "NAME")]
    pub stage_names: Vec<String>,

    /// TOML file with [[augmentation]] entries (default: built-in catalog)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub catalog: Option<PathBuf>,

    /// Seed for inclusion and augmentation draws (default: random)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after augmenting this many videos
    #[arg(long)]
    pub limit: Option<usize>,

    /// Video file extensions to pick up (comma separated)
    #[arg(long = "ext", default_value = "mp4", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Seconds before a single ffmpeg run is killed (0 = no limit)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Brightness offset used by Brighter/Dimmer
    #[arg(long, default_value_t = DEFAULT_BRIGHTNESS_DELTA, value_parser = validate_brightness_delta)]
    pub brightness_delta: f64,

    /// Noise strength 1..100
    #[arg(long, default_value_t = DEFAULT_NOISE_STRENGTH, value_parser = validate_noise_strength)]
    pub noise_strength: u8,

    /// Translation shift in pixels
    #[arg(long, default_value_t = DEFAULT_SHIFT_PX, value_parser = validate_positive_px)]
    pub shift_px: u32,

    /// Superpixel block size in pixels
    #[arg(long, default_value_t = DEFAULT_BLOCK_PX, value_parser = validate_positive_px)]
    pub block_px: u32,

    /// Show raw ffmpeg logs and debug events
    #[arg(long, action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Path to ffmpeg binary (overrides PATH lookup)
    #[arg(long, value_hint = ValueHint::ExecutablePath)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to ffprobe binary (overrides PATH lookup)
    #[arg(long, value_hint = ValueHint::ExecutablePath)]
    pub ffprobe: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input: PathBuf,
    pub output_root: PathBuf,
    pub probability: f64,
    pub stage_names: Vec<String>,
    pub catalog_file: Option<PathBuf>,
    pub tuning: FilterTuning,
    pub seed: Option<u64>,
    pub limit: Option<usize>,
    pub extensions: Vec<String>,
    pub timeout: Option<Duration>,
    pub verbose: bool,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

impl Cli {
    /// `None` when no input folder was given, i.e. interactive mode.
    pub fn into_config(self) -> Result<Option<AppConfig>> {
        let Some(input) = self.input else {
            return Ok(None);
        };
        let stage_names = if self.stage_names.is_empty() {
            default_stage_names(self.stages)
        } else {
            self.stage_names
        };
        let output_root = match self.output_root {
            Some(root) => root,
            None => default_output_root(&input)?,
        };

        let cfg = AppConfig {
            input,
            output_root,
            probability: self.probability,
            stage_names,
            catalog_file: self.catalog,
            tuning: FilterTuning {
                brightness_delta: self.brightness_delta,
                noise_strength: self.noise_strength,
                shift_px: self.shift_px,
                block_px: self.block_px,
            },
            seed: self.seed,
            limit: self.limit,
            extensions: normalize_extensions(&self.extensions),
            timeout: timeout_from_secs(self.timeout_secs),
            verbose: self.verbose,
            ffmpeg: self.ffmpeg,
            ffprobe: self.ffprobe,
        };
        cfg.validate()?;
        Ok(Some(cfg))
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.input.is_dir() {
            bail!("Input folder not found: {}", self.input.display());
        }
        if !(0.0..=1.0).contains(&self.probability) {
            bail!("Probability must be between 0.0 and 1.0");
        }
        if self.extensions.is_empty() {
            bail!("At least one video extension is required");
        }
        validate_stage_names(&self.stage_names)?;

        let catalog = self.catalog()?;
        if self.stage_names.len() > catalog.group_count() {
            bail!(
                "{} stages requested but the catalog only offers {} independent augmentations",
                self.stage_names.len(),
                catalog.group_count()
            );
        }
        Ok(())
    }

    pub fn catalog(&self) -> Result<Catalog> {
        match &self.catalog_file {
            Some(path) => Catalog::from_toml_file(path)
                .with_context(|| format!("failed to load catalog {}", path.display())),
            None => Ok(Catalog::builtin(self.tuning)),
        }
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.output_root, &self.stage_names)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            input: self.input.clone(),
            probability: self.probability,
            limit: self.limit,
            extensions: self.extensions.clone(),
        }
    }
}

pub fn default_stage_names(count: u16) -> Vec<String> {
    (1..=count).map(|i| format!("Stage {i}")).collect()
}

/// The folder that contains `input`, so outputs sit next to the dataset.
pub fn default_output_root(input: &Path) -> Result<PathBuf> {
    let absolute = input
        .canonicalize()
        .with_context(|| format!("Input folder not found: {}", input.display()))?;
    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(absolute))
}

pub fn normalize_extensions(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty() && seen.insert(e.clone()))
        .collect()
}

pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

pub(crate) fn validate_stage_names(names: &[String]) -> Result<()> {
    if names.is_empty() {
        bail!("At least one stage is required");
    }
    let mut seen = HashSet::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("Stage folder names must not be empty");
        }
        if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
            bail!("Stage folder name `{name}` must be a plain folder name");
        }
        if !seen.insert(trimmed) {
            bail!("Stage folder `{name}` is listed twice");
        }
    }
    Ok(())
}
