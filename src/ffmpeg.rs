use crate::error::AugmentError;
use crate::metadata::MetadataProvider;
use crate::pipeline::Transformer;
use crate::progress::pump_progress;
use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;
use which::which;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct Tools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

pub fn resolve_tools(ffmpeg: Option<PathBuf>, ffprobe: Option<PathBuf>) -> Result<Tools> {
    Ok(Tools {
        ffmpeg: resolve_bin(ffmpeg, "ffmpeg")?,
        ffprobe: resolve_bin(ffprobe, "ffprobe")?,
    })
}

pub fn probe_duration_seconds(tools: &Tools, input: &Path) -> Result<f64> {
    let out = Command::new(&tools.ffprobe)
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(input)
        .output()
        .context("failed to run ffprobe")?;
    if !out.status.success() {
        bail!("ffprobe error (status {})", out.status);
    }
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    s.parse::<f64>().context("cannot parse duration")
}

/// Durations from ffprobe, sizes from the filesystem.
#[derive(Debug, Clone)]
pub struct FfprobeMetadata {
    tools: Tools,
}

impl FfprobeMetadata {
    pub fn new(tools: Tools) -> Self {
        Self { tools }
    }
}

impl MetadataProvider for FfprobeMetadata {
    fn duration_seconds(&self, path: &Path) -> Result<f64, AugmentError> {
        probe_duration_seconds(&self.tools, path).map_err(|e| AugmentError::Probe {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        })
    }
}

/// Runs `ffmpeg -vf <parameter>` once per stage.
#[derive(Clone)]
pub struct FfmpegTransformer {
    tools: Tools,
    verbose: bool,
    timeout: Option<Duration>,
    progress: Option<ProgressBar>,
}

impl FfmpegTransformer {
    pub fn new(tools: Tools) -> Self {
        Self {
            tools,
            verbose: false,
            timeout: None,
            progress: None,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// `None` waits for ffmpeg indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn command(&self, input: &Path, output: &Path, parameter: &str) -> Command {
        let mut cmd = Command::new(&self.tools.ffmpeg);
        if !self.verbose {
            cmd.arg("-hide_banner")
                .arg("-nostats")
                .arg("-loglevel")
                .arg("error");
        }
        cmd.arg("-y")
            .arg("-progress")
            .arg("-")
            .arg("-i")
            .arg(input)
            .arg("-vf")
            .arg(parameter)
            .arg(output);
        cmd
    }

    fn spawn(&self, input: &Path, output: &Path, parameter: &str) -> Result<Child> {
        let mut cmd = self.command(input, output, parameter);
        debug!(?cmd, "spawning ffmpeg");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if self.verbose {
                Stdio::inherit()
            } else {
                Stdio::piped()
            })
            .spawn()
            .context("failed to spawn ffmpeg")
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let Some(limit) = self.timeout else {
            return Ok(child.wait()?);
        };
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if started.elapsed() >= limit {
                let _ = child.kill();
                let _ = child.wait();
                bail!("ffmpeg timed out after {limit:?}");
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Transformer for FfmpegTransformer {
    fn transform(&self, input: &Path, output: &Path, parameter: &str) -> Result<(), AugmentError> {
        let failure = |reason: String| AugmentError::Transform {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            reason,
        };

        let mut child = self
            .spawn(input, output, parameter)
            .map_err(|e| failure(format!("{e:#}")))?;

        let bar = self.progress.clone().unwrap_or_else(ProgressBar::hidden);
        let pump = child.stdout.take().map(|stdout| pump_progress(stdout, bar));
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let waited = self.wait(&mut child);
        if let Some(handle) = pump {
            let _ = handle.join();
        }
        let stderr_text = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        let status = waited.map_err(|e| failure(format!("{e:#}")))?;
        if !status.success() {
            let detail = stderr_text.trim();
            return Err(failure(if detail.is_empty() {
                format!("ffmpeg failed with status: {status}")
            } else {
                format!("ffmpeg failed with status: {status}: {detail}")
            }));
        }
        Ok(())
    }
}

fn resolve_bin(bin_opt: Option<PathBuf>, default: &str) -> Result<PathBuf> {
    if let Some(path) = bin_opt {
        if path.is_file() {
            return Ok(path);
        }
        bail!("Provided binary not found: {}", path.display());
    }

    which(default)
        .or_else(|_| {
            if cfg!(windows) {
                let exe = format!("{default}.exe");
                which(&exe)
            } else {
                Err(which::Error::CannotFindBinaryPath)
            }
        })
        .with_context(|| format!("`{default}` not found in PATH"))
}
