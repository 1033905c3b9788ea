use crate::error::AugmentError;
use crate::metadata::FolderStats;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

/// A failure tied to one source file (and a stage, when it came from one).
#[derive(Debug)]
pub struct FileFailure {
    pub file: PathBuf,
    pub stage: Option<usize>,
    pub error: AugmentError,
}

/// Everything a run produced, returned by the orchestrator instead of
/// printed as it happens.
#[derive(Debug, Default)]
pub struct RunReport {
    pub processed_count: usize,
    pub excluded_count: usize,
    pub copied_count: usize,
    pub skipped_by_limit: usize,
    pub stages_applied: usize,
    pub stages_skipped: usize,
    pub stages_failed: usize,
    pub stage_count: usize,
    pub total_source_seconds: f64,
    pub total_augmented_seconds: f64,
    pub source_before: FolderStats,
    pub stage_stats: Vec<(String, FolderStats)>,
    pub holding_stats: FolderStats,
    pub probe_warnings: Vec<AugmentError>,
    pub failures: Vec<FileFailure>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn augmented_total(&self) -> FolderStats {
        let mut total = FolderStats::default();
        for (_, stats) in &self.stage_stats {
            total.add(stats);
        }
        total
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", "-".repeat(30));
        let _ = writeln!(
            out,
            "Source videos: {} ({}, {})",
            self.source_before.file_count,
            format_hms(self.source_before.total_duration_seconds),
            format_mb(self.source_before.total_size_bytes)
        );
        let _ = writeln!(
            out,
            "Augmented: {} | Copied unmodified: {} | Left for later (limit): {}",
            self.processed_count, self.copied_count, self.skipped_by_limit
        );
        let _ = writeln!(
            out,
            "Stages run: {} | already present: {} | failed: {}",
            self.stages_applied, self.stages_skipped, self.stages_failed
        );
        let _ = writeln!(
            out,
            "Duration of augmented sources: {}",
            format_hms(self.total_source_seconds)
        );
        let _ = writeln!(
            out,
            "Expected duration across {} stage folders: {}",
            self.stage_count,
            format_hms(self.total_augmented_seconds)
        );
        for (name, stats) in &self.stage_stats {
            let _ = writeln!(
                out,
                "  {name}: {} videos, {}, {}",
                stats.file_count,
                format_hms(stats.total_duration_seconds),
                format_mb(stats.total_size_bytes)
            );
        }
        let _ = writeln!(
            out,
            "  Not augmented: {} videos, {}, {}",
            self.holding_stats.file_count,
            format_hms(self.holding_stats.total_duration_seconds),
            format_mb(self.holding_stats.total_size_bytes)
        );
        if !self.probe_warnings.is_empty() {
            let _ = writeln!(out, "Probe warnings: {}", self.probe_warnings.len());
        }
        if self.has_failures() {
            let _ = writeln!(out, "Failures: {}", self.failures.len());
            for f in &self.failures {
                let stage = f.stage.map(|s| format!(" [stage {}]", s + 1)).unwrap_or_default();
                let _ = writeln!(out, "  ! {}{stage}: {}", f.file.display(), f.error);
            }
        }
        let _ = write!(
            out,
            "Processing time: {:.1} seconds",
            self.elapsed.as_secs_f64()
        );
        out
    }
}

/// Whole seconds as `H:MM:SS`; hours are not wrapped into days.
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0.0), "0:00:00");
        assert_eq!(format_hms(30.9), "0:00:30");
        assert_eq!(format_hms(3725.0), "1:02:05");
        assert_eq!(format_hms(90_000.0), "25:00:00");
        assert_eq!(format_hms(-4.0), "0:00:00");
        assert_eq!(format_hms(f64::NAN), "0:00:00");
    }

    #[test]
    fn test_format_mb() {
        assert_eq!(format_mb(0), "0.00 MB");
        assert_eq!(format_mb(1024 * 1024), "1.00 MB");
        assert_eq!(format_mb(1536 * 1024), "1.50 MB");
    }

    #[test]
    fn test_summary_lists_failures() {
        let report = RunReport {
            processed_count: 2,
            stage_count: 2,
            total_source_seconds: 30.0,
            total_augmented_seconds: 60.0,
            stage_stats: vec![(
                "Stage 1".into(),
                FolderStats {
                    total_duration_seconds: 30.0,
                    file_count: 2,
                    total_size_bytes: 2 * 1024 * 1024,
                },
            )],
            failures: vec![FileFailure {
                file: PathBuf::from("b.mp4"),
                stage: Some(1),
                error: AugmentError::MissingInput {
                    stage: 1,
                    input: PathBuf::from("Stage 1/b.mp4"),
                },
            }],
            ..Default::default()
        };
        let text = report.summary();
        assert!(report.has_failures());
        assert!(text.contains("Expected duration across 2 stage folders: 0:01:00"));
        assert!(text.contains("Stage 1: 2 videos, 0:00:30, 2.00 MB"));
        assert!(text.contains("b.mp4 [stage 2]"));
        assert_eq!(report.augmented_total().file_count, 2);
    }
}
