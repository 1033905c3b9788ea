use crate::error::AugmentError;
use crate::pipeline::is_staging_file;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Duration and size lookups for a single media file.
pub trait MetadataProvider {
    fn duration_seconds(&self, path: &Path) -> Result<f64, AugmentError>;

    fn size_bytes(&self, path: &Path) -> Result<u64, AugmentError> {
        fs::metadata(path)
            .map(|m| m.len())
            .map_err(|e| AugmentError::Probe {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FolderStats {
    pub total_duration_seconds: f64,
    pub file_count: usize,
    pub total_size_bytes: u64,
}

impl FolderStats {
    pub fn add(&mut self, other: &FolderStats) {
        self.total_duration_seconds += other.total_duration_seconds;
        self.file_count += other.file_count;
        self.total_size_bytes += other.total_size_bytes;
    }
}

pub fn is_media_file(path: &Path, extensions: &[String]) -> bool {
    if is_staging_file(path) {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// Media files directly inside `folder`, sorted by file name.
pub fn list_media_files(folder: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, AugmentError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let context = format!("cannot list {}", folder.display());
            match e.into_io_error() {
                Some(io) => AugmentError::io(context, io),
                None => AugmentError::io(context, std::io::Error::other("filesystem loop")),
            }
        })?;
        if entry.file_type().is_file() && is_media_file(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Aggregates duration and size over the media files of `folder`. Files that
/// cannot be probed are left out and logged; a missing folder yields zeros.
pub fn folder_stats<M: MetadataProvider + ?Sized>(
    provider: &M,
    folder: &Path,
    extensions: &[String],
) -> FolderStats {
    let mut stats = FolderStats::default();
    if !folder.is_dir() {
        return stats;
    }
    let files = match list_media_files(folder, extensions) {
        Ok(files) => files,
        Err(err) => {
            warn!("skipping stats for {}: {err}", folder.display());
            return stats;
        }
    };
    for file in files {
        let probed = provider
            .duration_seconds(&file)
            .and_then(|d| provider.size_bytes(&file).map(|s| (d, s)));
        match probed {
            Ok((duration, size)) => {
                stats.total_duration_seconds += duration;
                stats.total_size_bytes += size;
                stats.file_count += 1;
            }
            Err(err) => warn!("excluding from stats: {err}"),
        }
    }
    stats
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Durations keyed by file name; unknown names fail to probe.
    #[derive(Default)]
    pub(crate) struct FixedDurations(pub HashMap<String, f64>);

    impl FixedDurations {
        pub fn with(entries: &[(&str, f64)]) -> Self {
            Self(entries.iter().map(|(n, d)| (n.to_string(), *d)).collect())
        }
    }

    impl MetadataProvider for FixedDurations {
        fn duration_seconds(&self, path: &Path) -> Result<f64, AugmentError> {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| self.0.get(n).copied())
                .ok_or_else(|| AugmentError::Probe {
                    path: path.to_path_buf(),
                    reason: "no duration".into(),
                })
        }
    }

    fn mp4() -> Vec<String> {
        vec!["mp4".to_string()]
    }

    #[test]
    fn test_is_media_file() {
        let exts = vec!["mp4".to_string(), "mov".to_string()];
        assert!(is_media_file(Path::new("a.mp4"), &exts));
        assert!(is_media_file(Path::new("dir/B.MP4"), &exts));
        assert!(is_media_file(Path::new("c.Mov"), &exts));
        assert!(!is_media_file(Path::new("notes.txt"), &exts));
        assert!(!is_media_file(Path::new("mp4"), &exts));
        assert!(!is_media_file(Path::new(".partial-a.mp4"), &exts));
    }

    #[test]
    fn test_list_media_files_is_sorted_and_flat() {
        let dir = TempDir::new().unwrap();
        for name in ["b.mp4", "a.MP4", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.mp4")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.mp4"), b"x").unwrap();

        let files = list_media_files(dir.path(), &mp4()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.MP4", "b.mp4"]);
    }

    #[test]
    fn test_list_media_files_missing_folder_errors() {
        let dir = TempDir::new().unwrap();
        assert!(list_media_files(&dir.path().join("nope"), &mp4()).is_err());
    }

    #[test]
    fn test_folder_stats_excludes_probe_failures() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.mp4"), vec![0u8; 1000]).unwrap();
        fs::write(dir.path().join("b.mp4"), vec![0u8; 500]).unwrap();
        fs::write(dir.path().join("broken.mp4"), vec![0u8; 250]).unwrap();
        let provider = FixedDurations::with(&[("a.mp4", 10.0), ("b.mp4", 20.5)]);

        let stats = folder_stats(&provider, dir.path(), &mp4());
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_size_bytes, 1500);
        assert!((stats.total_duration_seconds - 30.5).abs() < 1e-9);
    }

    #[test]
    fn test_folder_stats_missing_folder_is_empty() {
        let dir = TempDir::new().unwrap();
        let provider = FixedDurations::default();
        let stats = folder_stats(&provider, &dir.path().join("absent"), &mp4());
        assert_eq!(stats, FolderStats::default());
    }

    #[test]
    fn test_folder_stats_add() {
        let mut total = FolderStats::default();
        total.add(&FolderStats {
            total_duration_seconds: 2.0,
            file_count: 1,
            total_size_bytes: 10,
        });
        total.add(&FolderStats {
            total_duration_seconds: 3.0,
            file_count: 2,
            total_size_bytes: 5,
        });
        assert_eq!(total.file_count, 3);
        assert_eq!(total.total_size_bytes, 15);
        assert!((total.total_duration_seconds - 5.0).abs() < 1e-9);
    }
}
