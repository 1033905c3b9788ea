use crate::error::AugmentError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const PLAN_FILE_NAME: &str = ".augmentation-plan.json";

/// What was decided for one source file the first time it was seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePlan {
    pub augmented: bool,
    #[serde(default)]
    pub stages: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PlanFile {
    files: BTreeMap<String, FilePlan>,
}

/// Sidecar record of per-file decisions so an interrupted batch resumes with
/// the same augmentation sequence instead of drawing a new one.
#[derive(Debug)]
pub struct PlanStore {
    path: PathBuf,
    plans: PlanFile,
}

impl PlanStore {
    /// Loads the record at `path`. A missing file starts empty; an unreadable
    /// one is logged and replaced on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let plans = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(plans) => plans,
                Err(e) => {
                    warn!("ignoring unreadable plan {}: {e}", path.display());
                    PlanFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PlanFile::default(),
            Err(e) => {
                warn!("ignoring unreadable plan {}: {e}", path.display());
                PlanFile::default()
            }
        };
        debug!(entries = plans.files.len(), "loaded augmentation plan");
        Self { path, plans }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, file_name: &str) -> Option<&FilePlan> {
        self.plans.files.get(file_name)
    }

    pub fn len(&self) -> usize {
        self.plans.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.files.is_empty()
    }

    /// Stores `plan` and writes the whole record back to disk.
    pub fn record(&mut self, file_name: &str, plan: FilePlan) -> Result<(), AugmentError> {
        if self.plans.files.get(file_name) == Some(&plan) {
            return Ok(());
        }
        self.plans.files.insert(file_name.to_string(), plan);
        self.save()
    }

    fn save(&self) -> Result<(), AugmentError> {
        let plan_err = |reason: String| AugmentError::Plan {
            path: self.path.clone(),
            reason,
        };
        let json = serde_json::to_string_pretty(&self.plans).map_err(|e| plan_err(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| plan_err(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| plan_err(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn augmented(stages: &[&str]) -> FilePlan {
        FilePlan {
            augmented: true,
            stages: stages.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_missing_plan_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = PlanStore::open(dir.path().join(PLAN_FILE_NAME));
        assert!(store.is_empty());
        assert!(store.get("a.mp4").is_none());
    }

    #[test]
    fn test_record_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PLAN_FILE_NAME);
        let mut store = PlanStore::open(&path);
        store.record("a.mp4", augmented(&["Noise", "Dimmer"])).unwrap();
        store
            .record(
                "b.mp4",
                FilePlan {
                    augmented: false,
                    stages: Vec::new(),
                },
            )
            .unwrap();

        let reopened = PlanStore::open(&path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("a.mp4"), Some(&augmented(&["Noise", "Dimmer"])));
        assert!(!reopened.get("b.mp4").unwrap().augmented);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_plan_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PLAN_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();
        let mut store = PlanStore::open(&path);
        assert!(store.is_empty());
        store.record("a.mp4", augmented(&["Noise"])).unwrap();
        assert_eq!(PlanStore::open(&path).len(), 1);
    }

    #[test]
    fn test_record_into_missing_folder_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = PlanStore::open(dir.path().join("gone").join(PLAN_FILE_NAME));
        let err = store.record("a.mp4", augmented(&["Noise"])).unwrap_err();
        assert!(matches!(err, AugmentError::Plan { .. }));
    }
}
