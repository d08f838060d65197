use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::Task;

/// Name of the single persisted blob inside the data directory.
pub const TASKS_FILE: &str = "tasks.json";

/// Whole-collection JSON persistence: every save rewrites the full task
/// list under one fixed file name.
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    /// Opens the store under the platform data directory, creating it on
    /// first use.
    pub fn open_default() -> Result<Self> {
        let mut dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.push("flow");
        Self::open(dir)
    }

    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Storage {
            path: dir.join(TASKS_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or undecodable data reads as `None`; the caller keeps
    /// whatever state it already has.
    pub fn load(&self) -> Option<Vec<Task>> {
        let bytes = fs::read(&self.path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Failures are logged and swallowed; there is no retry.
    pub fn save(&self, tasks: &[Task]) {
        let bytes = match serde_json::to_vec_pretty(tasks) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("failed to encode tasks: {err}");
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, bytes) {
            log::warn!("failed to write {}: {err}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn task(title: &str) -> Task {
        Task::new(title, Local.with_ymd_and_hms(2026, 8, 7, 9, 0, 0).unwrap())
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let tasks = vec![task("Buy milk"), task("Water plants")];
        storage.save(&tasks);

        let loaded = storage.load().unwrap();
        assert_eq!(loaded, tasks);
    }

    #[test]
    fn load_without_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        assert!(storage.load().is_none());
    }

    #[test]
    fn load_of_garbage_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        fs::write(storage.path(), b"not json at all").unwrap();
        assert!(storage.load().is_none());
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        storage.save(&[task("first"), task("second")]);
        storage.save(&[task("only")]);

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "only");
    }
}
