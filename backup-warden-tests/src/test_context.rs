//! Test context and harness for integration testing
//!
//! Provides a unified context for setting up and tearing down test
//! environments: temp directories, config files, and aged backup artifacts.

use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
}

impl TestContext {
    /// Create a new test context with a temporary directory
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Get the temporary directory path
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a subdirectory and return its path
    pub fn create_dir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::create_dir_all(&path).expect("Failed to create directory");
        path
    }

    /// Create a file with the given content and return its path
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, content).expect("Failed to create file");
        path
    }

    /// Create a backup file in `dir` with its modification time pinned to
    /// `mtime_secs` (unix seconds), so oldest-selection is deterministic.
    pub fn create_backup(&self, dir: &Path, name: &str, mtime_secs: i64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "backup payload").expect("Failed to create backup file");
        filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0))
            .expect("Failed to set mtime");
        path
    }

    /// Create a backup directory (with one inner file) pinned to `mtime_secs`.
    pub fn create_backup_dir(&self, dir: &Path, name: &str, mtime_secs: i64) -> PathBuf {
        let path = dir.join(name);
        fs::create_dir_all(&path).expect("Failed to create backup directory");
        fs::write(path.join("data.bin"), "payload").expect("Failed to create inner file");
        filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0))
            .expect("Failed to set mtime");
        path
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
