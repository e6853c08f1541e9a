//! Filesystem probe abstraction for testability
//!
//! This module provides a trait-based abstraction for the filesystem
//! operations the retention engine depends on, enabling dependency injection
//! and mocking for tests. The real implementation bounds potentially hanging
//! calls (stale network mounts) with a timeout.

use crate::config::ArtifactKind;
use crate::utils::pattern;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Errors surfaced by probe operations.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe of {path:?} timed out after {timeout:?}")]
    Timeout { path: PathBuf, timeout: Duration },

    #[error("filesystem statistics unavailable for {path:?}: {details}")]
    Stats { path: PathBuf, details: String },

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("failed to {operation} {path:?}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A filesystem entry matching a policy's pattern.
///
/// Recomputed on every evaluation round; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Abstraction for filesystem observations and deletions.
pub trait FilesystemProbe: Send + Sync {
    /// Whether the filesystem holding `path` responds within `timeout`.
    ///
    /// `Ok(false)` means the path is unreachable (e.g. not mounted);
    /// `Err(ProbeError::Timeout)` means the call did not complete in time
    /// (e.g. a hung network mount). Must not block past `timeout`.
    fn is_live_mount(&self, path: &Path, timeout: Duration) -> Result<bool, ProbeError>;

    /// Whether `path` exists and is a directory.
    fn is_directory(&self, path: &Path) -> bool;

    /// Current disk usage of the filesystem holding `path`, in whole percent.
    fn disk_usage_percent(&self, path: &Path) -> Result<i64, ProbeError>;

    /// Direct children of `directory` matching `pattern` and `kind`, sorted
    /// oldest-first by modification time with path as tie-break.
    ///
    /// Non-recursive: subdirectories are not descended into.
    fn list_matches(
        &self,
        directory: &Path,
        kind: ArtifactKind,
        pattern: &str,
    ) -> Result<Vec<Artifact>, ProbeError>;

    /// Size of a file, or the recursive size of a directory, in bytes.
    fn size_of(&self, path: &Path) -> Result<u64, ProbeError>;

    /// Delete a file or a whole directory tree.
    fn delete(&self, path: &Path, kind: ArtifactKind) -> Result<(), ProbeError>;
}

/// Render a byte count for log output.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Default implementation backed by the real filesystem.
///
/// Holds a private runtime so that liveness checks can be raced against a
/// timeout without the rest of the daemon going async.
pub struct RealProbe {
    runtime: tokio::runtime::Runtime,
}

impl RealProbe {
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        Ok(Self { runtime })
    }
}

impl FilesystemProbe for RealProbe {
    fn is_live_mount(&self, path: &Path, timeout: Duration) -> Result<bool, ProbeError> {
        let target = path.to_path_buf();
        let outcome = self.runtime.block_on(async {
            tokio::time::timeout(timeout, tokio::task::spawn_blocking(move || fs_responds(&target)))
                .await
        });

        match outcome {
            Ok(Ok(alive)) => Ok(alive),
            Ok(Err(join_error)) => Err(ProbeError::Stats {
                path: path.to_path_buf(),
                details: format!("liveness task failed: {}", join_error),
            }),
            Err(_) => Err(ProbeError::Timeout {
                path: path.to_path_buf(),
                timeout,
            }),
        }
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn disk_usage_percent(&self, path: &Path) -> Result<i64, ProbeError> {
        statvfs_usage_percent(path)
    }

    fn list_matches(
        &self,
        directory: &Path,
        kind: ArtifactKind,
        pattern: &str,
    ) -> Result<Vec<Artifact>, ProbeError> {
        let matcher = pattern::compile_glob(pattern).map_err(|source| ProbeError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let entries = fs::read_dir(directory).map_err(|source| ProbeError::Io {
            operation: "list",
            path: directory.to_path_buf(),
            source,
        })?;

        let mut matches = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ProbeError::Io {
                operation: "list",
                path: directory.to_path_buf(),
                source,
            })?;

            let name = entry.file_name();
            // Non-UTF-8 names cannot match a glob from the config file.
            let Some(name) = name.to_str() else { continue };
            if !matcher.is_match(name) {
                continue;
            }

            let file_type = entry.file_type().map_err(|source| ProbeError::Io {
                operation: "inspect",
                path: entry.path(),
                source,
            })?;
            let wanted = match kind {
                ArtifactKind::File => file_type.is_file(),
                ArtifactKind::Directory => file_type.is_dir(),
            };
            if !wanted {
                continue;
            }

            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .map_err(|source| ProbeError::Io {
                    operation: "inspect",
                    path: entry.path(),
                    source,
                })?;

            matches.push(Artifact {
                path: entry.path(),
                modified,
            });
        }

        matches.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
        Ok(matches)
    }

    fn size_of(&self, path: &Path) -> Result<u64, ProbeError> {
        let meta = fs::symlink_metadata(path).map_err(|source| ProbeError::Io {
            operation: "measure",
            path: path.to_path_buf(),
            source,
        })?;

        if meta.is_dir() {
            directory_size(path)
        } else {
            Ok(meta.len())
        }
    }

    fn delete(&self, path: &Path, kind: ArtifactKind) -> Result<(), ProbeError> {
        let result = match kind {
            ArtifactKind::File => fs::remove_file(path),
            ArtifactKind::Directory => fs::remove_dir_all(path),
        };
        result.map_err(|source| ProbeError::Io {
            operation: "delete",
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Recursive size of a directory tree.
fn directory_size(path: &Path) -> Result<u64, ProbeError> {
    let entries = fs::read_dir(path).map_err(|source| ProbeError::Io {
        operation: "measure",
        path: path.to_path_buf(),
        source,
    })?;

    let mut total = 0u64;
    for entry in entries {
        let entry = entry.map_err(|source| ProbeError::Io {
            operation: "measure",
            path: path.to_path_buf(),
            source,
        })?;
        let meta = entry.metadata().map_err(|source| ProbeError::Io {
            operation: "measure",
            path: entry.path(),
            source,
        })?;
        if meta.is_dir() {
            total += directory_size(&entry.path())?;
        } else {
            total += meta.len();
        }
    }
    Ok(total)
}

#[cfg(unix)]
fn fs_responds(path: &Path) -> bool {
    nix::sys::statvfs::statvfs(path).is_ok()
}

#[cfg(not(unix))]
fn fs_responds(path: &Path) -> bool {
    path.exists()
}

#[cfg(unix)]
fn statvfs_usage_percent(path: &Path) -> Result<i64, ProbeError> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(|err| ProbeError::Stats {
        path: path.to_path_buf(),
        details: err.to_string(),
    })?;

    let used = u128::from(stat.blocks().saturating_sub(stat.blocks_free()));
    let usable = used + u128::from(stat.blocks_available());
    if usable == 0 {
        return Err(ProbeError::Stats {
            path: path.to_path_buf(),
            details: "filesystem reports zero usable blocks".to_string(),
        });
    }

    // Same rounding df uses: any fraction counts as a whole percent.
    Ok(used.saturating_mul(100).div_ceil(usable) as i64)
}

#[cfg(not(unix))]
fn statvfs_usage_percent(path: &Path) -> Result<i64, ProbeError> {
    Err(ProbeError::Stats {
        path: path.to_path_buf(),
        details: "disk usage probing is only supported on unix".to_string(),
    })
}

/// A mock probe for testing that serves a configurable fake tree and records
/// deletions. Available for use in external test crates.
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    /// One entry of the fake tree.
    #[derive(Debug, Clone)]
    pub struct FakeEntry {
        pub name: String,
        pub kind: ArtifactKind,
        pub modified: SystemTime,
        pub size: u64,
    }

    #[derive(Default)]
    struct MockState {
        entries: HashMap<PathBuf, Vec<FakeEntry>>,
        usage: HashMap<PathBuf, i64>,
        hung: HashSet<PathBuf>,
        dead: HashSet<PathBuf>,
        deleted: Vec<PathBuf>,
    }

    /// Mock probe for testing.
    #[derive(Clone, Default)]
    pub struct MockProbe {
        state: Arc<Mutex<MockState>>,
    }

    impl MockProbe {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a directory with no entries and 0% usage.
        pub fn with_directory(self, dir: &Path) -> Self {
            self.state
                .lock()
                .unwrap()
                .entries
                .entry(dir.to_path_buf())
                .or_default();
            self
        }

        /// Add an entry to a registered directory.
        pub fn add_entry(&self, dir: &Path, entry: FakeEntry) {
            self.state
                .lock()
                .unwrap()
                .entries
                .entry(dir.to_path_buf())
                .or_default()
                .push(entry);
        }

        /// Script the disk usage percentage reported for a directory.
        pub fn set_usage(&self, dir: &Path, percent: i64) {
            self.state
                .lock()
                .unwrap()
                .usage
                .insert(dir.to_path_buf(), percent);
        }

        /// Make liveness checks against a directory time out.
        pub fn set_hung(&self, dir: &Path, hung: bool) {
            let mut state = self.state.lock().unwrap();
            if hung {
                state.hung.insert(dir.to_path_buf());
            } else {
                state.hung.remove(dir);
            }
        }

        /// Make liveness checks against a directory report "not mounted".
        pub fn set_dead(&self, dir: &Path) {
            self.state.lock().unwrap().dead.insert(dir.to_path_buf());
        }

        /// Paths deleted through this probe, in deletion order.
        pub fn deleted_paths(&self) -> Vec<PathBuf> {
            self.state.lock().unwrap().deleted.clone()
        }

        /// Number of entries currently held for a directory.
        pub fn entry_count(&self, dir: &Path) -> usize {
            self.state
                .lock()
                .unwrap()
                .entries
                .get(dir)
                .map(Vec::len)
                .unwrap_or(0)
        }
    }

    impl FilesystemProbe for MockProbe {
        fn is_live_mount(&self, path: &Path, timeout: Duration) -> Result<bool, ProbeError> {
            let state = self.state.lock().unwrap();
            if state.hung.contains(path) {
                return Err(ProbeError::Timeout {
                    path: path.to_path_buf(),
                    timeout,
                });
            }
            if state.dead.contains(path) {
                return Ok(false);
            }
            Ok(state.entries.contains_key(path))
        }

        fn is_directory(&self, path: &Path) -> bool {
            self.state.lock().unwrap().entries.contains_key(path)
        }

        fn disk_usage_percent(&self, path: &Path) -> Result<i64, ProbeError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .usage
                .get(path)
                .copied()
                .unwrap_or(0))
        }

        fn list_matches(
            &self,
            directory: &Path,
            kind: ArtifactKind,
            pattern: &str,
        ) -> Result<Vec<Artifact>, ProbeError> {
            let matcher = pattern::compile_glob(pattern).map_err(|source| ProbeError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;

            let state = self.state.lock().unwrap();
            let entries = state.entries.get(directory).ok_or_else(|| ProbeError::Io {
                operation: "list",
                path: directory.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
            })?;

            let mut matches: Vec<Artifact> = entries
                .iter()
                .filter(|entry| entry.kind == kind && matcher.is_match(&entry.name))
                .map(|entry| Artifact {
                    path: directory.join(&entry.name),
                    modified: entry.modified,
                })
                .collect();

            matches.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
            Ok(matches)
        }

        fn size_of(&self, path: &Path) -> Result<u64, ProbeError> {
            let state = self.state.lock().unwrap();
            let (dir, name) = split_path(path)?;
            state
                .entries
                .get(&dir)
                .and_then(|entries| entries.iter().find(|e| e.name == name))
                .map(|e| e.size)
                .ok_or_else(|| ProbeError::Io {
                    operation: "measure",
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such entry"),
                })
        }

        fn delete(&self, path: &Path, _kind: ArtifactKind) -> Result<(), ProbeError> {
            let mut state = self.state.lock().unwrap();
            let (dir, name) = split_path(path)?;
            let entries = state.entries.get_mut(&dir).ok_or_else(|| ProbeError::Io {
                operation: "delete",
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
            })?;

            let before = entries.len();
            entries.retain(|e| e.name != name);
            if entries.len() == before {
                return Err(ProbeError::Io {
                    operation: "delete",
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such entry"),
                });
            }

            state.deleted.push(path.to_path_buf());
            Ok(())
        }
    }

    fn split_path(path: &Path) -> Result<(PathBuf, String), ProbeError> {
        let dir = path.parent().map(Path::to_path_buf);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        match (dir, name) {
            (Some(dir), Some(name)) => Ok((dir, name)),
            _ => Err(ProbeError::Io {
                operation: "inspect",
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent"),
            }),
        }
    }
}
