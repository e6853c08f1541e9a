//! Test fixtures and sample data
//!
//! Provides pre-built policies and fake-tree population helpers.

use backup_warden::config::{ArtifactKind, BackupPolicy};
use backup_warden::utils::probe::mock::{FakeEntry, MockProbe};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Base timestamp fixtures count from (arbitrary but stable).
pub const BASE_MTIME: u64 = 1_600_000_000;

/// Modification time `offset_secs` after the fixture base.
pub fn mtime_at(offset_secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(BASE_MTIME + offset_secs)
}

/// A file policy with the given thresholds over `dir`.
pub fn sample_policy(dir: &Path, pattern: &str, limit: u8, min: u32, max: u32) -> BackupPolicy {
    BackupPolicy {
        name: pattern.to_string(),
        kind: ArtifactKind::File,
        directory: dir.to_path_buf(),
        disk_limit_percent: limit,
        min_backups: min,
        max_backups: max,
    }
}

/// Register `dir` on a fresh mock probe with `names` as file entries, oldest
/// first: each entry is one hour newer than the one before it.
pub fn mock_tree(dir: &Path, names_oldest_first: &[&str]) -> MockProbe {
    let probe = MockProbe::new().with_directory(dir);
    populate_mock(&probe, dir, names_oldest_first);
    probe
}

/// Add file entries to an already-registered directory, oldest first.
pub fn populate_mock(probe: &MockProbe, dir: &Path, names_oldest_first: &[&str]) {
    for (i, name) in names_oldest_first.iter().enumerate() {
        probe.add_entry(
            dir,
            FakeEntry {
                name: name.to_string(),
                kind: ArtifactKind::File,
                modified: mtime_at(3600 * (i as u64 + 1)),
                size: 4096,
            },
        );
    }
}
