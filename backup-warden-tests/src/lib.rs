//! Test utilities for backup-warden
//!
//! This crate provides shared test utilities, fixtures, and helper
//! functions for testing the backup-warden application.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::new();
//!     let backups = ctx.create_dir("backups");
//!     let config = ConfigBuilder::new().section("backup-*.tar", &backups).build();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::TestContext;

// Re-export types from the main crate for convenience
pub use backup_warden::config::{ArtifactKind, BackupPolicy, ConfigError};
pub use backup_warden::managers::retention::RetentionEngine;
pub use backup_warden::utils::probe::mock::{FakeEntry, MockProbe};
pub use backup_warden::utils::probe::{Artifact, FilesystemProbe, ProbeError};

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
