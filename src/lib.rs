//! Backup Warden Library
//!
//! This library provides disk-space-aware backup retention: parsing named
//! retention policies and evicting the oldest matching backup artifacts when
//! disk usage or backup counts exceed their configured thresholds.

pub mod config;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{load_policies, parse_config, ArtifactKind, BackupPolicy, ConfigError};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::retention::RetentionEngine;
pub use utils::locker::InstanceLock;
pub use utils::probe::{Artifact, FilesystemProbe, ProbeError, RealProbe};
