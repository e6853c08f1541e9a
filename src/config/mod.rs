//! Configuration module for backup-warden
//!
//! This module parses the line-oriented policy grammar:
//!
//! ```text
//! # comment
//! [namePattern]
//! tipo_backup=arquivo|diretorio
//! diretorio=/absolute/path
//! limite_disco=<1-99>
//! qtd_minima_backups=<n>
//! qtd_maxima_backups=<n>
//! ```
//!
//! A section commits once all of its fields are populated; partially
//! specified sections abort the parse. Policies come back in file order,
//! which is also the order the retention engine evaluates them in.

mod loader;
mod template;
mod types;

pub use loader::{load_policies, parse_config, ConfigError, Result};
pub use template::{write_default_config, DEFAULT_CONFIG_TEMPLATE};
pub use types::{ArtifactKind, BackupPolicy};

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
