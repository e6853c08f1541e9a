//! Default config template, generated when no config file exists

use std::fs;
use std::io;
use std::path::Path;

/// Annotated template written on first run. The operator edits the example
/// section before the daemon will do anything.
pub const DEFAULT_CONFIG_TEMPLATE: &str = "\
# backup-warden retention policies
#
# One [pattern] section per policy. The pattern is a shell-style glob
# matched against entry names directly inside 'diretorio' (* and ? are
# wildcards; a pattern of only * characters is rejected).
#
# Keys, all required:
#   tipo_backup         arquivo (files) or diretorio (directories)
#   diretorio           absolute path holding the backup artifacts
#   limite_disco        disk usage percent (1-99) that triggers eviction
#   qtd_minima_backups  never delete below this many artifacts (>= 1)
#   qtd_maxima_backups  delete oldest while more than this many match (>= 1)
#
# Policies are evaluated in file order. Example:

[backup-*.tar.gz]
tipo_backup=arquivo
diretorio=/var/backups/app
limite_disco=90
qtd_minima_backups=3
qtd_maxima_backups=10
";

/// Write the default template to `path`, creating parent directories.
pub fn write_default_config(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE)
}
