use std::fmt;
use std::path::PathBuf;

/// What a policy's artifacts are on disk: plain files or whole directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    File,
    Directory,
}

impl ArtifactKind {
    /// Parse the config-file literal (`arquivo` or `diretorio`).
    pub fn from_config_value(value: &str) -> Option<Self> {
        match value {
            "arquivo" => Some(ArtifactKind::File),
            "diretorio" => Some(ArtifactKind::Directory),
            _ => None,
        }
    }

    /// The literal used in the config grammar.
    pub fn config_value(&self) -> &'static str {
        match self {
            ArtifactKind::File => "arquivo",
            ArtifactKind::Directory => "diretorio",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArtifactKind::File => "file",
            ArtifactKind::Directory => "directory",
        };
        write!(f, "{}", label)
    }
}

/// One retention rule, fully validated.
///
/// A policy either carries all six fields or it does not exist: the parser
/// never emits a partially populated record.
#[derive(Debug, Clone)]
pub struct BackupPolicy {
    /// Section label; identifies the policy in logs and errors. This is also
    /// the glob pattern artifacts are matched against.
    pub name: String,

    /// Whether matching artifacts are files or directories.
    pub kind: ArtifactKind,

    /// Directory holding the artifacts. Confirmed to exist at parse time and
    /// re-checked for mount liveness every evaluation round.
    pub directory: PathBuf,

    /// Disk usage percentage at or above which eviction is considered (1-99).
    pub disk_limit_percent: u8,

    /// Never evict below this many matching artifacts.
    pub min_backups: u32,

    /// Evict (down to the minimum) while more than this many artifacts match.
    pub max_backups: u32,
}

impl BackupPolicy {
    /// The glob pattern artifacts are matched against.
    pub fn pattern(&self) -> &str {
        &self.name
    }
}
