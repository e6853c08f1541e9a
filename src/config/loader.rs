use super::types::{ArtifactKind, BackupPolicy};
use crate::utils::pattern;
use crate::utils::probe::{FilesystemProbe, ProbeError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0:?}")]
    MissingConfig(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("line {line}: unknown key '{key}'")]
    UnknownKey { line: usize, key: String },

    #[error("line {line}: empty value for key '{key}'")]
    EmptyValue { line: usize, key: String },

    #[error("line {line}: duplicate key '{key}' in section '{section}'")]
    DuplicateKey {
        line: usize,
        key: String,
        section: String,
    },

    #[error("line {line}: invalid tipo_backup '{value}' (expected 'arquivo' or 'diretorio')")]
    InvalidKind { line: usize, value: String },

    #[error("line {line}: limite_disco must be an integer between 1 and 99, got '{value}'")]
    InvalidDiskLimit { line: usize, value: String },

    #[error("line {line}: {key} must be a positive integer, got '{value}'")]
    InvalidCount {
        line: usize,
        key: String,
        value: String,
    },

    #[error("line {line}: section pattern '{pattern}' would match every entry")]
    WildcardOnlyPattern { line: usize, pattern: String },

    #[error("line {line}: invalid section pattern '{pattern}': {details}")]
    InvalidPattern {
        line: usize,
        pattern: String,
        details: String,
    },

    #[error("line {line}: expected a comment, '[pattern]' header, or key=value, got '{content}'")]
    MalformedLine { line: usize, content: String },

    #[error("line {line}: key=value before any section header")]
    OrphanEntry { line: usize },

    #[error("line {line}: section '{section}' is missing fields, cannot open '{next}'")]
    IncompleteSection {
        line: usize,
        section: String,
        next: String,
    },

    #[error("section '{section}' is missing fields at end of file")]
    UnterminatedSection { section: String },

    #[error("backup directory {path:?} for section '{section}' does not exist")]
    DirectoryNotFound { section: String, path: PathBuf },

    #[error("no policies found in config file")]
    NoPolicies,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// A section whose fields are still being accumulated.
///
/// Completion is detected by field-count, not by a terminator: once all
/// fields are populated the record commits and the parser returns to
/// awaiting the next section header.
#[derive(Debug)]
struct PendingPolicy {
    name: String,
    kind: Option<ArtifactKind>,
    directory: Option<PathBuf>,
    disk_limit_percent: Option<u8>,
    min_backups: Option<u32>,
    max_backups: Option<u32>,
}

impl PendingPolicy {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: None,
            directory: None,
            disk_limit_percent: None,
            min_backups: None,
            max_backups: None,
        }
    }

    fn is_complete(&self) -> bool {
        self.kind.is_some()
            && self.directory.is_some()
            && self.disk_limit_percent.is_some()
            && self.min_backups.is_some()
            && self.max_backups.is_some()
    }

    fn commit(self) -> Option<BackupPolicy> {
        Some(BackupPolicy {
            name: self.name,
            kind: self.kind?,
            directory: self.directory?,
            disk_limit_percent: self.disk_limit_percent?,
            min_backups: self.min_backups?,
            max_backups: self.max_backups?,
        })
    }
}

/// Parser position within the config file.
#[derive(Debug)]
enum ParserState {
    /// Between sections; only comments, blanks, and headers are legal.
    AwaitingSection,
    /// Inside a section, accumulating key=value fields.
    AccumulatingFields(PendingPolicy),
    /// Discarding the remainder of a section whose directory probe timed out.
    SkippingSection,
}

/// Load and validate retention policies from a config file.
pub fn load_policies(
    path: &Path,
    probe: &dyn FilesystemProbe,
    probe_timeout: Duration,
) -> Result<Vec<BackupPolicy>> {
    let contents = fs::read_to_string(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            ConfigError::MissingConfig(path.to_path_buf())
        } else {
            ConfigError::ReadError(err)
        }
    })?;
    parse_config(&contents, probe, probe_timeout)
}

/// Parse config text into an ordered sequence of complete policies.
///
/// Every returned policy is fully populated and directory-confirmed. A
/// section whose directory probe times out is skipped with a warning; every
/// other validation failure aborts the whole parse.
pub fn parse_config(
    text: &str,
    probe: &dyn FilesystemProbe,
    probe_timeout: Duration,
) -> Result<Vec<BackupPolicy>> {
    let mut policies = Vec::new();
    let mut state = ParserState::AwaitingSection;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            state = open_section(state, line, line_no)?;
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim();

            state = match state {
                ParserState::AwaitingSection => {
                    return Err(ConfigError::OrphanEntry { line: line_no });
                }
                ParserState::SkippingSection => ParserState::SkippingSection,
                ParserState::AccumulatingFields(mut pending) => {
                    match apply_field(&mut pending, key, value, line_no, probe, probe_timeout)? {
                        FieldOutcome::Accepted if pending.is_complete() => {
                            let section = pending.name.clone();
                            match pending.commit() {
                                Some(policy) => {
                                    check_count_ordering(&policy);
                                    policies.push(policy);
                                }
                                // commit() only fails on missing fields,
                                // which is_complete() just ruled out.
                                None => {
                                    return Err(ConfigError::UnterminatedSection { section });
                                }
                            }
                            ParserState::AwaitingSection
                        }
                        FieldOutcome::Accepted => ParserState::AccumulatingFields(pending),
                        FieldOutcome::SkipSection => ParserState::SkippingSection,
                    }
                }
            };
            continue;
        }

        return Err(ConfigError::MalformedLine {
            line: line_no,
            content: line.to_string(),
        });
    }

    if let ParserState::AccumulatingFields(pending) = state {
        return Err(ConfigError::UnterminatedSection {
            section: pending.name,
        });
    }

    if policies.is_empty() {
        return Err(ConfigError::NoPolicies);
    }

    Ok(policies)
}

/// Handle a `[pattern]` header line.
fn open_section(state: ParserState, line: &str, line_no: usize) -> Result<ParserState> {
    let pattern = line[1..line.len() - 1].trim();

    if let ParserState::AccumulatingFields(pending) = state {
        return Err(ConfigError::IncompleteSection {
            line: line_no,
            section: pending.name,
            next: pattern.to_string(),
        });
    }

    if pattern.is_empty() {
        return Err(ConfigError::MalformedLine {
            line: line_no,
            content: line.to_string(),
        });
    }

    if pattern::is_wildcard_only(pattern) {
        return Err(ConfigError::WildcardOnlyPattern {
            line: line_no,
            pattern: pattern.to_string(),
        });
    }

    if let Err(err) = pattern::compile_glob(pattern) {
        return Err(ConfigError::InvalidPattern {
            line: line_no,
            pattern: pattern.to_string(),
            details: err.to_string(),
        });
    }

    Ok(ParserState::AccumulatingFields(PendingPolicy::new(pattern)))
}

enum FieldOutcome {
    Accepted,
    /// Directory probe timed out; discard the rest of this section.
    SkipSection,
}

fn apply_field(
    pending: &mut PendingPolicy,
    key: &str,
    value: &str,
    line: usize,
    probe: &dyn FilesystemProbe,
    probe_timeout: Duration,
) -> Result<FieldOutcome> {
    let recognized = matches!(
        key,
        "tipo_backup" | "diretorio" | "limite_disco" | "qtd_minima_backups" | "qtd_maxima_backups"
    );
    if !recognized {
        return Err(ConfigError::UnknownKey {
            line,
            key: key.to_string(),
        });
    }
    if value.is_empty() {
        return Err(ConfigError::EmptyValue {
            line,
            key: key.to_string(),
        });
    }

    match key {
        "tipo_backup" => {
            if pending.kind.is_some() {
                return Err(duplicate_key(pending, key, line));
            }
            pending.kind = Some(ArtifactKind::from_config_value(value).ok_or_else(|| {
                ConfigError::InvalidKind {
                    line,
                    value: value.to_string(),
                }
            })?);
        }
        "diretorio" => {
            if pending.directory.is_some() {
                return Err(duplicate_key(pending, key, line));
            }
            let path = PathBuf::from(value);

            match probe.is_live_mount(&path, probe_timeout) {
                Err(ProbeError::Timeout { .. }) => {
                    warn!(
                        "Section '{}': mount check for {:?} timed out, skipping section",
                        pending.name, path
                    );
                    return Ok(FieldOutcome::SkipSection);
                }
                // An unreachable filesystem falls through to the existence
                // check, which reports it as a missing directory.
                Err(_) | Ok(_) => {}
            }

            if !probe.is_directory(&path) {
                return Err(ConfigError::DirectoryNotFound {
                    section: pending.name.clone(),
                    path,
                });
            }
            pending.directory = Some(path);
        }
        "limite_disco" => {
            if pending.disk_limit_percent.is_some() {
                return Err(duplicate_key(pending, key, line));
            }
            let parsed = value.parse::<i64>().ok().filter(|v| (1..=99).contains(v));
            match parsed {
                Some(v) => pending.disk_limit_percent = Some(v as u8),
                None => {
                    return Err(ConfigError::InvalidDiskLimit {
                        line,
                        value: value.to_string(),
                    });
                }
            }
        }
        "qtd_minima_backups" | "qtd_maxima_backups" => {
            let slot = if key == "qtd_minima_backups" {
                &mut pending.min_backups
            } else {
                &mut pending.max_backups
            };
            if slot.is_some() {
                return Err(ConfigError::DuplicateKey {
                    line,
                    key: key.to_string(),
                    section: pending.name.clone(),
                });
            }
            let parsed = value.parse::<u32>().ok().filter(|v| *v >= 1);
            match parsed {
                Some(v) => *slot = Some(v),
                None => {
                    return Err(ConfigError::InvalidCount {
                        line,
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }
        _ => unreachable!("key recognition checked above"),
    }

    Ok(FieldOutcome::Accepted)
}

fn duplicate_key(pending: &PendingPolicy, key: &str, line: usize) -> ConfigError {
    ConfigError::DuplicateKey {
        line,
        key: key.to_string(),
        section: pending.name.clone(),
    }
}

/// The grammar does not require min <= max. With min > max the count trigger
/// can fire while the floor check never passes, so eviction silently stalls
/// for that policy; flag it rather than rejecting the config.
fn check_count_ordering(policy: &BackupPolicy) {
    if policy.min_backups > policy.max_backups {
        warn!(
            "Section '{}': qtd_minima_backups ({}) exceeds qtd_maxima_backups ({}); \
             eviction may never run for this policy",
            policy.name, policy.min_backups, policy.max_backups
        );
    }
}
