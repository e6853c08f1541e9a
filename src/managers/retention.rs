//! Retention engine - runs the eviction loop to convergence

use crate::config::BackupPolicy;
use crate::utils::probe::{format_size, FilesystemProbe, ProbeError};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a single policy evaluation decided this round.
#[derive(Debug)]
#[allow(dead_code)]
enum PolicyOutcome {
    /// The oldest matching artifact was deleted.
    Evicted { path: PathBuf, freed: u64 },
    /// Eviction was triggered but the count is already at or below minimum.
    FloorReached,
    /// Usage and count are both within bounds.
    WithinBounds,
    /// No artifacts match the pattern.
    NoMatches,
    /// Mount liveness could not be confirmed; policy sat out this round.
    Skipped,
}

pub struct RetentionEngine {
    policies: Vec<BackupPolicy>,
    probe: Arc<dyn FilesystemProbe>,
    poll_interval: Duration,
    probe_timeout: Duration,
}

impl RetentionEngine {
    /// Create a new retention engine over an ordered policy sequence.
    pub fn new(
        policies: Vec<BackupPolicy>,
        probe: Arc<dyn FilesystemProbe>,
        poll_interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            policies,
            probe,
            poll_interval,
            probe_timeout,
        }
    }

    /// Run eviction rounds until no policy makes further progress.
    ///
    /// Each round deletes at most one artifact per policy, then the whole
    /// policy set is re-evaluated so disk usage readings stay fresh. The
    /// loop terminates because every deletion strictly reduces a policy's
    /// match count and no policy can evict below its floor.
    pub fn run(&self) -> Result<()> {
        info!(
            "Starting retention run for {} {}",
            self.policies.len(),
            if self.policies.len() == 1 { "policy" } else { "policies" }
        );

        let mut round = 0u64;
        loop {
            round += 1;
            let mut progressed = false;

            for policy in &self.policies {
                let outcome = self
                    .evaluate_policy(policy)
                    .with_context(|| format!("Policy '{}' failed", policy.name))?;
                if matches!(outcome, PolicyOutcome::Evicted { .. }) {
                    progressed = true;
                }
            }

            if !progressed {
                info!("Round {}: no evictions, retention converged", round);
                return Ok(());
            }

            debug!("Round {} evicted, sleeping {:?} before re-evaluating", round, self.poll_interval);
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Evaluate one policy, deleting at most one artifact.
    fn evaluate_policy(&self, policy: &BackupPolicy) -> Result<PolicyOutcome> {
        match self.probe.is_live_mount(&policy.directory, self.probe_timeout) {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    "Policy '{}': {:?} is not reachable, skipping this round",
                    policy.name, policy.directory
                );
                return Ok(PolicyOutcome::Skipped);
            }
            Err(ProbeError::Timeout { .. }) => {
                warn!(
                    "Policy '{}': mount check for {:?} timed out, skipping this round",
                    policy.name, policy.directory
                );
                return Ok(PolicyOutcome::Skipped);
            }
            Err(err) => {
                warn!(
                    "Policy '{}': mount check for {:?} failed ({}), skipping this round",
                    policy.name, policy.directory, err
                );
                return Ok(PolicyOutcome::Skipped);
            }
        }

        let usage = self
            .probe
            .disk_usage_percent(&policy.directory)
            .with_context(|| format!("Failed to read disk usage for {:?}", policy.directory))?;
        if !(0..=100).contains(&usage) {
            bail!(
                "Disk usage for {:?} reported as {}%, outside 0-100",
                policy.directory,
                usage
            );
        }

        let matches = self
            .probe
            .list_matches(&policy.directory, policy.kind, policy.pattern())
            .with_context(|| {
                format!(
                    "Failed to list '{}' entries in {:?}",
                    policy.pattern(),
                    policy.directory
                )
            })?;
        let count = matches.len();

        if count == 0 {
            info!(
                "Policy '{}': no matching artifacts in {:?}, nothing to do",
                policy.name, policy.directory
            );
            return Ok(PolicyOutcome::NoMatches);
        }

        let over_usage = usage >= i64::from(policy.disk_limit_percent);
        let over_count = count as u64 > u64::from(policy.max_backups);

        if !over_usage && !over_count {
            info!(
                "Policy '{}': usage {}% (limit {}%), {} artifacts (max {}), within bounds",
                policy.name, usage, policy.disk_limit_percent, count, policy.max_backups
            );
            return Ok(PolicyOutcome::WithinBounds);
        }

        if count as u64 <= u64::from(policy.min_backups) {
            info!(
                "Policy '{}': eviction triggered but only {} artifacts remain (minimum {}), keeping all",
                policy.name, count, policy.min_backups
            );
            return Ok(PolicyOutcome::FloorReached);
        }

        // Listings come back oldest-first; an empty candidate here despite a
        // positive count means the probe contradicted itself.
        let oldest = match matches.first() {
            Some(artifact) => artifact,
            None => bail!(
                "{} artifacts matched for policy '{}' but no eviction candidate was found",
                count,
                policy.name
            ),
        };

        let freed = self.probe.size_of(&oldest.path).with_context(|| {
            format!(
                "Failed to size eviction candidate {:?} for policy '{}'",
                oldest.path, policy.name
            )
        })?;

        self.probe.delete(&oldest.path, policy.kind).with_context(|| {
            format!(
                "Failed to delete {:?} for policy '{}'",
                oldest.path, policy.name
            )
        })?;

        let modified: DateTime<Local> = oldest.modified.into();
        info!(
            "Policy '{}': evicted {:?} (modified {}, freed {})",
            policy.name,
            oldest.path,
            modified.format("%Y-%m-%d %H:%M:%S"),
            format_size(freed)
        );

        Ok(PolicyOutcome::Evicted {
            path: oldest.path.clone(),
            freed,
        })
    }
}
