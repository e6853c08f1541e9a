//! Unit tests for the retention engine's convergence behavior
//!
//! All filesystem state is mocked; these tests check the threshold,
//! floor, and ordering properties of the eviction loop.

use rstest::rstest;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{mock_tree, populate_mock, sample_policy, MockProbe, RetentionEngine};

const TIMEOUT: Duration = Duration::from_secs(5);

fn run(policies: Vec<backup_warden::BackupPolicy>, probe: MockProbe) -> anyhow::Result<()> {
    RetentionEngine::new(policies, Arc::new(probe), Duration::ZERO, TIMEOUT).run()
}

fn names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("backup-{i:02}.tar")).collect()
}

/// Convergence table: (initial count, min, max, usage %) -> surviving count.
#[rstest]
#[case(10, 2, 5, 50, 5)] // count-driven: evict down to max
#[case(10, 2, 5, 95, 2)] // usage-driven: evict down to the floor
#[case(3, 5, 2, 50, 3)] // min > max: trigger fires but the floor blocks
#[case(4, 4, 8, 95, 4)] // already at the floor: nothing to do
#[case(2, 2, 2, 50, 2)] // exactly at both bounds
#[case(1, 1, 1, 95, 1)] // single artifact is always protected
fn test_convergence_targets(
    #[case] initial: usize,
    #[case] min: u32,
    #[case] max: u32,
    #[case] usage: i64,
    #[case] expected_survivors: usize,
) {
    let dir = PathBuf::from("/backups");
    let names = names(initial);
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let probe = mock_tree(&dir, &name_refs);
    probe.set_usage(&dir, usage);

    run(vec![sample_policy(&dir, "backup-*.tar", 90, min, max)], probe.clone()).unwrap();

    assert_eq!(probe.entry_count(&dir), expected_survivors);
    // Monotonic convergence: exactly initial - survivors deletions, and the
    // count never dips below the floor.
    assert_eq!(probe.deleted_paths().len(), initial - expected_survivors);
    assert!(expected_survivors as u32 >= min.min(initial as u32));
}

#[test]
fn test_evictions_run_oldest_to_newest() {
    let dir = PathBuf::from("/backups");
    let probe = mock_tree(&dir, &["jan.tar", "feb.tar", "mar.tar", "apr.tar"]);
    probe.set_usage(&dir, 95);

    run(vec![sample_policy(&dir, "*.tar", 90, 1, 99)], probe.clone()).unwrap();

    assert_eq!(
        probe.deleted_paths(),
        vec![dir.join("jan.tar"), dir.join("feb.tar"), dir.join("mar.tar")]
    );
}

#[test]
fn test_policies_share_rounds_but_not_candidates() {
    let dir_a = PathBuf::from("/data/db");
    let dir_b = PathBuf::from("/data/files");
    let probe = MockProbe::new().with_directory(&dir_a).with_directory(&dir_b);
    populate_mock(&probe, &dir_a, &["db-1.sql", "db-2.sql", "db-3.sql"]);
    populate_mock(&probe, &dir_b, &["f-1.tar", "f-2.tar", "f-3.tar", "f-4.tar"]);
    probe.set_usage(&dir_a, 95);
    probe.set_usage(&dir_b, 10);

    run(
        vec![
            sample_policy(&dir_a, "db-*.sql", 90, 1, 99),
            sample_policy(&dir_b, "f-*.tar", 90, 1, 2),
        ],
        probe.clone(),
    )
    .unwrap();

    // Policy A evicted on usage down to its floor, policy B on count down to
    // its max; neither touched the other's directory.
    assert_eq!(probe.entry_count(&dir_a), 1);
    assert_eq!(probe.entry_count(&dir_b), 2);
}

#[test]
fn test_at_most_one_eviction_per_policy_per_round() {
    let dir = PathBuf::from("/backups");
    let probe = mock_tree(&dir, &["b1.tar", "b2.tar", "b3.tar", "b4.tar"]);
    probe.set_usage(&dir, 95);

    // Two policies over the same directory: per round each deletes at most
    // one artifact, so deletions interleave in policy order.
    run(
        vec![
            sample_policy(&dir, "b*.tar", 90, 2, 99),
            sample_policy(&dir, "b?.tar", 90, 2, 99),
        ],
        probe.clone(),
    )
    .unwrap();

    assert_eq!(probe.entry_count(&dir), 2);
}

#[test]
fn test_usage_exactly_at_limit_triggers_eviction() {
    let dir = PathBuf::from("/backups");
    let probe = mock_tree(&dir, &["b1.tar", "b2.tar", "b3.tar"]);
    probe.set_usage(&dir, 90);

    run(vec![sample_policy(&dir, "*.tar", 90, 2, 99)], probe.clone()).unwrap();

    // >= comparison: 90 meets the 90% limit.
    assert_eq!(probe.deleted_paths().len(), 1);
}

#[test]
fn test_usage_just_below_limit_does_not_trigger() {
    let dir = PathBuf::from("/backups");
    let probe = mock_tree(&dir, &["b1.tar", "b2.tar", "b3.tar"]);
    probe.set_usage(&dir, 89);

    run(vec![sample_policy(&dir, "*.tar", 90, 2, 99)], probe.clone()).unwrap();

    assert!(probe.deleted_paths().is_empty());
}

#[rstest]
#[case(-1)]
#[case(101)]
#[case(250)]
fn test_out_of_range_usage_aborts_the_run(#[case] usage: i64) {
    let dir = PathBuf::from("/backups");
    let probe = mock_tree(&dir, &["b1.tar", "b2.tar"]);
    probe.set_usage(&dir, usage);

    let err = run(vec![sample_policy(&dir, "*.tar", 90, 1, 99)], probe).unwrap_err();
    assert!(format!("{err:#}").contains("outside 0-100"));
}

#[test]
fn test_hung_policy_does_not_stop_the_others() {
    let hung = PathBuf::from("/mnt/stale");
    let live = PathBuf::from("/backups");
    let probe = MockProbe::new().with_directory(&hung).with_directory(&live);
    populate_mock(&probe, &hung, &["h1.tar", "h2.tar", "h3.tar"]);
    populate_mock(&probe, &live, &["l1.tar", "l2.tar", "l3.tar"]);
    probe.set_hung(Path::new("/mnt/stale"), true);
    probe.set_usage(&live, 95);

    run(
        vec![
            sample_policy(&hung, "h*.tar", 90, 1, 99),
            sample_policy(&live, "l*.tar", 90, 1, 99),
        ],
        probe.clone(),
    )
    .unwrap();

    assert_eq!(probe.entry_count(&hung), 3);
    assert_eq!(probe.entry_count(&live), 1);
}

#[test]
fn test_empty_directory_converges_immediately() {
    let dir = PathBuf::from("/backups");
    let probe = MockProbe::new().with_directory(&dir);
    probe.set_usage(&dir, 99);

    run(vec![sample_policy(&dir, "*.tar", 90, 1, 5)], probe.clone()).unwrap();
    assert!(probe.deleted_paths().is_empty());
}
