//! Tests for the 'run' command

use assert_cmd::Command;
use backup_warden::InstanceLock;
use serial_test::serial;
use test_utils::{ConfigBuilder, TestContext, BASE_MTIME};

fn warden() -> Command {
    Command::cargo_bin("backup-warden").expect("binary should build")
}

fn run_args(ctx: &TestContext, config_path: &std::path::Path) -> Vec<String> {
    vec![
        "--config".into(),
        config_path.display().to_string(),
        "--poll-interval".into(),
        "0".into(),
        "--log-dir".into(),
        ctx.path().join("logs").display().to_string(),
        "run".into(),
    ]
}

#[test]
fn test_run_evicts_oldest_down_to_max() {
    let ctx = TestContext::new();
    let backups = ctx.create_dir("backups");
    for i in 1..=6 {
        ctx.create_backup(&backups, &format!("b{i}.tar"), BASE_MTIME as i64 + i * 3600);
    }

    // min == max pins the converged count regardless of real disk usage.
    // Config names are unique per test: the file stem keys the daemon lock.
    let config_path = ctx.path().join("evict-warden.conf");
    ConfigBuilder::new()
        .section_with("b*.tar", &backups, "arquivo", 99, 5, 5)
        .write_to(&config_path);

    warden().args(run_args(&ctx, &config_path)).assert().success();

    assert!(!backups.join("b1.tar").exists(), "oldest should be evicted");
    for i in 2..=6 {
        assert!(backups.join(format!("b{i}.tar")).exists());
    }
}

#[test]
fn test_run_within_bounds_changes_nothing() {
    let ctx = TestContext::new();
    let backups = ctx.create_dir("backups");
    for i in 1..=3 {
        ctx.create_backup(&backups, &format!("b{i}.tar"), BASE_MTIME as i64 + i * 3600);
    }

    let config_path = ctx.path().join("bounds-warden.conf");
    ConfigBuilder::new()
        .section_with("b*.tar", &backups, "arquivo", 99, 3, 10)
        .write_to(&config_path);

    warden().args(run_args(&ctx, &config_path)).assert().success();

    for i in 1..=3 {
        assert!(backups.join(format!("b{i}.tar")).exists());
    }
}

#[test]
fn test_run_bootstraps_template_and_fails_without_config() {
    let ctx = TestContext::new();
    let config_path = ctx.path().join("fresh.conf");

    warden().args(run_args(&ctx, &config_path)).assert().failure();

    let written = std::fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("qtd_minima_backups="));
}

#[test]
#[serial]
fn test_run_is_refused_while_another_instance_holds_the_lock() {
    let ctx = TestContext::new();
    let backups = ctx.create_dir("backups");
    let config_path = ctx.path().join("locked-warden.conf");
    ConfigBuilder::new()
        .section("b*.tar", &backups)
        .write_to(&config_path);

    // Hold the daemon lock for this config's key in-process.
    let _lock = InstanceLock::acquire("locked-warden").expect("test should get the lock first");

    warden().args(run_args(&ctx, &config_path)).assert().failure();
}
