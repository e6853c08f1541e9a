//! Tests for the 'validate' command

use assert_cmd::Command;
use predicates::prelude::*;
use test_utils::{ConfigBuilder, TestContext};

fn warden() -> Command {
    Command::cargo_bin("backup-warden").expect("binary should build")
}

#[test]
fn test_validate_accepts_valid_config() {
    let ctx = TestContext::new();
    let backups = ctx.create_dir("backups");
    let config_path = ctx.path().join("warden.conf");
    ConfigBuilder::new()
        .section("backup-*.tar", &backups)
        .write_to(&config_path);

    warden()
        .args(["--config", config_path.to_str().unwrap(), "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid!"))
        .stdout(predicate::str::contains("Policies: 1"));
}

#[test]
fn test_validate_lists_each_policy() {
    let ctx = TestContext::new();
    let db = ctx.create_dir("db");
    let files = ctx.create_dir("files");
    let config_path = ctx.path().join("warden.conf");
    ConfigBuilder::new()
        .section("db-*.sql", &db)
        .section_with("snap-*", &files, "diretorio", 85, 1, 8)
        .write_to(&config_path);

    warden()
        .args(["--config", config_path.to_str().unwrap(), "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Policies: 2"))
        .stdout(predicate::str::contains("db-*.sql"))
        .stdout(predicate::str::contains("snap-*"));
}

#[test]
fn test_validate_rejects_unknown_key() {
    let ctx = TestContext::new();
    let backups = ctx.create_dir("backups");
    let config_path = ctx.path().join("warden.conf");
    ConfigBuilder::new()
        .section("backup-*.tar", &backups)
        .raw_line("[extra-*]")
        .raw_line("cadencia=daily")
        .write_to(&config_path);

    warden()
        .args(["--config", config_path.to_str().unwrap(), "validate"])
        .assert()
        .failure();
}

#[test]
fn test_validate_rejects_missing_backup_directory() {
    let ctx = TestContext::new();
    let config_path = ctx.path().join("warden.conf");
    let ghost = ctx.path().join("never-created");
    ConfigBuilder::new()
        .section("backup-*.tar", &ghost)
        .write_to(&config_path);

    warden()
        .args(["--config", config_path.to_str().unwrap(), "validate"])
        .assert()
        .failure();
}

#[test]
fn test_validate_generates_template_when_config_missing() {
    let ctx = TestContext::new();
    let config_path = ctx.path().join("missing.conf");

    warden()
        .args(["--config", config_path.to_str().unwrap(), "validate"])
        .assert()
        .failure();

    // The template was written so the operator has something to edit.
    let written = std::fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("tipo_backup="));
}
