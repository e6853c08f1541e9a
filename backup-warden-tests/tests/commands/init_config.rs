//! Tests for the 'init-config' command

use assert_cmd::Command;
use test_utils::TestContext;

fn warden() -> Command {
    Command::cargo_bin("backup-warden").expect("binary should build")
}

#[test]
fn test_init_config_writes_template() {
    let ctx = TestContext::new();
    let config_path = ctx.path().join("warden.conf");

    warden()
        .args(["--config", config_path.to_str().unwrap(), "init-config"])
        .assert()
        .success();

    let written = std::fs::read_to_string(&config_path).unwrap();
    assert!(written.starts_with('#'));
    assert!(written.contains("tipo_backup=arquivo"));
    assert!(written.contains("qtd_maxima_backups="));
}

#[test]
fn test_init_config_refuses_to_overwrite() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file("warden.conf", "# operator config, hands off\n");

    warden()
        .args(["--config", config_path.to_str().unwrap(), "init-config"])
        .assert()
        .failure();

    let preserved = std::fs::read_to_string(&config_path).unwrap();
    assert_eq!(preserved, "# operator config, hands off\n");
}

#[test]
fn test_init_config_force_overwrites() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file("warden.conf", "# stale config\n");

    warden()
        .args([
            "--config",
            config_path.to_str().unwrap(),
            "init-config",
            "--force",
        ])
        .assert()
        .success();

    let written = std::fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("tipo_backup=arquivo"));
}
