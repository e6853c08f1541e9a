//! Tests for glob pattern compilation

use backup_warden::utils::pattern::{compile_glob, is_wildcard_only};
use rstest::rstest;

#[rstest]
#[case("backup-*.tar.gz", "backup-2024-06-01.tar.gz", true)]
#[case("backup-*.tar.gz", "backup-.tar.gz", true)]
#[case("backup-*.tar.gz", "backup-2024.tar.bz2", false)]
#[case("dump-??.sql", "dump-01.sql", true)]
#[case("dump-??.sql", "dump-1.sql", false)]
#[case("*.tar", "a.tar", true)]
#[case("*.tar", "a.tar.gz", false)]
#[case("snapshot", "snapshot", true)]
#[case("snapshot", "snapshots", false)]
fn test_glob_matching(#[case] pattern: &str, #[case] name: &str, #[case] expected: bool) {
    let re = compile_glob(pattern).unwrap();
    assert_eq!(re.is_match(name), expected, "{pattern} vs {name}");
}

#[test]
fn test_dots_are_not_regex_wildcards() {
    let re = compile_glob("db.dump").unwrap();
    assert!(!re.is_match("dbxdump"));
}

#[test]
fn test_wildcard_only_patterns() {
    assert!(is_wildcard_only("*"));
    assert!(is_wildcard_only("**"));
    assert!(!is_wildcard_only("?"));
    assert!(!is_wildcard_only("*.bak"));
}
