//! Command tests for backup-warden
//!
//! These tests drive the real binary with assert_cmd against temporary
//! directories and config files.

mod init_config;
mod run;
mod validate;
