//! Shared test infrastructure for CLI integration tests.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Runs `claimcheck` with an isolated home so no user codebook leaks in.
pub struct Claimcheck {
    home: TempDir,
}

impl Default for Claimcheck {
    fn default() -> Self {
        Claimcheck::new()
    }
}

impl Claimcheck {
    pub fn new() -> Self {
        Claimcheck {
            home: tempfile::tempdir().expect("create temp home"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.home.path().join(name)
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_claimcheck"));
        command
            .env_remove("CLAIMCHECK_CODEBOOK")
            .env_remove("CLAIMCHECK_LOG")
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join(".config"));
        command
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command().args(args).output().expect("run claimcheck")
    }

    /// Run and parse stdout as JSON, asserting the given exit code.
    pub fn json(&self, args: &[&str], expected_code: i32) -> serde_json::Value {
        let output = self.run(args);
        assert_eq!(
            output.status.code(),
            Some(expected_code),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("parse stdout JSON")
    }
}
