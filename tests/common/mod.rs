//! Shared test infrastructure for integration tests.
// Each test crate uses a different subset of these helpers.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A temp directory seeded with the files under `tests/data`, plus a way to
/// run the binary inside it without picking up the user's own config.
pub struct Workspace {
    dir: TempDir,
}

/// Captured result of one `cmdsynth` invocation.
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().collect()
    }

    /// Panic with stderr attached when the run failed.
    pub fn assert_ok(self) -> Self {
        assert!(self.success, "cmdsynth failed:\n{}", self.stderr);
        self
    }
}

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        for entry in std::fs::read_dir(data_dir()).expect("read tests/data") {
            let entry = entry.expect("data entry");
            std::fs::copy(entry.path(), dir.path().join(entry.file_name()))
                .expect("copy fixture");
        }
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).expect("read workspace file")
    }

    pub fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.path(name), contents).expect("write workspace file");
    }

    pub fn run(&self, args: &[&str]) -> RunResult {
        let output = Command::new(env!("CARGO_BIN_EXE_cmdsynth"))
            .args(args)
            .current_dir(self.dir.path())
            .env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env("RUST_LOG", "warn")
            .output()
            .expect("run cmdsynth");
        RunResult::from_output(output)
    }
}
