//! Integration tests for the instrctl lifecycle.
//!
//! These tests build throwaway git repositories and drive the compiled
//! binary end-to-end: init discovers and extracts, plan computes patches,
//! apply patches files and refreshes state.

mod conflicts;
mod discovery;
mod lifecycle;

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use xshell::{Shell, cmd};

/// Create a git repository fixture with the given files committed.
pub fn fixture_repo(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let sh = Shell::new().expect("create shell");
    sh.change_dir(dir.path());

    cmd!(sh, "git init --quiet").run().expect("git init");
    write_files(dir.path(), files);
    commit_all(dir.path(), "initial");

    dir
}

/// Write files into the fixture, creating parent directories as needed.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&full, content).expect("write fixture file");
    }
}

/// Stage and commit everything in the fixture.
pub fn commit_all(root: &Path, message: &str) {
    let sh = Shell::new().expect("create shell");
    sh.change_dir(root);
    cmd!(sh, "git add --all").run().expect("git add");
    cmd!(
        sh,
        "git -c user.name=fixture -c user.email=fixture@example.com commit --quiet -m {message}"
    )
    .run()
    .expect("git commit");
}

/// Run the instrctl binary with the given subcommand inside `repo`.
pub fn run_instrctl(repo: &Path, subcommand: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_instrctl"))
        .arg(subcommand)
        .arg("--repo")
        .arg(repo)
        .output()
        .expect("run instrctl")
}

/// Exit code of a finished process, panicking on signals.
pub fn exit_code(output: &Output) -> i32 {
    output.status.code().expect("process exited with a code")
}

/// Read and parse a JSON artifact from the fixture's state directory.
pub fn read_artifact(repo: &Path, name: &str) -> serde_json::Value {
    let path = repo.join(".instrctl").join(name);
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("read artifact {}: {e}", path.display()));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("parse artifact {}: {e}", path.display()))
}
