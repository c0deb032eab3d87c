//! Build script for instrctl that generates version information.
//!
//! Uses `git describe --always` to get the base version when building from a
//! git checkout, and falls back to the crate version when git is unavailable
//! (e.g. building from a source tarball).

use std::process::Command;

fn main() {
    println!("cargo:rustc-env=INSTRCTL_VERSION={}", version());
}

fn version() -> String {
    git_describe().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

fn git_describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--tags", "--dirty=-dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let version = String::from_utf8(output.stdout).ok()?;
    let version = version.trim();
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}
