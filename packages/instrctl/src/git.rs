//! Git state queries and patch application via shell commands.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use color_eyre::eyre::{Context, OptionExt, Result, bail};

/// Resolve the root of the repository containing `cwd`.
pub fn repo_root(cwd: &Path) -> Result<PathBuf> {
    let output = Command::new("git")
        .arg("-C")
        .arg(cwd)
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .context("run git rev-parse --show-toplevel")?;

    if !output.status.success() {
        bail!(
            "not inside a git repository ({}): {}",
            cwd.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let root = String::from_utf8(output.stdout).context("parse git output as UTF-8")?;
    Ok(PathBuf::from(root.trim()))
}

/// Get the commit hash of the repository's current HEAD.
pub fn head_commit(repo_root: &Path) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(["rev-parse", "HEAD"])
        .output()
        .context("run git rev-parse HEAD")?;

    if !output.status.success() {
        bail!(
            "failed to resolve HEAD (does the repository have at least one commit?): {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let commit = String::from_utf8(output.stdout).context("parse git output as UTF-8")?;
    Ok(commit.trim().to_string())
}

/// Apply a unified diff to the working tree in whitespace-tolerant mode.
///
/// The patch is fed on stdin; on failure git's stderr is surfaced verbatim.
pub fn apply_patch(repo_root: &Path, patch: &str) -> Result<()> {
    let mut child = Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(["apply", "--whitespace=nowarn", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawn git apply")?;

    {
        let mut stdin = child.stdin.take().ok_or_eyre("open stdin for git apply")?;
        stdin
            .write_all(patch.as_bytes())
            .context("write patch to git apply")?;
    }

    let output = child.wait_with_output().context("wait for git apply")?;
    if !output.status.success() {
        bail!(
            "git apply failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_root_outside_a_repository() {
        // A fresh temp dir is not a git repository.
        let dir = tempfile::TempDir::new().expect("create temp dir");
        assert!(repo_root(dir.path()).is_err());
    }

    #[test]
    fn test_head_commit_outside_a_repository() {
        let dir = tempfile::TempDir::new().expect("create temp dir");
        assert!(head_commit(dir.path()).is_err());
    }
}
