//! Compute managed-section patches against the recorded state.

use std::path::PathBuf;
use std::process;

use clap::Args;
use color_eyre::eyre::Result;
use tracing::instrument;

use instrctl::{git, plan, state};

#[derive(Args, Clone, Debug)]
pub struct Config {
    /// Directory inside the repository to operate on.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
}

#[instrument]
pub fn main(config: Config) -> Result<()> {
    let repo_root = git::repo_root(&config.repo)?;
    let plan = plan::build_plan(&repo_root)?;

    if plan.file_patches.is_empty() {
        println!("✓ All managed sections are up to date; no patches needed");
    } else {
        println!(
            "✓ Plan written to {}/{} ({} file patches, pinned to {})",
            state::STATE_DIR,
            state::PLAN_FILE,
            plan.file_patches.len(),
            plan.base_commit
        );
        for patch in &plan.file_patches {
            println!("  - {}", patch.path);
        }
    }

    // Artifacts are always written; blocking conflicts surface through the
    // exit code so the user still gets the report to resolve them.
    if plan.has_blocking_conflicts() {
        println!(
            "✗ Blocking conflicts present; resolve them before applying (see {}/{})",
            state::STATE_DIR,
            state::CONFLICTS_REPORT
        );
        process::exit(2);
    }

    if !plan.validation.patch_constraints_ok {
        println!("✗ Plan failed patch-constraint validation");
        process::exit(4);
    }

    Ok(())
}
