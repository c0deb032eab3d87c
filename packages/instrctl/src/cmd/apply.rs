//! Apply the persisted plan, then refresh the state.

use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::Result;
use tracing::instrument;

use instrctl::apply::{ApplyPhase, apply_plan};
use instrctl::extract::Classifier;
use instrctl::git;

use super::configured_classifier;

#[derive(Args, Clone, Debug)]
pub struct Config {
    /// Directory inside the repository to operate on.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
}

#[instrument]
pub fn main(config: Config) -> Result<()> {
    let repo_root = git::repo_root(&config.repo)?;
    let classifier = configured_classifier(&repo_root)?;
    let classifier = classifier.as_ref().map(|c| c as &dyn Classifier);

    let plan = apply_plan(&repo_root, classifier, |phase| match phase {
        ApplyPhase::Validate => println!("→ Validating plan against HEAD"),
        ApplyPhase::Patch => println!("→ Applying patches"),
        ApplyPhase::State => println!("→ Refreshing state"),
    })?;

    println!("✓ Applied {} patches", plan.file_patches.len());
    Ok(())
}
