//! Build the instruction-document state for the current repository.

use std::path::PathBuf;
use std::process;

use clap::Args;
use color_eyre::eyre::Result;
use tracing::instrument;

use instrctl::extract::Classifier;
use instrctl::{git, state};

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

    let (state, conflicts) = state::write_state_files(&repo_root, classifier)?;

    println!(
        "✓ Discovered {} documents, extracted {} principles",
        state.documents.len(),
        state.principles.len()
    );
    for doc in &state.documents {
        println!("  - {} ({})", doc.path, doc.dialect);
    }

    if !conflicts.conflicts.is_empty() {
        let blocking = conflicts
            .conflicts
            .iter()
            .filter(|conflict| conflict.blocking)
            .count();
        println!(
            "{} conflicts detected ({} blocking); see {}/{}",
            conflicts.conflicts.len(),
            blocking,
            state::STATE_DIR,
            state::CONFLICTS_REPORT
        );
    }

    if conflicts.has_blocking() {
        println!("✗ Blocking conflicts must be resolved before planning");
        process::exit(2);
    }

    Ok(())
}
