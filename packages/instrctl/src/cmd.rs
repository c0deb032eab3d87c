//! Command implementations for the instrctl CLI.

pub mod apply;
pub mod init;
pub mod plan;

use color_eyre::eyre::Result;
use instrctl::config::load_config;
use instrctl::extract::CommandClassifier;
use std::path::Path;

/// Build the configured classifier, when the config file names one.
pub fn configured_classifier(repo_root: &Path) -> Result<Option<CommandClassifier>> {
    let config = load_config(repo_root)?;
    Ok(config.classifier_command.map(CommandClassifier::new))
}
