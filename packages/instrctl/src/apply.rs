//! Transactional application of a persisted plan.

use std::path::Path;

use color_eyre::eyre::{Context, Result, bail};
use derive_more::Display;

use crate::extract::Classifier;
use crate::git;
use crate::plan::PlanFile;
use crate::state::{read_plan, read_state, write_state_files};

/// Progress phases reported to the caller; purely informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ApplyPhase {
    #[display("validate")]
    Validate,
    #[display("patch")]
    Patch,
    #[display("state")]
    State,
}

/// Validate the plan's pinned commit against the current HEAD, apply each
/// patch in file order, then rebuild the state against the patched files.
///
/// A single patch failure aborts the remaining patches; already-applied
/// patches are left in place for the user to resolve, matching how patch
/// tools behave.
#[tracing::instrument(skip(classifier, on_phase))]
pub fn apply_plan(
    repo_root: &Path,
    classifier: Option<&dyn Classifier>,
    mut on_phase: impl FnMut(ApplyPhase),
) -> Result<PlanFile> {
    on_phase(ApplyPhase::Validate);
    let _state = read_state(repo_root)?;
    let plan = read_plan(repo_root)?;

    let head = git::head_commit(repo_root).context("resolve HEAD commit")?;
    if plan.base_commit != head {
        bail!(
            "plan is stale: it was computed against commit {} but HEAD is now {}; \
             re-run `instrctl plan`",
            plan.base_commit,
            head
        );
    }

    on_phase(ApplyPhase::Patch);
    for patch in &plan.file_patches {
        tracing::debug!(path = %patch.path, "applying patch");
        git::apply_patch(repo_root, &patch.patch_unified)
            .with_context(|| format!("apply patch for {}", patch.path))?;
    }

    on_phase(ApplyPhase::State);
    write_state_files(repo_root, classifier).context("refresh state after apply")?;

    Ok(plan)
}
