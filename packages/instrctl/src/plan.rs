//! Plan building: managed-section rendering, splicing, and diffing.
//!
//! A plan is a commit-pinned set of file patches that bring every
//! document's managed section in line with the desired principle set. The
//! splice is idempotent: re-planning an unmodified, already-patched file
//! yields a byte-identical document and therefore no patch.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use monostate::MustBe;
use serde::{Deserialize, Serialize};

use crate::config::load_config;
use crate::extract::Principle;
use crate::scope::scope_intersects;
use crate::state::{read_conflicts, read_state, write_plan};

pub const MANAGED_HEADING: &str = "## Managed Principles";
pub const MANAGED_BEGIN: &str = "<!-- instrctl:begin managed -->";
pub const MANAGED_END: &str = "<!-- instrctl:end managed -->";

/// How the desired set differs from the extracted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Add,
    Remove,
}

/// One difference between the extracted and desired principle sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipleChange {
    pub action: ChangeAction,
    pub id: String,
    pub before_hash: Option<String>,
    pub after_hash: Option<String>,
}

/// A unified diff for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePatch {
    pub path: String,
    pub patch_unified: String,
}

/// Conflict summary carried in the plan for exit-code decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictSummary {
    pub conflict_id: String,
    pub blocking: bool,
}

/// Reserved patch-safety checks; both currently always pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    pub patch_constraints_ok: bool,
    pub roundtrip_ok: bool,
}

/// The persisted plan artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFile {
    pub version: MustBe!(1u64),

    /// Must equal the repository's HEAD for the plan to be applicable.
    pub base_commit: String,

    pub principle_changes: Vec<PrincipleChange>,
    pub file_patches: Vec<FilePatch>,
    pub conflicts: Vec<ConflictSummary>,
    pub validation: Validation,
}

impl PlanFile {
    pub fn has_blocking_conflicts(&self) -> bool {
        self.conflicts.iter().any(|conflict| conflict.blocking)
    }
}

/// Compute the desired principle set, diff every document's managed section
/// against it, and persist the resulting plan pinned to the state's HEAD
/// commit.
#[tracing::instrument]
pub fn build_plan(repo_root: &Path) -> Result<PlanFile> {
    let state = read_state(repo_root)?;
    let conflicts = read_conflicts(repo_root)?;
    let config = load_config(repo_root)?;

    // A human-curated config set overrides whatever extraction found.
    let desired = if config.principles.is_empty() {
        state.principles.clone()
    } else {
        tracing::debug!(
            count = config.principles.len(),
            "using config override principles"
        );
        config.principles.clone()
    };
    let desired = dedup_by_fingerprint(desired);

    let mut file_patches = Vec::new();
    for doc in &state.documents {
        let original = fs::read_to_string(repo_root.join(&doc.path))
            .with_context(|| format!("read instruction document: {}", doc.path))?;

        let selected = desired
            .iter()
            .filter(|principle| scope_intersects(&principle.scope, &doc.doc_scope))
            .collect::<Vec<_>>();

        let updated = splice_managed_section(&original, &selected);
        if updated == original {
            continue;
        }

        file_patches.push(FilePatch {
            patch_unified: unified_diff(&doc.path, &original, &updated),
            path: doc.path.clone(),
        });
    }

    let plan = PlanFile {
        version: MustBe!(1u64),
        base_commit: state.repo.head_commit.clone(),
        principle_changes: principle_changes(&state.principles, &desired),
        file_patches,
        conflicts: conflicts
            .conflicts
            .iter()
            .map(|conflict| ConflictSummary {
                conflict_id: conflict.conflict_id.clone(),
                blocking: conflict.blocking,
            })
            .collect(),
        validation: Validation {
            patch_constraints_ok: true,
            roundtrip_ok: true,
        },
    };

    write_plan(repo_root, &plan)?;
    Ok(plan)
}

/// Splice the rendered managed section into a document.
///
/// Three tiers, in order: replace the span between existing begin/end
/// markers; replace everything from the bare heading onward; append the
/// whole section after the existing content. An empty selection with no
/// existing section leaves the document untouched.
pub fn splice_managed_section(content: &str, principles: &[&Principle]) -> String {
    if let (Some(begin), Some(end)) = (content.find(MANAGED_BEGIN), content.find(MANAGED_END)) {
        if begin < end {
            let prefix = &content[..begin + MANAGED_BEGIN.len()];
            let suffix = &content[end..];
            return format!("{prefix}\n{}{suffix}", render_entries(principles));
        }
    }

    if let Some(heading) = content.find(MANAGED_HEADING) {
        let prefix = &content[..heading];
        return format!("{prefix}{}", render_section(principles));
    }

    if principles.is_empty() {
        return content.to_string();
    }

    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&render_section(principles));
    out
}

/// Render the full managed section, heading and outer markers included.
fn render_section(principles: &[&Principle]) -> String {
    format!(
        "{MANAGED_HEADING}\n\n{MANAGED_BEGIN}\n{}{MANAGED_END}\n",
        render_entries(principles)
    )
}

/// Render the per-principle entries, sorted by title, each wrapped in a
/// uniquely-tagged comment pair.
fn render_entries(principles: &[&Principle]) -> String {
    let mut sorted = principles.to_vec();
    sorted.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));

    let mut out = String::new();
    for principle in sorted {
        out.push_str(&format!(
            "<!-- instrctl:begin {id} -->\n- **{strength}** {statement}\n<!-- instrctl:end {id} -->\n",
            id = principle.id,
            strength = principle.strength,
            statement = principle.statement,
        ));
    }
    out
}

fn unified_diff(path: &str, original: &str, updated: &str) -> String {
    let mut options = diffy::DiffOptions::new();
    options.set_original_filename(format!("a/{path}"));
    options.set_modified_filename(format!("b/{path}"));
    options.create_patch(original, updated).to_string()
}

/// Fingerprint set-difference between the extracted state and the desired
/// set: principles only in the desired set are additions, principles only in
/// the state are removals. Hashes are fingerprints.
fn principle_changes(current: &[Principle], desired: &[Principle]) -> Vec<PrincipleChange> {
    let current_fingerprints = current
        .iter()
        .map(|p| p.fingerprint.as_str())
        .collect::<std::collections::HashSet<_>>();
    let desired_fingerprints = desired
        .iter()
        .map(|p| p.fingerprint.as_str())
        .collect::<std::collections::HashSet<_>>();

    let mut changes = Vec::new();
    for principle in desired {
        if !current_fingerprints.contains(principle.fingerprint.as_str()) {
            changes.push(PrincipleChange {
                action: ChangeAction::Add,
                id: principle.id.clone(),
                before_hash: None,
                after_hash: Some(principle.fingerprint.clone()),
            });
        }
    }
    for principle in current {
        if !desired_fingerprints.contains(principle.fingerprint.as_str()) {
            changes.push(PrincipleChange {
                action: ChangeAction::Remove,
                id: principle.id.clone(),
                before_hash: Some(principle.fingerprint.clone()),
                after_hash: None,
            });
        }
    }
    changes
}

fn dedup_by_fingerprint(principles: Vec<Principle>) -> Vec<Principle> {
    let mut seen = std::collections::HashSet::new();
    principles
        .into_iter()
        .filter(|principle| seen.insert(principle.fingerprint.clone()))
        .collect()
}
