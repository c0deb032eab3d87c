//! Pairwise conflict detection over the extracted principle set.
//!
//! Duplicates and contradictions are keyed on the normalized statement, so
//! case and punctuation differences never create false "distinct"
//! principles. Contradictions only cover MUST vs MUST_NOT over identical
//! normalized text; differently-worded contradictions are out of reach by
//! design.

use std::collections::HashMap;

use derive_more::Display;
use monostate::MustBe;
use serde::{Deserialize, Serialize};

use crate::extract::{Principle, Strength, normalize_statement};
use crate::scope::scope_intersects;

/// Kind of tension detected between principles. Only DUPLICATE and
/// CONTRADICTION are currently produced; the remaining variants are part of
/// the persisted vocabulary for future detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    #[display("DUPLICATE")]
    Duplicate,
    #[display("CONTRADICTION")]
    Contradiction,
    #[display("PARAMETER_MISMATCH")]
    ParameterMismatch,
    #[display("OVERRIDE_MISSING")]
    OverrideMissing,
    #[display("AMBIGUOUS_SCOPE")]
    AmbiguousScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    #[display("LOW")]
    Low,
    #[display("MEDIUM")]
    Medium,
    #[display("HIGH")]
    High,
}

/// A detected tension between two or more principles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_id: String,

    #[serde(rename = "type")]
    pub conflict_type: ConflictType,

    pub severity: Severity,

    pub principle_ids: Vec<String>,

    pub overlapping_scope: Vec<String>,

    /// The statements involved, quoted verbatim.
    pub evidence: Vec<String>,

    pub explanation: String,

    pub suggested_resolution: String,

    /// Contradictions always block; duplicates never do.
    pub blocking: bool,
}

/// Persisted conflict report, co-written with the state file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictsFile {
    pub version: MustBe!(1u64),
    pub base_commit: String,
    pub conflicts: Vec<Conflict>,
}

impl ConflictsFile {
    pub fn empty(base_commit: impl Into<String>) -> Self {
        ConflictsFile {
            version: MustBe!(1u64),
            base_commit: base_commit.into(),
            conflicts: Vec::new(),
        }
    }

    pub fn has_blocking(&self) -> bool {
        self.conflicts.iter().any(|conflict| conflict.blocking)
    }
}

fn conflict_key(strength: Strength, statement: &str) -> String {
    format!("{strength}-{}", normalize_statement(statement))
}

/// Compare the full principle set pairwise and report duplicates and
/// contradictions. Conflict ids are sequential `C-<n>` strings; duplicates
/// are numbered before contradictions.
#[tracing::instrument(skip(principles))]
pub fn build_conflicts(base_commit: &str, principles: &[Principle]) -> ConflictsFile {
    let mut conflicts = Vec::new();
    let mut counter = 0usize;

    // Duplicates: the first principle per key is canonical, every later one
    // with the same key is flagged against it.
    let mut first_seen: HashMap<String, &Principle> = HashMap::new();
    for principle in principles {
        let key = conflict_key(principle.strength, &principle.statement);
        match first_seen.get(&key) {
            Some(canonical) => {
                counter += 1;
                conflicts.push(duplicate_conflict(counter, canonical, principle));
            }
            None => {
                first_seen.insert(key, principle);
            }
        }
    }

    // Contradictions: look up the inverse-strength key among already-seen
    // principles, then record the current one under its own key.
    let mut seen: HashMap<String, &Principle> = HashMap::new();
    for principle in principles {
        if let Some(inverse) = principle.strength.inverse() {
            let inverse_key = conflict_key(inverse, &principle.statement);
            if let Some(other) = seen.get(&inverse_key) {
                counter += 1;
                conflicts.push(contradiction_conflict(counter, other, principle));
            }
        }
        seen.insert(conflict_key(principle.strength, &principle.statement), principle);
    }

    tracing::debug!(
        total = conflicts.len(),
        blocking = conflicts.iter().filter(|c| c.blocking).count(),
        "built conflict report"
    );

    ConflictsFile {
        version: MustBe!(1u64),
        base_commit: base_commit.to_string(),
        conflicts,
    }
}

fn duplicate_conflict(number: usize, canonical: &Principle, duplicate: &Principle) -> Conflict {
    Conflict {
        conflict_id: format!("C-{number}"),
        conflict_type: ConflictType::Duplicate,
        severity: Severity::Low,
        principle_ids: vec![canonical.id.clone(), duplicate.id.clone()],
        overlapping_scope: overlapping_scope(canonical, duplicate),
        evidence: vec![canonical.statement.clone(), duplicate.statement.clone()],
        explanation: format!(
            "Principles '{}' and '{}' state the same {} requirement.",
            canonical.title, duplicate.title, duplicate.strength
        ),
        suggested_resolution:
            "Merge the duplicates into a single canonical principle and remove the extra occurrences."
                .to_string(),
        blocking: false,
    }
}

fn contradiction_conflict(number: usize, first: &Principle, second: &Principle) -> Conflict {
    Conflict {
        conflict_id: format!("C-{number}"),
        conflict_type: ConflictType::Contradiction,
        severity: Severity::High,
        principle_ids: vec![first.id.clone(), second.id.clone()],
        overlapping_scope: overlapping_scope(first, second),
        evidence: vec![first.statement.clone(), second.statement.clone()],
        explanation: format!(
            "'{}' is {} by one principle and {} by another over the same statement.",
            second.statement, first.strength, second.strength
        ),
        suggested_resolution:
            "Decide which modality is correct and remove or reword the other principle."
                .to_string(),
        blocking: true,
    }
}

/// The first principle's scope patterns that intersect the second's scope.
fn overlapping_scope(a: &Principle, b: &Principle) -> Vec<String> {
    a.scope
        .iter()
        .filter(|pattern| scope_intersects(std::slice::from_ref(*pattern), &b.scope))
        .cloned()
        .collect()
}

/// Render the human-readable conflict report.
pub fn render_conflicts_md(conflicts: &ConflictsFile) -> String {
    if conflicts.conflicts.is_empty() {
        return "No conflicts detected.\n".to_string();
    }

    let mut out = String::from(
        "| ID | Type | Severity | Blocking | Principle IDs | Explanation |\n\
         | --- | --- | --- | --- | --- | --- |\n",
    );
    for conflict in &conflicts.conflicts {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            conflict.conflict_id,
            conflict.conflict_type,
            conflict.severity,
            if conflict.blocking { "yes" } else { "no" },
            conflict.principle_ids.join(", "),
            conflict.explanation,
        ));
    }
    out
}
