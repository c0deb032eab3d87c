//! Principle extraction from instruction documents.
//!
//! Two strategies, tried in order: an optional external classifier (best
//! effort, never blocking) and a deterministic line-oriented heuristic that
//! is always available. Both produce [`Principle`] values keyed by a content
//! fingerprint that is stable under re-extraction of identical text.

use std::sync::LazyLock;

use bon::Builder;
use derive_more::Display;
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::hash::sha256_hex;
use crate::plan::{MANAGED_BEGIN, MANAGED_END, MANAGED_HEADING};

pub use classifier::{Classifier, ClassifierError, ClassifierPayload, CommandClassifier};

pub mod classifier;

/// Normative modality of a principle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strength {
    #[display("MUST")]
    Must,
    #[display("MUST_NOT")]
    MustNot,
    #[display("SHOULD")]
    Should,
    #[display("MAY")]
    May,
}

impl Strength {
    /// The opposing modality, defined for MUST/MUST_NOT only.
    pub fn inverse(self) -> Option<Strength> {
        match self {
            Strength::Must => Some(Strength::MustNot),
            Strength::MustNot => Some(Strength::Must),
            Strength::Should | Strength::May => None,
        }
    }

    /// Parse a modal keyword as it appears in text or a classifier payload
    /// (`"must not"`, `"MUST_NOT"`, ...).
    pub fn from_keyword(raw: &str) -> Option<Strength> {
        match raw.trim().to_uppercase().replace(' ', "_").as_str() {
            "MUST" => Some(Strength::Must),
            "MUST_NOT" => Some(Strength::MustNot),
            "SHOULD" => Some(Strength::Should),
            "MAY" => Some(Strength::May),
            _ => None,
        }
    }
}

/// A 1-indexed, inclusive line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
}

/// Where a principle was found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub doc: String,
    pub span: Span,
    pub raw_text_hash: String,
}

/// One atomic normative statement.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
pub struct Principle {
    /// Opaque random identifier, stable within one state snapshot.
    pub id: String,

    pub title: String,

    pub strength: Strength,

    /// Literal requirement text, with the modal keyword removed.
    pub statement: String,

    /// Glob patterns this principle applies to, inherited from its source
    /// document unless config overrides.
    pub scope: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub examples: Vec<String>,

    /// Every occurrence of this principle; a principle can appear in more
    /// than one document.
    #[serde(default)]
    #[builder(default)]
    pub sources: Vec<SourceRef>,

    /// Hash of strength + normalized statement, used for duplicate and
    /// contradiction keying.
    pub fingerprint: String,
}

/// Links a principle to the document and span where it was found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub principle_id: String,
    pub doc: String,
    pub span: Span,
}

/// Principles and occurrences extracted from one document.
#[derive(Debug, Clone, Default)]
pub struct ExtractOutcome {
    pub principles: Vec<Principle>,
    pub occurrences: Vec<Occurrence>,
}

/// Normalize a statement for duplicate/contradiction keying: lowercase,
/// strip everything that is neither alphanumeric nor whitespace, collapse
/// whitespace, trim. Case and punctuation variants collapse to one key.
pub fn normalize_statement(statement: &str) -> String {
    statement
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

/// Content fingerprint of a principle: hash of strength + normalized
/// statement.
pub fn fingerprint(strength: Strength, statement: &str) -> String {
    sha256_hex(format!("{strength} {}", normalize_statement(statement)).as_bytes())
}

/// Mint a fresh principle id.
pub fn new_principle_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Extract principles from a document.
///
/// The classifier, when present, is tried first; any failure or empty result
/// falls through to the heuristic with a logged warning — extraction itself
/// never fails. Text inside the managed section is never re-ingested.
#[tracing::instrument(skip(content, default_scope, classifier))]
pub fn extract_principles(
    doc_path: &str,
    content: &str,
    default_scope: &[String],
    classifier: Option<&dyn Classifier>,
) -> ExtractOutcome {
    let scannable = blank_managed_section(content);

    let principles = match classifier {
        Some(classifier) => {
            match classifier_extract(classifier, doc_path, &scannable, default_scope) {
                Ok(principles) => principles,
                Err(error) => {
                    tracing::warn!(
                        %error,
                        doc = %doc_path,
                        "classifier extraction failed, falling back to heuristic"
                    );
                    heuristic_extract(doc_path, &scannable, default_scope)
                }
            }
        }
        None => heuristic_extract(doc_path, &scannable, default_scope),
    };

    let occurrences = principles
        .iter()
        .flat_map(|principle| {
            principle.sources.iter().map(|source| Occurrence {
                principle_id: principle.id.clone(),
                doc: source.doc.clone(),
                span: source.span,
            })
        })
        .collect();

    ExtractOutcome {
        principles,
        occurrences,
    }
}

static MODAL_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(MUST NOT|MUST|SHOULD|MAY)\b").expect("compile modal keyword regex")
});

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+").expect("compile list marker regex")
});

/// Deterministic keyword-based extraction: one principle per line carrying a
/// modal keyword. Intentionally crude, but fully reproducible and testable.
pub fn heuristic_extract(
    doc_path: &str,
    content: &str,
    default_scope: &[String],
) -> Vec<Principle> {
    let mut principles = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let cleaned = clean_line(line);
        let Some(found) = MODAL_KEYWORD.find(&cleaned) else {
            continue;
        };
        let Some(strength) = Strength::from_keyword(found.as_str()) else {
            continue;
        };

        let statement = cleaned[found.end()..].trim().to_string();
        if normalize_statement(&statement).is_empty() {
            continue;
        }

        let line_number = index + 1;
        principles.push(
            Principle::builder()
                .id(new_principle_id())
                .title(derive_title(&statement))
                .strength(strength)
                .statement(statement.clone())
                .scope(default_scope.to_vec())
                .sources(vec![SourceRef {
                    doc: doc_path.to_string(),
                    span: Span {
                        start_line: line_number,
                        end_line: line_number,
                    },
                    raw_text_hash: sha256_hex(line.as_bytes()),
                }])
                .fingerprint(fingerprint(strength, &statement))
                .build(),
        );
    }

    principles
}

/// Convert a classifier payload into principles.
///
/// Unknown strengths and empty statements are skipped; an entirely empty
/// result is an error so the caller falls back to the heuristic.
fn classifier_extract(
    classifier: &dyn Classifier,
    doc_path: &str,
    content: &str,
    default_scope: &[String],
) -> Result<Vec<Principle>, ClassifierError> {
    let payload = classifier.classify(content)?;

    let mut principles = Vec::new();
    for entry in payload.principles {
        let Some(strength) = Strength::from_keyword(&entry.strength) else {
            tracing::warn!(
                strength = %entry.strength,
                doc = %doc_path,
                "classifier returned unknown strength, skipping entry"
            );
            continue;
        };

        let statement = entry.statement.trim().to_string();
        if normalize_statement(&statement).is_empty() {
            continue;
        }

        let start_line = entry
            .start_line
            .filter(|line| *line > 0)
            .unwrap_or_else(|| locate_line(content, &statement));
        let end_line = entry.end_line.unwrap_or(start_line).max(start_line);
        let raw_line = content
            .lines()
            .nth(start_line - 1)
            .unwrap_or(statement.as_str());

        let title = entry
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| derive_title(&statement));

        principles.push(
            Principle::builder()
                .id(new_principle_id())
                .title(title)
                .strength(strength)
                .statement(statement.clone())
                .scope(default_scope.to_vec())
                .tags(entry.tags)
                .maybe_rationale(entry.rationale)
                .examples(entry.examples)
                .sources(vec![SourceRef {
                    doc: doc_path.to_string(),
                    span: Span {
                        start_line,
                        end_line,
                    },
                    raw_text_hash: sha256_hex(raw_line.as_bytes()),
                }])
                .fingerprint(fingerprint(strength, &statement))
                .build(),
        );
    }

    if principles.is_empty() {
        Err(ClassifierError::EmptyResult)
    } else {
        Ok(principles)
    }
}

/// Strip leading list markers, backticks, and bold markers from a line.
fn clean_line(line: &str) -> String {
    LIST_MARKER
        .replace(line, "")
        .replace('`', "")
        .replace("**", "")
        .trim()
        .to_string()
}

/// First 6 words of the statement, or "Principle" for degenerate input.
fn derive_title(statement: &str) -> String {
    let title = statement.split_whitespace().take(6).join(" ");
    if title.is_empty() {
        "Principle".to_string()
    } else {
        title
    }
}

/// 1-indexed line of the first line containing the statement text, falling
/// back to line 1.
fn locate_line(content: &str, statement: &str) -> usize {
    content
        .lines()
        .position(|line| line.contains(statement))
        .map(|index| index + 1)
        .unwrap_or(1)
}

/// Blank out the managed section so extraction never re-ingests the tool's
/// own output. Lines are replaced, not removed, so line numbers for the rest
/// of the document are preserved.
fn blank_managed_section(content: &str) -> String {
    let mut out = Vec::new();
    let mut in_managed = false;

    for line in content.lines() {
        let enters = line.trim() == MANAGED_HEADING || line.contains(MANAGED_BEGIN);
        let leaves = line.contains(MANAGED_END);

        if enters {
            in_managed = true;
        }
        out.push(if in_managed { "" } else { line });
        if leaves {
            in_managed = false;
        }
    }

    out.join("\n")
}
