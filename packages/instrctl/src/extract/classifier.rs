//! Pluggable text classifier used to enhance principle extraction.
//!
//! The classifier is a best-effort collaborator: extraction consumes its
//! result as a `Result` and explicitly takes the deterministic heuristic
//! branch on any error variant. Nothing in here may block extraction.

use std::io::Write as _;
use std::process::{Command, Stdio};

use derive_more::{Display, Error};
use indoc::indoc;
use serde::Deserialize;

/// Upper bound on the document text sent to the classifier.
pub const MAX_CLASSIFIER_INPUT: usize = 48 * 1024;

/// Instructions sent ahead of the document text.
const PROMPT_HEADER: &str = indoc! {r#"
    Extract every atomic normative statement from the document below.
    Respond with strict JSON only, no prose, shaped as:
    {"principles": [{"strength": "MUST|MUST NOT|SHOULD|MAY", "statement": "...",
    "title": "...", "tags": [], "rationale": "...", "examples": [],
    "start_line": 1, "end_line": 1}]}
    Only "strength" and "statement" are required per entry.

    Document:
"#};

/// Ways the classifier collaborator can fail.
///
/// Every variant is recoverable by design: the caller falls through to the
/// heuristic extractor.
#[derive(Debug, Display, Error)]
pub enum ClassifierError {
    #[display("classifier command is empty or unparsable: {raw}")]
    BadCommand { raw: String },

    #[display("classifier failed to run: {source}")]
    Spawn { source: std::io::Error },

    #[display("classifier I/O failed: {source}")]
    Io { source: std::io::Error },

    #[display("classifier exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[display("classifier returned malformed JSON: {source}")]
    Malformed { source: serde_json::Error },

    #[display("classifier returned no principles")]
    EmptyResult,
}

/// The strict-JSON payload the classifier must return.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierPayload {
    #[serde(default)]
    pub principles: Vec<PayloadPrinciple>,
}

/// One principle entry in the classifier payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadPrinciple {
    pub strength: String,
    pub statement: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub start_line: Option<usize>,
    #[serde(default)]
    pub end_line: Option<usize>,
}

/// A text-classification collaborator.
pub trait Classifier {
    /// Classify the document text into candidate principles.
    fn classify(&self, text: &str) -> Result<ClassifierPayload, ClassifierError>;
}

/// A classifier that shells out to a configured command (e.g. the `claude`
/// CLI), writing the prompt on stdin and parsing strict JSON from stdout.
///
/// The command string is split shell-style; credentials and timeouts are the
/// command's own concern.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    command: String,
}

impl CommandClassifier {
    pub fn new(command: impl Into<String>) -> Self {
        CommandClassifier {
            command: command.into(),
        }
    }
}

impl Classifier for CommandClassifier {
    #[tracing::instrument(skip(text))]
    fn classify(&self, text: &str) -> Result<ClassifierPayload, ClassifierError> {
        let words = shell_words::split(&self.command).map_err(|_| ClassifierError::BadCommand {
            raw: self.command.clone(),
        })?;
        let Some((program, args)) = words.split_first() else {
            return Err(ClassifierError::BadCommand {
                raw: self.command.clone(),
            });
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ClassifierError::Spawn { source })?;

        {
            let Some(stdin) = child.stdin.as_mut() else {
                return Err(ClassifierError::EmptyResult);
            };
            stdin
                .write_all(PROMPT_HEADER.as_bytes())
                .and_then(|()| stdin.write_all(truncate_input(text).as_bytes()))
                .map_err(|source| ClassifierError::Io { source })?;
        }

        let output = child
            .wait_with_output()
            .map_err(|source| ClassifierError::Io { source })?;
        if !output.status.success() {
            return Err(ClassifierError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|source| ClassifierError::Malformed { source })
    }
}

/// Truncate the document text to [`MAX_CLASSIFIER_INPUT`] bytes on a char
/// boundary.
fn truncate_input(text: &str) -> &str {
    if text.len() <= MAX_CLASSIFIER_INPUT {
        return text;
    }
    let mut end = MAX_CLASSIFIER_INPUT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
