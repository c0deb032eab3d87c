//! State building and persisted-artifact IO.
//!
//! Each command loads, transforms, and re-persists plain JSON artifacts in
//! the repo-local state directory; no long-lived in-process state exists.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result, bail};
use monostate::MustBe;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::conflict::{ConflictsFile, build_conflicts, render_conflicts_md};
use crate::discovery::{DiscoveryOptions, DocumentDescriptor, discover_documents};
use crate::extract::{Classifier, Occurrence, Principle, extract_principles};
use crate::git;
use crate::plan::PlanFile;

pub const STATE_DIR: &str = ".instrctl";
pub const STATE_FILE: &str = "state.json";
pub const CONFLICTS_FILE: &str = "conflicts.json";
pub const CONFLICTS_REPORT: &str = "conflicts.md";
pub const PLAN_FILE: &str = "plan.json";

/// Repository identity a snapshot was built against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    pub root: String,

    /// The pinning anchor for plan validity.
    pub head_commit: String,
}

/// The system's persisted snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: MustBe!(1u64),
    pub repo: RepoInfo,
    pub documents: Vec<DocumentDescriptor>,
    pub principles: Vec<Principle>,
    pub occurrences: Vec<Occurrence>,
}

/// The repo-local directory holding all persisted artifacts.
pub fn state_dir(repo_root: &Path) -> PathBuf {
    repo_root.join(STATE_DIR)
}

/// Run discovery + extraction + conflict detection and persist the results.
///
/// Writes `state.json`, `conflicts.json`, and the human-readable
/// `conflicts.md`, all atomically. When a previous state exists, principle
/// ids are carried forward by fingerprint so managed-section markers stay
/// stable across rebuilds.
#[tracing::instrument(skip(classifier))]
pub fn write_state_files(
    repo_root: &Path,
    classifier: Option<&dyn Classifier>,
) -> Result<(StateFile, ConflictsFile)> {
    let head_commit = git::head_commit(repo_root).context("resolve HEAD commit")?;
    let documents = discover_documents(repo_root, &DiscoveryOptions::default())?;
    let previous = read_state(repo_root).ok();

    let mut principles = Vec::new();
    let mut occurrences = Vec::new();
    for doc in &documents {
        let content = fs::read_to_string(repo_root.join(&doc.path))
            .with_context(|| format!("read instruction document: {}", doc.path))?;
        let outcome = extract_principles(&doc.path, &content, &doc.doc_scope, classifier);
        principles.extend(outcome.principles);
        occurrences.extend(outcome.occurrences);
    }

    if let Some(previous) = &previous {
        carry_forward_ids(&mut principles, &mut occurrences, &previous.principles);
    }

    let conflicts = build_conflicts(&head_commit, &principles);
    let state = StateFile {
        version: MustBe!(1u64),
        repo: RepoInfo {
            root: repo_root.to_string_lossy().into_owned(),
            head_commit,
        },
        documents,
        principles,
        occurrences,
    };

    let dir = state_dir(repo_root);
    fs::create_dir_all(&dir)
        .with_context(|| format!("create state directory: {}", dir.display()))?;
    write_json_atomic(&dir.join(STATE_FILE), &state)?;
    write_json_atomic(&dir.join(CONFLICTS_FILE), &conflicts)?;
    write_atomic(&dir.join(CONFLICTS_REPORT), &render_conflicts_md(&conflicts))?;

    Ok((state, conflicts))
}

/// Reuse the previous snapshot's id for any principle whose fingerprint
/// matches exactly one previous principle (and is itself unambiguous in the
/// new set). Extraction mints fresh random ids on every run; without the
/// remap, every rebuild would churn the managed-section markers.
pub(crate) fn carry_forward_ids(
    principles: &mut [Principle],
    occurrences: &mut [Occurrence],
    previous: &[Principle],
) {
    let mut previous_by_fingerprint: HashMap<&str, Vec<&Principle>> = HashMap::new();
    for principle in previous {
        previous_by_fingerprint
            .entry(principle.fingerprint.as_str())
            .or_default()
            .push(principle);
    }

    let mut new_counts: HashMap<String, usize> = HashMap::new();
    for principle in principles.iter() {
        *new_counts.entry(principle.fingerprint.clone()).or_default() += 1;
    }

    let mut renames: HashMap<String, String> = HashMap::new();
    for principle in principles.iter_mut() {
        if new_counts.get(&principle.fingerprint) != Some(&1) {
            continue;
        }
        let Some(matches) = previous_by_fingerprint.get(principle.fingerprint.as_str()) else {
            continue;
        };
        if let [prior] = matches.as_slice() {
            tracing::debug!(
                from = %principle.id,
                to = %prior.id,
                fingerprint = %principle.fingerprint,
                "carrying forward principle id"
            );
            renames.insert(principle.id.clone(), prior.id.clone());
            principle.id = prior.id.clone();
        }
    }

    for occurrence in occurrences.iter_mut() {
        if let Some(id) = renames.get(&occurrence.principle_id) {
            occurrence.principle_id = id.clone();
        }
    }
}

/// Read the persisted state, failing with a usage error when `init` has not
/// been run.
pub fn read_state(repo_root: &Path) -> Result<StateFile> {
    let path = state_dir(repo_root).join(STATE_FILE);
    match read_json(&path)? {
        Some(state) => Ok(state),
        None => bail!(
            "no state found at {}; run `instrctl init` first",
            path.display()
        ),
    }
}

/// Read the persisted conflict report; an absent file means no conflicts.
pub fn read_conflicts(repo_root: &Path) -> Result<ConflictsFile> {
    let path = state_dir(repo_root).join(CONFLICTS_FILE);
    Ok(read_json(&path)?.unwrap_or_else(|| ConflictsFile::empty("")))
}

/// Read the persisted plan, failing with a usage error when `plan` has not
/// been run.
pub fn read_plan(repo_root: &Path) -> Result<PlanFile> {
    let path = state_dir(repo_root).join(PLAN_FILE);
    match read_json(&path)? {
        Some(plan) => Ok(plan),
        None => bail!(
            "no plan found at {}; run `instrctl plan` first",
            path.display()
        ),
    }
}

/// Persist a plan to the state directory.
pub fn write_plan(repo_root: &Path, plan: &PlanFile) -> Result<()> {
    let dir = state_dir(repo_root);
    fs::create_dir_all(&dir)
        .with_context(|| format!("create state directory: {}", dir.display()))?;
    write_json_atomic(&dir.join(PLAN_FILE), plan)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("read artifact: {}", path.display())),
    };
    serde_json::from_str(&content)
        .map(Some)
        .with_context(|| format!("parse artifact: {}", path.display()))
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize artifact: {}", path.display()))?;
    write_atomic(path, &json)
}

/// Write via a temp file + rename so readers never observe a torn artifact.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.tmp"));

    fs::write(&tmp, content).with_context(|| format!("write artifact: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("move artifact into place: {}", path.display()))?;
    Ok(())
}
