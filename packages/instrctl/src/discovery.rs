//! Instruction-document discovery.
//!
//! Walks the repository tree, applies include/exclude globs, and produces a
//! content-addressed descriptor per matched document.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::hash::sha256_hex;
use crate::matcher::{Dialect, doc_dialect, match_any, path_matches};
use crate::scope::infer_doc_scope;

/// Filename globs for the instruction-document conventions we recognize.
pub const DEFAULT_INCLUDE: &[&str] = &[
    "**/agents.md",
    "**/bugbot.md",
    "**/skills.md",
    "**/CLAUDE.md",
    "**/claude.md",
    "**/.cursor/rules*",
    "**/cursor-rules*",
];

/// Directories never worth descending into.
pub const DEFAULT_EXCLUDE: &[&str] = &[
    ".git/**",
    "node_modules/**",
    "vendor/**",
    "dist/**",
    "build/**",
];

/// Include/exclude patterns for a discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        DiscoveryOptions {
            include: DEFAULT_INCLUDE.iter().map(|p| p.to_string()).collect(),
            exclude: DEFAULT_EXCLUDE.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// One instruction document found in the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Repo-relative path, `/`-separated.
    pub path: String,

    /// Convention the document follows, from its name and location.
    pub dialect: Dialect,

    /// Glob patterns the document's principles apply to.
    pub doc_scope: Vec<String>,

    /// SHA-256 of the raw content at discovery time.
    pub sha256: String,
}

/// Walk `repo_root` and produce a descriptor per matched document.
///
/// Directories matching an exclude pattern (tested with a trailing `/`) are
/// pruned without descending. Matched files that cannot be read are a hard
/// error: an unreadable instruction document is a permissions problem the
/// user must fix, not something to skip past. Results are sorted by path.
#[tracing::instrument(skip(options))]
pub fn discover_documents(
    repo_root: &Path,
    options: &DiscoveryOptions,
) -> Result<Vec<DocumentDescriptor>> {
    let mut documents = Vec::new();

    let walker = WalkDir::new(repo_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() || entry.depth() == 0 {
                return true;
            }
            let dir = format!("{}/", relative_path(repo_root, entry.path()));
            !match_any(&dir, &options.exclude)
        });

    for entry in walker {
        let entry = entry.context("walk repository tree")?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = relative_path(repo_root, entry.path());
        if !path_matches(&path, &options.include, &options.exclude) {
            continue;
        }

        let content = fs::read_to_string(entry.path())
            .with_context(|| format!("read instruction document: {path}"))?;
        tracing::debug!(%path, bytes = content.len(), "discovered instruction document");

        documents.push(DocumentDescriptor {
            dialect: doc_dialect(&path),
            doc_scope: infer_doc_scope(repo_root, entry.path(), &content),
            sha256: sha256_hex(content.as_bytes()),
            path,
        });
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(documents)
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq as pretty_assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn write(root: &Path, path: &str, content: &str) {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(full, content).expect("write fixture file");
    }

    #[test]
    fn test_discovers_default_documents_sorted() {
        let dir = TempDir::new().expect("create temp dir");
        write(dir.path(), "agents.md", "- MUST pass tests\n");
        write(dir.path(), ".cursor/rules.md", "- SHOULD be small\n");
        write(dir.path(), "node_modules/ignored.md", "- MUST be skipped\n");
        write(dir.path(), "node_modules/agents.md", "- MUST be skipped\n");

        let documents = discover_documents(dir.path(), &DiscoveryOptions::default())
            .expect("discover documents");
        let paths = documents.iter().map(|d| d.path.clone()).collect::<Vec<_>>();
        pretty_assert_eq!(paths, vec![".cursor/rules.md", "agents.md"]);
    }

    #[test]
    fn test_descriptor_fields() {
        let dir = TempDir::new().expect("create temp dir");
        write(dir.path(), "frontend/agents.md", "- Buttons MUST be blue\n");

        let documents = discover_documents(dir.path(), &DiscoveryOptions::default())
            .expect("discover documents");
        assert_eq!(documents.len(), 1);
        let doc = &documents[0];
        pretty_assert_eq!(doc.path, "frontend/agents.md");
        assert_eq!(doc.dialect, Dialect::Agents);
        pretty_assert_eq!(doc.doc_scope, vec!["frontend/**".to_string()]);
        pretty_assert_eq!(doc.sha256, sha256_hex(b"- Buttons MUST be blue\n"));
    }

    #[test]
    fn test_empty_include_matches_everything_not_excluded() {
        let dir = TempDir::new().expect("create temp dir");
        write(dir.path(), "README.md", "hello\n");
        write(dir.path(), "dist/out.md", "built\n");

        let options = DiscoveryOptions {
            include: vec![],
            exclude: vec!["dist/**".to_string()],
        };
        let documents = discover_documents(dir.path(), &options).expect("discover documents");
        let paths = documents.iter().map(|d| d.path.clone()).collect::<Vec<_>>();
        pretty_assert_eq!(paths, vec!["README.md"]);
    }

    #[test]
    fn test_excluded_directories_are_pruned() {
        let dir = TempDir::new().expect("create temp dir");
        write(dir.path(), "vendor/deep/agents.md", "- MUST be skipped\n");
        write(dir.path(), "docs/agents.md", "- MUST be found\n");

        let documents = discover_documents(dir.path(), &DiscoveryOptions::default())
            .expect("discover documents");
        let paths = documents.iter().map(|d| d.path.clone()).collect::<Vec<_>>();
        pretty_assert_eq!(paths, vec!["docs/agents.md"]);
    }
}
