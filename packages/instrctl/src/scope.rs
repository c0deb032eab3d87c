//! Document scope inference and scope intersection.
//!
//! A document's scope is the set of glob patterns its principles apply to:
//! either declared in frontmatter or inferred from the directory it lives in.

use std::path::Path;

/// Infer the applicability scope of a document.
///
/// A `scope:` key inside a `---`-fenced frontmatter block wins when it
/// carries a non-empty list. Otherwise a root-level document scopes to
/// `repo/**` and a nested one to `<dir>/**`.
pub fn infer_doc_scope(repo_root: &Path, doc_path: &Path, text: &str) -> Vec<String> {
    if let Some(scope) = frontmatter_scope(text) {
        return scope;
    }

    let relative = doc_path.strip_prefix(repo_root).unwrap_or(doc_path);
    let dir = relative
        .parent()
        .map(|parent| parent.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();

    if dir.is_empty() {
        vec!["repo/**".to_string()]
    } else {
        vec![format!("{dir}/**")]
    }
}

/// Test whether two scope sets overlap.
///
/// `repo/**` on either side intersects everything. Otherwise patterns
/// intersect when, after stripping a trailing `/**`, one prefix equals or
/// starts with the other (directory containment, not full glob semantics —
/// deliberately approximate).
pub fn scope_intersects(a: &[String], b: &[String]) -> bool {
    if a.iter().chain(b.iter()).any(|pattern| pattern == "repo/**") {
        return true;
    }
    a.iter()
        .any(|pa| b.iter().any(|pb| prefixes_overlap(pa, pb)))
}

fn prefixes_overlap(a: &str, b: &str) -> bool {
    let a = a.strip_suffix("/**").unwrap_or(a);
    let b = b.strip_suffix("/**").unwrap_or(b);
    a == b || a.starts_with(b) || b.starts_with(a)
}

/// Extract a `scope:` list from a `---`-fenced frontmatter block.
///
/// The value grammar is a literal bracketed, comma-separated, quote-stripped
/// list — not YAML.
fn frontmatter_scope(text: &str) -> Option<Vec<String>> {
    let mut lines = text.lines();
    if lines.next()?.trim() != "---" {
        return None;
    }

    for line in lines {
        let trimmed = line.trim();
        if trimmed == "---" {
            break;
        }
        if let Some(value) = trimmed.strip_prefix("scope:") {
            let entries = parse_bracketed_list(value);
            if !entries.is_empty() {
                return Some(entries);
            }
        }
    }

    None
}

/// Parse a bracketed, comma-separated, quote-stripped list literal such as
/// `['frontend/**', "docs/**"]`. Also shared by the config reader.
pub(crate) fn parse_bracketed_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('[').unwrap_or(raw);
    let raw = raw.strip_suffix(']').unwrap_or(raw);

    raw.split(',')
        .map(|entry| entry.trim().trim_matches(['\'', '"']).to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}
