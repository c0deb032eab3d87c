//! Glob-to-regex compilation and instruction-document dialect classification.

use color_eyre::eyre::{Context, Result};
use derive_more::Display;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The instruction-document convention a file follows, inferred from its
/// name and location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[display("generic")]
    Generic,
    #[display("claude")]
    Claude,
    #[display("agents")]
    Agents,
    #[display("cursor")]
    Cursor,
    #[display("bugbot")]
    Bugbot,
    #[display("skills")]
    Skills,
    #[display("custom")]
    Custom,
}

/// Compile a restricted glob grammar into an anchored regex.
///
/// Grammar: `**` matches any path segment sequence, `*` any run of
/// non-separator characters, `?` a single non-separator character; `/` is a
/// literal separator. A pattern starting with `**/` also matches paths with
/// no leading directory at all (`**/agents.md` matches both `agents.md` and
/// `a/b/agents.md`).
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut regex = String::with_capacity(pattern.len() * 2 + 8);
    regex.push('^');

    let mut rest = pattern;
    if let Some(stripped) = rest.strip_prefix("**/") {
        regex.push_str("(?:.*/)?");
        rest = stripped;
    }

    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    regex.push_str(".*");
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '?' => regex.push_str("[^/]"),
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }

    regex.push('$');
    Regex::new(&regex).with_context(|| format!("compile glob pattern: {pattern}"))
}

/// Test whether a path matches any of the given glob patterns.
///
/// Path separators are normalized to `/` before matching. Patterns that fail
/// to compile never match.
pub fn match_any(path: &str, patterns: &[String]) -> bool {
    let path = path.replace('\\', "/");
    patterns.iter().any(|pattern| match glob_to_regex(pattern) {
        Ok(regex) => regex.is_match(&path),
        Err(error) => {
            tracing::debug!(%error, %pattern, "skipping malformed glob pattern");
            false
        }
    })
}

/// Test a path against include/exclude pattern sets.
///
/// Exclude takes precedence. An empty include list means "everything not
/// excluded matches"; discovery defaults rely on this.
pub fn path_matches(path: &str, include: &[String], exclude: &[String]) -> bool {
    if match_any(path, exclude) {
        return false;
    }
    include.is_empty() || match_any(path, include)
}

/// Classify a document path into a [`Dialect`].
///
/// Pure lexical classification by basename and directory, case-insensitive;
/// unrecognized names classify as [`Dialect::Generic`].
pub fn doc_dialect(path: &str) -> Dialect {
    let normalized = path.replace('\\', "/").to_lowercase();
    let basename = normalized.rsplit('/').next().unwrap_or(&normalized);

    match basename {
        "claude.md" => Dialect::Claude,
        "agents.md" => Dialect::Agents,
        "skills.md" => Dialect::Skills,
        "bugbot.md" => Dialect::Bugbot,
        _ if basename.starts_with("cursor-rules") => Dialect::Cursor,
        _ if normalized.split('/').any(|component| component == ".cursor") => Dialect::Cursor,
        _ => Dialect::Generic,
    }
}
