//! Best-effort reader for the optional declarative override config.
//!
//! `instrctl.hcl` at the repository root can pin a canonical principle set
//! that replaces whatever extraction found, and name the classifier command.
//! The reader is a narrow key=value block extractor over a defined grammar
//! subset (quoted strings and bracketed quoted-string arrays) — it is
//! deliberately not a real HCL parser, and accepts no more than that subset.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::LazyLock;

use color_eyre::eyre::{Context, Result, bail, eyre};
use regex::Regex;
use tap::Tap;

use crate::extract::{Principle, Strength, fingerprint};
use crate::scope::parse_bracketed_list;

pub const CONFIG_FILE: &str = "instrctl.hcl";

/// Parsed configuration. Empty when no config file exists.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Command to run as the external extraction classifier, when set.
    pub classifier_command: Option<String>,

    /// Human-curated canonical principles; when non-empty, the plan builder
    /// uses these instead of the extracted state.
    pub principles: Vec<Principle>,
}

/// Load the config file from the repository root, if present.
#[tracing::instrument]
pub fn load_config(repo_root: &Path) -> Result<Config> {
    let path = repo_root.join(CONFIG_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => return Err(e).with_context(|| format!("read config file: {}", path.display())),
    };

    parse_config(&content)
        .with_context(|| format!("parse config file: {}", path.display()))
        .tap(|config| tracing::debug!(?config, "parsed config file"))
}

static PRINCIPLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?ms)^principle\s+"([^"]+)"\s*\{(.*?)^\}"#).expect("compile block regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=\s*("(?:[^"\\]|\\.)*"|\[[^\]]*\])"#)
        .expect("compile attribute regex")
});

enum AttrValue {
    String(String),
    List(Vec<String>),
}

fn parse_config(content: &str) -> Result<Config> {
    let mut config = Config::default();

    let top_level = PRINCIPLE_BLOCK.replace_all(content, "");
    for caps in ATTRIBUTE.captures_iter(&top_level) {
        if &caps[1] == "classifier_command" {
            if let AttrValue::String(value) = parse_attr_value(&caps[2]) {
                config.classifier_command = Some(value);
            }
        }
    }

    for caps in PRINCIPLE_BLOCK.captures_iter(content) {
        let id = caps[1].to_string();
        let principle = parse_principle_block(&id, &caps[2])
            .with_context(|| format!("parse principle block: \"{id}\""))?;
        config.principles.push(principle);
    }

    Ok(config)
}

fn parse_principle_block(id: &str, body: &str) -> Result<Principle> {
    let mut attrs: HashMap<String, AttrValue> = HashMap::new();
    for caps in ATTRIBUTE.captures_iter(body) {
        attrs.insert(caps[1].to_string(), parse_attr_value(&caps[2]));
    }

    let Some(AttrValue::String(strength_raw)) = attrs.get("strength") else {
        bail!("missing required `strength` attribute");
    };
    let strength = Strength::from_keyword(strength_raw)
        .ok_or_else(|| eyre!("unknown strength: {strength_raw}"))?;

    let Some(AttrValue::String(statement)) = attrs.get("statement") else {
        bail!("missing required `statement` attribute");
    };
    let statement = statement.clone();

    let title = match attrs.get("title") {
        Some(AttrValue::String(title)) => title.clone(),
        _ => id.to_string(),
    };

    let scope = match attrs.get("scope") {
        Some(AttrValue::List(scope)) if !scope.is_empty() => scope.clone(),
        _ => vec!["repo/**".to_string()],
    };

    let tags = match attrs.get("tags") {
        Some(AttrValue::List(tags)) => tags.clone(),
        _ => Vec::new(),
    };

    let rationale = match attrs.get("rationale") {
        Some(AttrValue::String(rationale)) => Some(rationale.clone()),
        _ => None,
    };

    let examples = match attrs.get("examples") {
        Some(AttrValue::List(examples)) => examples.clone(),
        _ => Vec::new(),
    };

    Ok(Principle::builder()
        .id(id.to_string())
        .title(title)
        .strength(strength)
        .statement(statement.clone())
        .scope(scope)
        .tags(tags)
        .maybe_rationale(rationale)
        .examples(examples)
        .fingerprint(fingerprint(strength, &statement))
        .build())
}

fn parse_attr_value(raw: &str) -> AttrValue {
    let raw = raw.trim();
    if raw.starts_with('[') {
        AttrValue::List(parse_bracketed_list(raw))
    } else {
        AttrValue::String(unquote(raw))
    }
}

fn unquote(raw: &str) -> String {
    raw.trim()
        .trim_matches('"')
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
}
