//! Discovery behavior through the CLI: default globs, exclusions, scopes.

use pretty_assertions::assert_eq as pretty_assert_eq;

use crate::{exit_code, fixture_repo, read_artifact, run_instrctl};

#[test]
fn test_default_includes_and_excludes() {
    let repo = fixture_repo(&[
        ("agents.md", "- Agents MUST be polite.\n"),
        (".cursor/rules.md", "- Cursors SHOULD blink.\n"),
        ("node_modules/ignored.md", "- This MUST be skipped.\n"),
        ("node_modules/agents.md", "- This MUST be skipped too.\n"),
    ]);

    assert_eq!(exit_code(&run_instrctl(repo.path(), "init")), 0);

    let state = read_artifact(repo.path(), "state.json");
    let paths = state["documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["path"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    pretty_assert_eq!(
        paths,
        vec![".cursor/rules.md".to_string(), "agents.md".to_string()]
    );
}

#[test]
fn test_dialects_and_scopes_recorded() {
    let repo = fixture_repo(&[
        ("CLAUDE.md", "- Code MUST be tested.\n"),
        ("frontend/agents.md", "- Components SHOULD be documented.\n"),
        (
            "docs/skills.md",
            "---\nscope: ['docs/**', 'guides/**']\n---\n- Docs MAY use mermaid.\n",
        ),
    ]);

    assert_eq!(exit_code(&run_instrctl(repo.path(), "init")), 0);

    let state = read_artifact(repo.path(), "state.json");
    let documents = state["documents"].as_array().unwrap();

    let by_path = |path: &str| {
        documents
            .iter()
            .find(|doc| doc["path"] == path)
            .unwrap_or_else(|| panic!("missing document: {path}"))
    };

    pretty_assert_eq!(by_path("CLAUDE.md")["dialect"], "claude");
    pretty_assert_eq!(by_path("CLAUDE.md")["doc_scope"][0], "repo/**");

    pretty_assert_eq!(by_path("frontend/agents.md")["dialect"], "agents");
    pretty_assert_eq!(by_path("frontend/agents.md")["doc_scope"][0], "frontend/**");

    pretty_assert_eq!(by_path("docs/skills.md")["dialect"], "skills");
    pretty_assert_eq!(by_path("docs/skills.md")["doc_scope"][0], "docs/**");
    pretty_assert_eq!(by_path("docs/skills.md")["doc_scope"][1], "guides/**");
}

#[test]
fn test_occurrences_link_principles_to_spans() {
    let repo = fixture_repo(&[("CLAUDE.md", "intro line\n- Code MUST be tested.\n")]);

    assert_eq!(exit_code(&run_instrctl(repo.path(), "init")), 0);

    let state = read_artifact(repo.path(), "state.json");
    let principles = state["principles"].as_array().unwrap();
    assert_eq!(principles.len(), 1);

    let occurrences = state["occurrences"].as_array().unwrap();
    assert_eq!(occurrences.len(), 1);
    pretty_assert_eq!(occurrences[0]["principle_id"], principles[0]["id"]);
    pretty_assert_eq!(occurrences[0]["doc"], "CLAUDE.md");
    pretty_assert_eq!(occurrences[0]["span"]["start_line"], 2);
}
