//! Blocking and non-blocking conflict behavior through the CLI.

use pretty_assertions::assert_eq as pretty_assert_eq;

use crate::{exit_code, fixture_repo, read_artifact, run_instrctl};

#[test]
fn test_contradiction_blocks_with_exit_2_but_writes_artifacts() {
    let repo = fixture_repo(&[(
        "CLAUDE.md",
        "- You MUST pin dependency versions.\n- You MUST NOT pin dependency versions.\n",
    )]);

    let init = run_instrctl(repo.path(), "init");
    assert_eq!(exit_code(&init), 2, "init: {init:?}");

    // The artifacts are still written: the user needs the report.
    let conflicts = read_artifact(repo.path(), "conflicts.json");
    let entries = conflicts["conflicts"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    pretty_assert_eq!(entries[0]["type"], "CONTRADICTION");
    pretty_assert_eq!(entries[0]["severity"], "HIGH");
    pretty_assert_eq!(entries[0]["blocking"], true);

    let report = std::fs::read_to_string(repo.path().join(".instrctl/conflicts.md")).unwrap();
    assert!(report.contains("CONTRADICTION"));

    // Plan also signals the blocking conflict, and still persists the plan.
    let plan = run_instrctl(repo.path(), "plan");
    assert_eq!(exit_code(&plan), 2, "plan: {plan:?}");
    let plan_json = read_artifact(repo.path(), "plan.json");
    pretty_assert_eq!(plan_json["conflicts"][0]["blocking"], true);
}

#[test]
fn test_duplicates_do_not_block() {
    let repo = fixture_repo(&[
        ("CLAUDE.md", "- You MUST write tests.\n"),
        ("agents.md", "- You MUST write tests.\n"),
    ]);

    let init = run_instrctl(repo.path(), "init");
    assert_eq!(exit_code(&init), 0, "init: {init:?}");

    let conflicts = read_artifact(repo.path(), "conflicts.json");
    let entries = conflicts["conflicts"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    pretty_assert_eq!(entries[0]["type"], "DUPLICATE");
    pretty_assert_eq!(entries[0]["severity"], "LOW");
    pretty_assert_eq!(entries[0]["blocking"], false);
    assert_eq!(entries[0]["principle_ids"].as_array().unwrap().len(), 2);

    let plan = run_instrctl(repo.path(), "plan");
    assert_eq!(exit_code(&plan), 0, "plan: {plan:?}");
}

#[test]
fn test_no_conflicts_report_placeholder() {
    let repo = fixture_repo(&[("CLAUDE.md", "- Code MUST be tested.\n")]);

    assert_eq!(exit_code(&run_instrctl(repo.path(), "init")), 0);
    let report = std::fs::read_to_string(repo.path().join(".instrctl/conflicts.md")).unwrap();
    pretty_assert_eq!(report, "No conflicts detected.\n");
}
