//! End-to-end init → plan → apply round trips.

use std::fs;

use pretty_assertions::assert_eq as pretty_assert_eq;

use crate::{commit_all, exit_code, fixture_repo, read_artifact, run_instrctl, write_files};

const CLAUDE_MD: &str = "\
# Project guidance

- Code MUST be tested.
- Code MUST NOT panic in production.
";

const AGENTS_MD: &str = "\
- Components SHOULD be documented.
- Teams MAY use storybook.
";

#[test]
fn test_init_then_plan_produces_patches() {
    let repo = fixture_repo(&[("CLAUDE.md", CLAUDE_MD), ("frontend/agents.md", AGENTS_MD)]);

    let init = run_instrctl(repo.path(), "init");
    assert_eq!(exit_code(&init), 0, "init: {init:?}");

    let plan = run_instrctl(repo.path(), "plan");
    assert_eq!(exit_code(&plan), 0, "plan: {plan:?}");

    let conflicts = read_artifact(repo.path(), "conflicts.json");
    assert_eq!(conflicts["conflicts"].as_array().unwrap().len(), 0);

    let plan_json = read_artifact(repo.path(), "plan.json");
    let patches = plan_json["file_patches"].as_array().unwrap();
    assert!(patches.len() >= 2, "expected patches for both documents");
    for patch in patches {
        let unified = patch["patch_unified"].as_str().unwrap();
        assert!(!unified.is_empty());
        assert!(unified.contains("## Managed Principles"));
    }
}

#[test]
fn test_plan_after_apply_is_empty() {
    let repo = fixture_repo(&[("CLAUDE.md", CLAUDE_MD), ("frontend/agents.md", AGENTS_MD)]);

    assert_eq!(exit_code(&run_instrctl(repo.path(), "init")), 0);
    assert_eq!(exit_code(&run_instrctl(repo.path(), "plan")), 0);

    let apply = run_instrctl(repo.path(), "apply");
    assert_eq!(exit_code(&apply), 0, "apply: {apply:?}");

    // Patches landed on disk.
    let claude = fs::read_to_string(repo.path().join("CLAUDE.md")).unwrap();
    assert!(claude.contains("## Managed Principles"));
    assert!(claude.contains("- **MUST** be tested."));
    assert!(claude.starts_with("# Project guidance"));

    // Re-planning an already-patched document set yields no patches.
    assert_eq!(exit_code(&run_instrctl(repo.path(), "plan")), 0);
    let plan_json = read_artifact(repo.path(), "plan.json");
    pretty_assert_eq!(plan_json["file_patches"].as_array().unwrap().len(), 0);
}

#[test]
fn test_apply_rejects_stale_plan() {
    let repo = fixture_repo(&[("CLAUDE.md", CLAUDE_MD)]);

    assert_eq!(exit_code(&run_instrctl(repo.path(), "init")), 0);
    assert_eq!(exit_code(&run_instrctl(repo.path(), "plan")), 0);

    // Move HEAD after the plan was pinned.
    write_files(repo.path(), &[("README.md", "changed\n")]);
    commit_all(repo.path(), "unrelated change");

    let apply = run_instrctl(repo.path(), "apply");
    assert_eq!(exit_code(&apply), 1, "apply: {apply:?}");
    let stderr = String::from_utf8_lossy(&apply.stderr);
    assert!(stderr.contains("re-run `instrctl plan`"), "stderr: {stderr}");

    // The stale plan must not have touched the working tree.
    let claude = fs::read_to_string(repo.path().join("CLAUDE.md")).unwrap();
    assert!(!claude.contains("## Managed Principles"));
}

#[test]
fn test_plan_without_init_is_a_usage_error() {
    let repo = fixture_repo(&[("CLAUDE.md", CLAUDE_MD)]);

    let plan = run_instrctl(repo.path(), "plan");
    assert_eq!(exit_code(&plan), 1, "plan: {plan:?}");
    let stderr = String::from_utf8_lossy(&plan.stderr);
    assert!(stderr.contains("instrctl init"), "stderr: {stderr}");
}

#[test]
fn test_apply_without_plan_is_a_usage_error() {
    let repo = fixture_repo(&[("CLAUDE.md", CLAUDE_MD)]);
    assert_eq!(exit_code(&run_instrctl(repo.path(), "init")), 0);

    let apply = run_instrctl(repo.path(), "apply");
    assert_eq!(exit_code(&apply), 1, "apply: {apply:?}");
    let stderr = String::from_utf8_lossy(&apply.stderr);
    assert!(stderr.contains("instrctl plan"), "stderr: {stderr}");
}

#[test]
fn test_config_override_replaces_extracted_set() {
    let config = r#"
principle "canonical-tests" {
  title     = "Tests are canonical"
  strength  = "MUST"
  statement = "ship every change with tests"
}
"#;
    let repo = fixture_repo(&[("CLAUDE.md", CLAUDE_MD), ("instrctl.hcl", config)]);

    assert_eq!(exit_code(&run_instrctl(repo.path(), "init")), 0);
    assert_eq!(exit_code(&run_instrctl(repo.path(), "plan")), 0);

    let plan_json = read_artifact(repo.path(), "plan.json");
    let patches = plan_json["file_patches"].as_array().unwrap();
    assert_eq!(patches.len(), 1);
    assert!(
        patches[0]["patch_unified"]
            .as_str()
            .unwrap()
            .contains("ship every change with tests")
    );

    // One config addition, two extracted removals.
    let changes = plan_json["principle_changes"].as_array().unwrap();
    let adds = changes
        .iter()
        .filter(|c| c["action"] == "add")
        .collect::<Vec<_>>();
    let removes = changes
        .iter()
        .filter(|c| c["action"] == "remove")
        .collect::<Vec<_>>();
    assert_eq!(adds.len(), 1);
    pretty_assert_eq!(adds[0]["id"], "canonical-tests");
    assert_eq!(removes.len(), 2);
}
