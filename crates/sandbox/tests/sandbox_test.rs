use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use agentbox_core::Error;
use agentbox_sandbox::executor::{FAILURE_EXIT_CODE, SPAWN_FAILURE_EXIT_CODE};
use agentbox_sandbox::{audit, SandboxExecutor};

const VALID_SUBMISSION: &str = "export async function main(): Promise<number> { return 0; }\n";

fn have(binary: &str) -> bool {
    Command::new(binary)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Whether the local node can run TypeScript with type stripping.
fn node_runs_typescript(scratch: &Path) -> bool {
    if !have("node") {
        return false;
    }
    let probe = scratch.join("probe.ts");
    std::fs::write(&probe, "const probe: number = 0;\nprocess.exit(probe);\n").unwrap();
    Command::new("node")
        .arg("--experimental-strip-types")
        .arg(&probe)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.email=sandbox@test",
            "-c",
            "user.name=sandbox",
        ])
        .args(args)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

/// Repository with one committed file `test.txt` holding `content`.
fn git_fixture(dir: &Path, content: &str) {
    git(dir, &["init", "-q"]);
    std::fs::write(dir.join("test.txt"), content).unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "-m", "seed"]);
}

// =============================================================================
// Entry-point contract
// =============================================================================

#[tokio::test]
async fn missing_entry_point_is_rejected_before_any_side_effect() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox_dir = dir.path().join("sandbox");
    let executor = SandboxExecutor::new(&sandbox_dir, vec!["true".into()]);

    let err = executor
        .execute("console.log(\"no entry point\");", &HashMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ContractViolation(_)));
    // Nothing was written: the sandbox area does not even exist yet.
    assert!(!sandbox_dir.exists());
}

// =============================================================================
// Subprocess execution
// =============================================================================

#[tokio::test]
async fn reports_the_subprocess_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox_dir = dir.path().join("sandbox");

    // `false` ignores its arguments and exits 1; no JS runtime needed to
    // exercise the spawn/capture/report path.
    let executor = SandboxExecutor::new(&sandbox_dir, vec!["false".into()])
        .with_workdir(dir.path());

    let result = executor
        .execute(VALID_SUBMISSION, &HashMap::new())
        .await
        .unwrap();

    assert_eq!(result.exit_code, 1);
    assert!(!result.success());
    assert!(sandbox_dir.join("submission.ts").exists());
    assert!(sandbox_dir.join("run.ts").exists());
    assert_eq!(
        std::fs::read_to_string(sandbox_dir.join("submission.ts")).unwrap(),
        VALID_SUBMISSION,
        "submission must be written verbatim"
    );
}

#[tokio::test]
async fn missing_runtime_reports_fixed_spawn_failure_code() {
    let dir = tempfile::tempdir().unwrap();
    let executor = SandboxExecutor::new(
        dir.path().join("sandbox"),
        vec!["/nonexistent/agentbox-runtime".into()],
    )
    .with_workdir(dir.path());

    let result = executor
        .execute(VALID_SUBMISSION, &HashMap::new())
        .await
        .unwrap();

    assert_eq!(result.exit_code, SPAWN_FAILURE_EXIT_CODE);
    assert!(result.stderr.contains("failed to start runtime"));
}

#[tokio::test]
async fn working_directory_is_restored_on_every_path() {
    let before = std::env::current_dir().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let executor = SandboxExecutor::new(dir.path().join("sandbox"), vec!["false".into()])
        .with_workdir(dir.path());

    // Failure path: contract violation.
    let _ = executor.execute("not a submission", &HashMap::new()).await;
    assert_eq!(std::env::current_dir().unwrap(), before);

    // Abnormal-execution path: non-zero exit.
    let _ = executor.execute(VALID_SUBMISSION, &HashMap::new()).await;
    assert_eq!(std::env::current_dir().unwrap(), before);
}

// =============================================================================
// Change auditing
// =============================================================================

#[tokio::test]
async fn modifying_a_committed_file_reports_insertions() {
    if !have("git") {
        println!("Skipping: git not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    git_fixture(dir.path(), "");

    std::fs::write(dir.path().join("test.txt"), "line1\nline2\nline3").unwrap();

    let (changed, stat) = audit::collect_changes(dir.path()).await;
    assert!(changed.contains(&"test.txt".to_string()));
    assert!(stat.insertions > 0);
    assert_eq!(stat.files, 1);
}

#[tokio::test]
async fn emptying_a_committed_file_reports_deletions() {
    if !have("git") {
        println!("Skipping: git not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    git_fixture(dir.path(), "line1\nline2\nline3\n");

    std::fs::write(dir.path().join("test.txt"), "").unwrap();

    let (changed, stat) = audit::collect_changes(dir.path()).await;
    assert!(changed.contains(&"test.txt".to_string()));
    assert!(stat.deletions > 0);
}

#[tokio::test]
async fn execution_in_an_unversioned_tree_reports_zero_changes() {
    let dir = tempfile::tempdir().unwrap();
    let executor = SandboxExecutor::new(dir.path().join("sandbox"), vec!["true".into()])
        .with_workdir(dir.path());

    let result = executor
        .execute(VALID_SUBMISSION, &HashMap::new())
        .await
        .unwrap();

    assert!(result.changed_files.is_empty());
    assert_eq!(result.diff_stat.files, 0);
    assert_eq!(result.diff_stat.insertions, 0);
    assert_eq!(result.diff_stat.deletions, 0);
}

// =============================================================================
// End-to-end with a real runtime (skipped when node cannot strip types)
// =============================================================================

#[tokio::test]
async fn submission_runs_to_completion_under_node() {
    if !have("git") {
        println!("Skipping: git not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    if !node_runs_typescript(dir.path()) {
        println!("Skipping: node with type stripping not available");
        return;
    }

    git_fixture(dir.path(), "");

    let submission = r#"
import { writeFileSync } from "node:fs";

export async function main(): Promise<number> {
  writeFileSync("test.txt", "line1\nline2\nline3");
  console.log("wrote test.txt");
  return 0;
}
"#;

    let executor = SandboxExecutor::new(
        dir.path().join("sandbox"),
        vec!["node".into(), "--experimental-strip-types".into()],
    )
    .with_workdir(dir.path());

    let mut env = HashMap::new();
    env.insert("CAP_TOKEN".to_string(), "sekrit".to_string());

    let result = executor.execute(submission, &env).await.unwrap();

    assert_eq!(result.exit_code, 0, "stderr: {}", result.stderr);
    assert!(result.stdout.contains("wrote test.txt"));
    assert!(result.changed_files.contains(&"test.txt".to_string()));
    assert!(result.diff_stat.insertions > 0);
}

#[tokio::test]
async fn throwing_submission_reports_fixed_failure_code() {
    let dir = tempfile::tempdir().unwrap();
    if !node_runs_typescript(dir.path()) {
        println!("Skipping: node with type stripping not available");
        return;
    }

    let submission = r#"
export async function main(): Promise<number> {
  throw new Error("boom");
}
"#;

    let executor = SandboxExecutor::new(
        dir.path().join("sandbox"),
        vec!["node".into(), "--experimental-strip-types".into()],
    )
    .with_workdir(dir.path());

    let result = executor.execute(submission, &HashMap::new()).await.unwrap();

    assert_eq!(result.exit_code, FAILURE_EXIT_CODE);
    assert!(result.stderr.contains("boom"));
}
