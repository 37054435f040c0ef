//! Submission execution engine.

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;

use agentbox_core::types::ExecutionResult;
use agentbox_core::{Error, Result};

use crate::audit;

/// Exit code reported when the submission throws before resolving, fails the
/// runtime entry check, or resolves to a non-integer.
pub const FAILURE_EXIT_CODE: i32 = 70;

/// Exit code reported when the runtime itself fails to start.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Fixed harness that imports the submission, awaits `main()` and maps its
/// resolution onto the process exit code.
const HARNESS: &str = r#"// Agentbox submission harness. Do not edit.
import * as submission from "./submission.ts";

const FAILURE_EXIT_CODE = 70;

async function run(): Promise<number> {
  const entry = (submission as Record<string, unknown>)["main"];
  if (typeof entry !== "function") {
    console.error("submission does not export a callable main()");
    return FAILURE_EXIT_CODE;
  }
  const resolved = await (entry as () => unknown)();
  if (typeof resolved !== "number" || !Number.isInteger(resolved)) {
    console.error(`main() must resolve to an integer exit code, got: ${String(resolved)}`);
    return FAILURE_EXIT_CODE;
  }
  return resolved;
}

run()
  .then((code) => process.exit(code))
  .catch((error) => {
    console.error(error instanceof Error ? error.stack ?? error.message : String(error));
    process.exit(FAILURE_EXIT_CODE);
  });
"#;

fn entry_point_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?m)^\s*export\s+(?:(?:async\s+)?function\s+main\s*\(|(?:const|let|var)\s+main\s*=)",
        )
        .expect("entry point pattern compiles")
    })
}

/// Restores the process working directory on drop, whatever path the
/// execution took to get there.
struct CwdGuard {
    original: PathBuf,
}

impl CwdGuard {
    fn capture() -> Result<Self> {
        Ok(Self {
            original: std::env::current_dir()?,
        })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if std::env::current_dir().ok().as_deref() != Some(&self.original) {
            if let Err(e) = std::env::set_current_dir(&self.original) {
                tracing::warn!(error = %e, "failed to restore working directory");
            }
        }
    }
}

/// Runs one code submission to completion as a supervised subprocess.
pub struct SandboxExecutor {
    sandbox_dir: PathBuf,
    runtime: Vec<String>,
    workdir: Option<PathBuf>,
}

impl SandboxExecutor {
    /// `sandbox_dir` is the session working area holding the submission, the
    /// harness and the generated binding modules; `runtime` is the command
    /// prefix used to run the harness.
    pub fn new(sandbox_dir: impl Into<PathBuf>, runtime: Vec<String>) -> Self {
        Self {
            sandbox_dir: sandbox_dir.into(),
            runtime,
            workdir: None,
        }
    }

    /// Override the subprocess working directory (defaults to the caller's).
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Verify the submission declares the designated entry point.
    ///
    /// Runs before anything touches the filesystem, so a rejected submission
    /// leaves no sandbox side effects behind.
    pub fn check_entry_point(source: &str) -> Result<()> {
        if entry_point_pattern().is_match(source) {
            Ok(())
        } else {
            Err(Error::contract_violation(
                "submission must export a main() entry point resolving to an integer exit code",
            ))
        }
    }

    /// Run one submission and report its outcome.
    ///
    /// The submission source is written verbatim into the sandbox working
    /// area, run with the configured runtime and the given environment, and
    /// audited against the working tree afterwards. The result is always a
    /// well-formed [`ExecutionResult`]; runtime failures surface through the
    /// exit code and captured output, not as errors.
    pub async fn execute(
        &self,
        submission: &str,
        env: &HashMap<String, String>,
    ) -> Result<ExecutionResult> {
        Self::check_entry_point(submission)?;

        let _guard = CwdGuard::capture()?;
        let workdir = match &self.workdir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        tokio::fs::create_dir_all(&self.sandbox_dir).await?;
        let submission_path = self.sandbox_dir.join("submission.ts");
        let harness_path = self.sandbox_dir.join("run.ts");
        tokio::fs::write(&submission_path, submission).await?;
        tokio::fs::write(&harness_path, HARNESS).await?;

        let program = self
            .runtime
            .first()
            .ok_or_else(|| Error::execution("sandbox runtime command is empty"))?;

        tracing::info!(
            runtime = %program,
            workdir = %workdir.display(),
            "running submission"
        );

        let spawned = Command::new(program)
            .args(&self.runtime[1..])
            .arg(&harness_path)
            .current_dir(&workdir)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let (exit_code, stdout, stderr) = match spawned {
            Ok(output) => (
                output.status.code().unwrap_or(FAILURE_EXIT_CODE),
                String::from_utf8_lossy(&output.stdout).into_owned(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ),
            Err(e) => {
                tracing::warn!(runtime = %program, error = %e, "runtime failed to start");
                (
                    SPAWN_FAILURE_EXIT_CODE,
                    String::new(),
                    format!("failed to start runtime '{}': {}", program, e),
                )
            }
        };

        let (changed_files, diff_stat) = audit::collect_changes(&workdir).await;

        tracing::info!(
            exit_code = exit_code,
            changed = changed_files.len(),
            "submission finished"
        );

        Ok(ExecutionResult {
            exit_code,
            stdout,
            stderr,
            changed_files,
            diff_stat,
        })
    }

    /// The session working area this executor writes into.
    pub fn sandbox_dir(&self) -> &Path {
        &self.sandbox_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exported_entry_points() {
        for source in [
            "export async function main() { return 0; }",
            "export function main() { return 0; }",
            "export const main = async () => 0;",
            "import { x } from \"dep\";\nexport async function main(): Promise<number> { return x; }",
        ] {
            assert!(SandboxExecutor::check_entry_point(source).is_ok(), "{source}");
        }
    }

    #[test]
    fn rejects_missing_entry_points() {
        for source in [
            "",
            "console.log(\"hello\");",
            "function main() { return 0; }", // not exported
            "export function mainframe() { return 0; }",
            "// export async function main() {}",
        ] {
            assert!(
                SandboxExecutor::check_entry_point(source).is_err(),
                "{source}"
            );
        }
    }
}
