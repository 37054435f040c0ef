use serde::{Deserialize, Serialize};

/// Aggregate counts from a working-tree diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStat {
    /// Number of files with changes.
    pub files: usize,
    /// Total inserted lines.
    pub insertions: usize,
    /// Total deleted lines.
    pub deletions: usize,
}

/// Outcome of one sandboxed submission, produced fresh per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The subprocess's own exit code, or a fixed non-zero code if it failed
    /// to start or threw before resolving.
    pub exit_code: i32,
    /// Captured standard output, in full.
    pub stdout: String,
    /// Captured standard error, in full.
    pub stderr: String,
    /// Paths that changed in the working tree during execution.
    pub changed_files: Vec<String>,
    /// Files/insertions/deletions summary of those changes.
    pub diff_stat: DiffStat,
}

impl ExecutionResult {
    /// Whether the submission completed with exit code zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
