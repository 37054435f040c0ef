//! Working-tree change auditing via git.

use std::path::Path;
use tokio::process::Command;

use agentbox_core::types::DiffStat;

/// Diff the working tree and summarize what changed.
///
/// Shells out to `git diff --numstat`. Every failure mode — git missing, not
/// a repository, no commits yet — degrades to an empty summary rather than
/// an error: auditing is best-effort and must never fail an execution.
pub async fn collect_changes(dir: &Path) -> (Vec<String>, DiffStat) {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["diff", "--numstat"])
        .output()
        .await;

    let output = match output {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            tracing::debug!(
                status = ?output.status.code(),
                "git diff unavailable, reporting no changes"
            );
            return (Vec::new(), DiffStat::default());
        }
        Err(e) => {
            tracing::debug!(error = %e, "git not runnable, reporting no changes");
            return (Vec::new(), DiffStat::default());
        }
    };

    parse_numstat(&String::from_utf8_lossy(&output.stdout))
}

/// Parse `git diff --numstat` output into paths and aggregate counts.
///
/// Binary files report `-` for both counts; they still count as changed
/// files with zero line totals.
fn parse_numstat(raw: &str) -> (Vec<String>, DiffStat) {
    let mut changed = Vec::new();
    let mut stat = DiffStat::default();

    for line in raw.lines() {
        let mut fields = line.splitn(3, '\t');
        let (Some(insertions), Some(deletions), Some(path)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        stat.files += 1;
        stat.insertions += insertions.parse::<usize>().unwrap_or(0);
        stat.deletions += deletions.parse::<usize>().unwrap_or(0);
        changed.push(path.to_string());
    }

    (changed, stat)
}
