//! Debounced filesystem watcher driving hot reload.

use std::path::PathBuf;
use std::time::Duration;

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use agentbox_core::{Error, Result};

use crate::reload::{reload, ReloadContext};

/// Watches capability source locations and triggers reload passes.
///
/// Filesystem events are funneled into a channel and collapsed with a quiet
/// window: a burst of writes produces one reload, not one per event.
pub struct HotReloadWatcher {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl HotReloadWatcher {
    /// Start watching `roots`; missing paths are skipped with a notice.
    pub fn start(ctx: ReloadContext, roots: &[PathBuf], debounce: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<notify::Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| {
                if let Ok(event) = res {
                    if is_relevant(&event.kind) {
                        let _ = tx.send(event);
                    }
                }
            },
            Config::default(),
        )
        .map_err(|e| Error::internal(format!("failed to create watcher: {}", e)))?;

        let mut watched = 0;
        for root in roots {
            if !root.exists() {
                tracing::debug!(path = %root.display(), "skipping missing watch root");
                continue;
            }
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| {
                    Error::internal(format!("failed to watch {}: {}", root.display(), e))
                })?;
            watched += 1;
        }
        tracing::info!(roots = watched, "hot-reload watcher started");

        let task = tokio::spawn(debounce_loop(rx, ctx, debounce));

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }

    /// Stop observing; any reload already in flight finishes on its own.
    pub fn stop(self) {
        self.task.abort();
        tracing::info!("hot-reload watcher stopped");
    }
}

/// Changes worth a reload; reads and metadata churn are not.
fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Collapse event bursts, then run one reload pass per quiet window.
async fn debounce_loop(
    mut rx: mpsc::UnboundedReceiver<notify::Event>,
    ctx: ReloadContext,
    debounce: Duration,
) {
    while let Some(event) = rx.recv().await {
        tracing::debug!(paths = ?event.paths, "capability source changed");

        // Drain follow-up events until the window stays quiet.
        loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        if let Err(e) = reload(&ctx).await {
            tracing::warn!(error = %e, "hot reload failed; previous state kept running");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_filter_drops_reads() {
        assert!(is_relevant(&EventKind::Create(
            notify::event::CreateKind::File
        )));
        assert!(is_relevant(&EventKind::Remove(
            notify::event::RemoveKind::File
        )));
        assert!(!is_relevant(&EventKind::Access(
            notify::event::AccessKind::Read
        )));
    }
}
