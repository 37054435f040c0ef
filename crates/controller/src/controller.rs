//! Reconciliation of the running provider set against the desired set.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use agentbox_core::config::SupervisorConfig;
use agentbox_core::traits::CallRouter;
use agentbox_core::types::{CapabilityDescriptor, StatusSnapshot, ToolDescriptor};
use agentbox_core::{Error, Result};

use crate::supervisor::Supervisor;

/// What one `sync_capabilities` pass actually did.
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    pub spawned: Vec<String>,
    pub stopped: Vec<String>,
    pub kept: Vec<String>,
}

/// Owns the map of capability id → [`Supervisor`].
///
/// The child map is the single source of truth for provider state; the Relay
/// only reads through it via [`CallRouter`]. Every state-changing operation
/// refreshes the persisted status snapshot.
pub struct Controller {
    children: DashMap<String, Arc<Supervisor>>,
    config: SupervisorConfig,
    relay_port: RwLock<Option<u16>>,
    snapshot_path: PathBuf,
}

impl Controller {
    pub fn new(config: SupervisorConfig, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            children: DashMap::new(),
            config,
            relay_port: RwLock::new(None),
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Spawn a supervisor for `descriptor` unless a healthy one already runs.
    pub async fn spawn_child(&self, descriptor: CapabilityDescriptor) {
        let existing = self.children.get(&descriptor.id).map(|e| e.clone());
        if let Some(existing) = existing {
            if existing.is_active().await && existing.descriptor() == &descriptor {
                tracing::debug!(capability = %descriptor.id, "supervisor already running");
                return;
            }
            existing.stop().await;
            self.children.remove(&descriptor.id);
        }

        self.spawn_into_map(descriptor).await;
        self.persist_snapshot().await;
    }

    async fn spawn_into_map(&self, descriptor: CapabilityDescriptor) {
        let supervisor = Arc::new(Supervisor::new(descriptor.clone(), self.config.clone()));
        supervisor.spawn().await;
        self.children.insert(descriptor.id, supervisor);
    }

    /// Adopt an externally constructed supervisor.
    ///
    /// Exists for tests and embedders wiring custom transports.
    pub fn adopt_child(&self, supervisor: Arc<Supervisor>) {
        self.children
            .insert(supervisor.descriptor().id.clone(), supervisor);
    }

    /// Reconcile the running set against `desired`.
    ///
    /// Stops no-longer-desired supervisors, spawns newly desired ones, and
    /// leaves healthy unchanged ones untouched — a capability whose unrelated
    /// files changed but whose transport descriptor did not is not restarted.
    /// A child sitting in `Error` is re-spawned; resync is the recovery path
    /// for crashed providers.
    pub async fn sync_capabilities(&self, desired: &[CapabilityDescriptor]) -> SyncReport {
        let mut report = SyncReport::default();

        let desired_ids: HashSet<&str> = desired.iter().map(|d| d.id.as_str()).collect();
        let running_ids: Vec<String> = self.children.iter().map(|e| e.key().clone()).collect();

        // Stop whatever is no longer desired.
        for id in running_ids {
            if !desired_ids.contains(id.as_str()) {
                if let Some((_, supervisor)) = self.children.remove(&id) {
                    supervisor.stop().await;
                    report.stopped.push(id);
                }
            }
        }

        // Spawn what is missing, restart what changed or died.
        for descriptor in desired {
            let existing = self.children.get(&descriptor.id).map(|e| e.clone());
            match existing {
                Some(supervisor) => {
                    let unchanged = supervisor.descriptor() == descriptor
                        && supervisor.is_active().await;
                    if unchanged {
                        report.kept.push(descriptor.id.clone());
                        continue;
                    }
                    supervisor.stop().await;
                    self.children.remove(&descriptor.id);
                    self.spawn_into_map(descriptor.clone()).await;
                    report.stopped.push(descriptor.id.clone());
                    report.spawned.push(descriptor.id.clone());
                }
                None => {
                    self.spawn_into_map(descriptor.clone()).await;
                    report.spawned.push(descriptor.id.clone());
                }
            }
        }

        tracing::info!(
            spawned = report.spawned.len(),
            stopped = report.stopped.len(),
            kept = report.kept.len(),
            "capability sync complete"
        );
        self.persist_snapshot().await;
        report
    }

    /// Terminate every supervisor; used at shutdown.
    pub async fn stop_all(&self) {
        let ids: Vec<String> = self.children.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, supervisor)) = self.children.remove(&id) {
                supervisor.stop().await;
            }
        }
        self.persist_snapshot().await;
    }

    /// Record the port the relay ended up binding.
    pub async fn set_relay_port(&self, port: u16) {
        *self.relay_port.write().await = Some(port);
        self.persist_snapshot().await;
    }

    pub fn child(&self, capability_id: &str) -> Option<Arc<Supervisor>> {
        self.children.get(capability_id).map(|e| e.clone())
    }

    /// Tool catalogs of every currently connected capability.
    pub async fn catalogs(&self) -> Vec<(CapabilityDescriptor, Vec<ToolDescriptor>)> {
        let supervisors: Vec<Arc<Supervisor>> =
            self.children.iter().map(|e| e.value().clone()).collect();

        let mut out = Vec::new();
        for supervisor in supervisors {
            match supervisor.catalog().await {
                Ok(tools) => out.push((supervisor.descriptor().clone(), tools)),
                Err(e) => {
                    tracing::debug!(
                        capability = %supervisor.descriptor().id,
                        error = %e,
                        "skipping catalog of unavailable capability"
                    );
                }
            }
        }
        out.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        out
    }

    /// Serializable aggregate of all connection records.
    pub async fn status_snapshot(&self) -> StatusSnapshot {
        let supervisors: Vec<Arc<Supervisor>> =
            self.children.iter().map(|e| e.value().clone()).collect();

        let mut children = Vec::with_capacity(supervisors.len());
        for supervisor in supervisors {
            children.push(supervisor.record().await.summary());
        }
        children.sort_by(|a, b| a.capability_id.cmp(&b.capability_id));

        StatusSnapshot {
            last_updated: chrono::Utc::now(),
            relay_port: *self.relay_port.read().await,
            children,
        }
    }

    /// Write the status snapshot to its well-known path, atomically.
    ///
    /// Failures are logged, not propagated: introspection must never take
    /// down supervision.
    pub async fn persist_snapshot(&self) {
        if let Err(e) = self.try_persist_snapshot().await {
            tracing::warn!(error = %e, path = %self.snapshot_path.display(), "failed to persist status snapshot");
        }
    }

    async fn try_persist_snapshot(&self) -> Result<()> {
        let snapshot = self.status_snapshot().await;
        let body = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = self.snapshot_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Replace-on-write keeps external readers from observing a torn file.
        let tmp = self.snapshot_path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.snapshot_path).await?;
        Ok(())
    }
}

#[async_trait]
impl CallRouter for Controller {
    async fn route_call(&self, capability_id: &str, tool: &str, arguments: Value) -> Result<Value> {
        match self.child(capability_id) {
            Some(supervisor) => supervisor.call(tool, arguments).await,
            None => Err(Error::call_rejected(format!(
                "unknown capability '{}'",
                capability_id
            ))),
        }
    }

    fn knows(&self, capability_id: &str) -> bool {
        self.children.contains_key(capability_id)
    }
}
