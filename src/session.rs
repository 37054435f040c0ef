//! One host session owning the Controller, Relay and Watcher.
//!
//! All session state — the bound relay port, the status file, the sandbox
//! working area — lives on this value and is passed by reference; nothing
//! reads globals. Constructed once at startup, torn down at shutdown.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agentbox_controller::Controller;
use agentbox_core::traits::CapabilityRegistry;
use agentbox_core::types::ExecutionResult;
use agentbox_core::{AppConfig, Result};
use agentbox_relay::RelayServer;
use agentbox_sandbox::SandboxExecutor;
use agentbox_watcher::{regenerate_bindings, HotReloadWatcher, ReloadContext};

pub struct Session {
    config: AppConfig,
    controller: Arc<Controller>,
    relay_port: u16,
    relay_task: tokio::task::JoinHandle<Result<()>>,
    watcher: Option<HotReloadWatcher>,
    root_dir: PathBuf,
}

impl Session {
    /// Bring the session up: spawn providers, bind the relay, generate
    /// bindings, persist the first status snapshot, start the watcher.
    pub async fn start(
        config: AppConfig,
        registry: Arc<dyn CapabilityRegistry>,
    ) -> Result<Self> {
        let root_dir = PathBuf::from(&config.sandbox.dir);
        let snapshot_path = root_dir.join("status.json");

        let controller = Arc::new(Controller::new(config.supervisor.clone(), snapshot_path));

        let desired = registry.resolve().await?;
        controller.sync_capabilities(&desired).await;

        let relay = RelayServer::new(config.relay.clone(), controller.clone());
        let (listener, relay_port) = relay.bind().await?;
        controller.set_relay_port(relay_port).await;
        let relay_task = tokio::spawn(relay.serve(listener));

        let generated = regenerate_bindings(&controller, relay_port, &root_dir).await?;
        tracing::info!(
            capabilities = desired.len(),
            bindings = generated,
            relay_port = relay_port,
            "session started"
        );

        let watcher = if config.watcher.enabled {
            let mut roots: Vec<PathBuf> = desired.iter().map(|d| d.path.clone()).collect();
            roots.sort();
            roots.dedup();

            let ctx = ReloadContext {
                controller: controller.clone(),
                registry: registry.clone(),
                bindings_root: root_dir.clone(),
                relay_port,
            };
            match HotReloadWatcher::start(
                ctx,
                &roots,
                Duration::from_millis(config.watcher.debounce_ms),
            ) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(error = %e, "hot reload unavailable for this session");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            config,
            controller,
            relay_port,
            relay_task,
            watcher,
            root_dir,
        })
    }

    pub fn relay_port(&self) -> u16 {
        self.relay_port
    }

    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    /// Run one submission with every capability-declared environment variable
    /// injected.
    pub async fn execute(&self, submission: &str) -> Result<ExecutionResult> {
        let mut env: HashMap<String, String> = HashMap::new();
        for (descriptor, _) in self.controller.catalogs().await {
            if let Some(declared) = descriptor.transport.declared_env() {
                env.extend(declared.clone());
            }
        }

        let executor =
            SandboxExecutor::new(self.root_dir.clone(), self.config.sandbox.runtime.clone());
        executor.execute(submission, &env).await
    }

    /// Tear the session down: watcher first, then the relay, then every
    /// provider; the final snapshot reflects the stopped state.
    pub async fn shutdown(self) {
        if let Some(watcher) = self.watcher {
            watcher.stop();
        }
        self.relay_task.abort();
        self.controller.stop_all().await;
        tracing::info!("session shut down");
    }
}
