//! Per-capability provider supervision.

use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use agentbox_core::config::SupervisorConfig;
use agentbox_core::types::{CapabilityDescriptor, ChildStatus, ConnectionRecord, ToolDescriptor, TransportSpec};
use agentbox_core::{Error, Result};

use crate::transport::{HttpTransport, StdioTransport, Transport};

/// Protocol version announced during the initialize handshake.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Owns one provider's connection lifecycle.
///
/// The supervisor is the only writer of its [`ConnectionRecord`]; a failed or
/// crashed provider degrades its own record and never takes the Controller
/// down with it.
pub struct Supervisor {
    descriptor: CapabilityDescriptor,
    config: SupervisorConfig,
    record: RwLock<ConnectionRecord>,
    // Also the per-capability serialization point: at most one in-flight
    // call per provider.
    transport: Mutex<Option<Box<dyn Transport>>>,
}

impl Supervisor {
    pub fn new(descriptor: CapabilityDescriptor, config: SupervisorConfig) -> Self {
        let record = ConnectionRecord::new(&descriptor.id, descriptor.transport.kind());
        Self {
            descriptor,
            config,
            record: RwLock::new(record),
            transport: Mutex::new(None),
        }
    }

    /// Build a supervisor over an already-constructed transport.
    ///
    /// Used by tests and custom transport implementations; `spawn` is the
    /// production path.
    pub fn from_parts(
        descriptor: CapabilityDescriptor,
        config: SupervisorConfig,
        transport: Box<dyn Transport>,
    ) -> Self {
        let supervisor = Self::new(descriptor, config);
        *supervisor.transport.try_lock().expect("fresh supervisor") = Some(transport);
        supervisor
    }

    pub fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    pub async fn status(&self) -> ChildStatus {
        self.record.read().await.status
    }

    /// Whether this supervisor is worth keeping during reconciliation.
    pub async fn is_active(&self) -> bool {
        matches!(
            self.status().await,
            ChildStatus::Starting | ChildStatus::Connected
        )
    }

    /// Snapshot of the connection record.
    pub async fn record(&self) -> ConnectionRecord {
        self.record.read().await.clone()
    }

    /// Start the provider.
    ///
    /// Local processes are spawned and handshaken immediately; remote
    /// endpoints stay `Starting` until the first use triggers a lazy catalog
    /// fetch under the same status rules.
    pub async fn spawn(&self) {
        self.transition(ChildStatus::Starting).await;

        match &self.descriptor.transport {
            TransportSpec::Stdio { command, args, env } => {
                match StdioTransport::spawn(command, args, env) {
                    Ok(transport) => {
                        self.record.write().await.pid = transport.pid();
                        *self.transport.lock().await = Some(Box::new(transport));
                        if let Err(e) = self.connect().await {
                            tracing::warn!(
                                capability = %self.descriptor.id,
                                error = %e,
                                "provider handshake failed"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            capability = %self.descriptor.id,
                            error = %e,
                            "failed to start provider"
                        );
                        self.set_error(e.to_string()).await;
                    }
                }
            }
            TransportSpec::Http { url, headers } => {
                *self.transport.lock().await =
                    Some(Box::new(HttpTransport::new(url.clone(), headers.clone())));
                tracing::debug!(
                    capability = %self.descriptor.id,
                    "remote provider registered, catalog fetch deferred"
                );
            }
        }
    }

    /// Run the initialize/catalog handshake on the stored transport.
    pub async fn connect(&self) -> Result<()> {
        let mut guard = self.transport.lock().await;
        let transport = guard
            .as_mut()
            .ok_or_else(|| Error::handshake("no transport attached"))?;

        let timeout = Duration::from_millis(self.config.handshake_timeout_ms);
        let outcome = tokio::time::timeout(timeout, handshake(transport.as_mut())).await;

        match outcome {
            Ok(Ok(tools)) => {
                let mut record = self.record.write().await;
                if record.status.can_transition(ChildStatus::Connected) {
                    record.status = ChildStatus::Connected;
                }
                record.error = None;
                record.last_health_check = Some(chrono::Utc::now());
                record.tools = tools;
                tracing::info!(
                    capability = %self.descriptor.id,
                    tools = record.tools.len(),
                    "provider connected"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                *guard = None;
                self.set_error(e.to_string()).await;
                Err(Error::handshake(e.to_string()))
            }
            Err(_) => {
                *guard = None;
                let detail = format!("handshake timed out after {:?}", timeout);
                self.set_error(detail.clone()).await;
                Err(Error::handshake(detail))
            }
        }
    }

    /// The provider's tool catalog; fetches lazily for remote providers.
    pub async fn catalog(&self) -> Result<Vec<ToolDescriptor>> {
        self.ensure_connected().await?;

        let record = self.record.read().await;
        if record.status != ChildStatus::Connected {
            return Err(Error::call_rejected(format!(
                "capability '{}' is {}",
                self.descriptor.id, record.status
            )));
        }
        Ok(record.tools.clone())
    }

    /// Forward one tool invocation.
    pub async fn call(&self, tool: &str, arguments: Value) -> Result<Value> {
        self.ensure_connected().await?;

        if self.status().await != ChildStatus::Connected {
            let record = self.record.read().await;
            return Err(Error::call_rejected(format!(
                "capability '{}' is {}{}",
                self.descriptor.id,
                record.status,
                record
                    .error
                    .as_deref()
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            )));
        }

        let mut guard = self.transport.lock().await;
        let transport = guard
            .as_mut()
            .ok_or_else(|| Error::call_rejected("no transport attached"))?;

        let timeout = Duration::from_millis(self.config.call_timeout_ms);
        let params = json!({ "name": tool, "arguments": arguments });
        let outcome =
            tokio::time::timeout(timeout, transport.request("tools/call", params)).await;

        match outcome {
            Ok(Ok(result)) => {
                self.record.write().await.last_health_check = Some(chrono::Utc::now());
                unwrap_call_result(result)
            }
            Ok(Err(e)) => {
                if matches!(e, Error::ProviderCrashed(_)) {
                    *guard = None;
                    self.set_error(e.to_string()).await;
                }
                Err(e)
            }
            Err(_) => Err(Error::call_timeout(format!(
                "tool '{}' on capability '{}' exceeded {:?}",
                tool, self.descriptor.id, timeout
            ))),
        }
    }

    /// Request graceful termination, forcing it after the grace period.
    pub async fn stop(&self) {
        if let Some(mut transport) = self.transport.lock().await.take() {
            let grace = Duration::from_millis(self.config.shutdown_grace_ms);
            if let Err(e) = transport.shutdown(grace).await {
                tracing::warn!(capability = %self.descriptor.id, error = %e, "shutdown failed");
            }
        }

        let mut record = self.record.write().await;
        if record.status.can_transition(ChildStatus::Disconnected) {
            record.status = ChildStatus::Disconnected;
        }
        record.pid = None;
        tracing::info!(capability = %self.descriptor.id, "provider stopped");
    }

    /// Lazy handshake for remote providers still in `Starting`.
    async fn ensure_connected(&self) -> Result<()> {
        let needs_connect = {
            let record = self.record.read().await;
            record.status == ChildStatus::Starting && record.transport == "http"
        };
        if needs_connect {
            // Ignore the error here; the caller observes the degraded status.
            let _ = self.connect().await;
        }
        Ok(())
    }

    async fn transition(&self, next: ChildStatus) -> bool {
        let mut record = self.record.write().await;
        if record.status.can_transition(next) {
            record.status = next;
            true
        } else {
            tracing::debug!(
                capability = %self.descriptor.id,
                from = %record.status,
                to = %next,
                "refusing illegal status transition"
            );
            false
        }
    }

    async fn set_error(&self, detail: String) {
        let mut record = self.record.write().await;
        if record.status.can_transition(ChildStatus::Error) {
            record.status = ChildStatus::Error;
        }
        record.error = Some(detail);
        record.pid = None;
    }
}

/// Initialize, announce readiness, fetch the tool catalog.
async fn handshake(transport: &mut dyn Transport) -> Result<Vec<ToolDescriptor>> {
    transport
        .request(
            "initialize",
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": "agentbox",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
        .await?;

    transport.notify("notifications/initialized", json!({})).await?;

    let listing = transport.request("tools/list", json!({})).await?;
    let tools = listing
        .get("tools")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::handshake("catalog response carried no tools array"))?;

    tools
        .iter()
        .map(|t| {
            serde_json::from_value(t.clone())
                .map_err(|e| Error::handshake(format!("malformed catalog entry: {}", e)))
        })
        .collect()
}

/// Map a `tools/call` result, surfacing provider-flagged failures.
fn unwrap_call_result(result: Value) -> Result<Value> {
    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        let detail = result
            .get("content")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("tool reported an error")
            .to_string();
        return Err(Error::tool_execution(detail));
    }
    Ok(result)
}
