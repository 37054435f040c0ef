//! Scripted transport for supervisor and controller tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use agentbox_core::types::ToolDescriptor;
use agentbox_core::{Error, Result};

use crate::transport::Transport;

/// Transport returning canned responses per JSON-RPC method.
pub struct ScriptedTransport {
    responses: HashMap<String, VecDeque<Result<Value>>>,
    delays: HashMap<String, Duration>,
    pub requests: Vec<String>,
    pub notifications: Vec<String>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            delays: HashMap::new(),
            requests: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Script one response for `method`; responses queue in FIFO order.
    pub fn on(mut self, method: &str, outcome: Result<Value>) -> Self {
        self.responses
            .entry(method.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Scripted with a successful handshake for the given catalog.
    pub fn with_catalog(tools: &[ToolDescriptor]) -> Self {
        Self::new()
            .on("initialize", Ok(json!({ "protocolVersion": "2024-11-05" })))
            .on(
                "tools/list",
                Ok(json!({ "tools": serde_json::to_value(tools).unwrap() })),
            )
    }

    /// Delay responses to `method`, for timeout tests.
    pub fn delay_on(mut self, method: &str, delay: Duration) -> Self {
        self.delays.insert(method.to_string(), delay);
        self
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&mut self, method: &str, _params: Value) -> Result<Value> {
        self.requests.push(method.to_string());

        if let Some(delay) = self.delays.get(method) {
            tokio::time::sleep(*delay).await;
        }

        match self.responses.get_mut(method).and_then(|q| q.pop_front()) {
            Some(outcome) => outcome,
            None => Err(Error::internal(format!("unscripted method '{}'", method))),
        }
    }

    async fn notify(&mut self, method: &str, _params: Value) -> Result<()> {
        self.notifications.push(method.to_string());
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        None
    }

    async fn shutdown(&mut self, _grace: Duration) -> Result<()> {
        Ok(())
    }
}
