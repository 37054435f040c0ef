//! Mock implementations of core traits for testing.
//!
//! Shipped as library code so integration tests across the workspace can
//! share them instead of redefining ad hoc stubs.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::traits::CallRouter;
use crate::{Error, Result};

/// Scripted router returning canned outcomes per (capability, tool) pair.
pub struct MockCallRouter {
    responses: Mutex<HashMap<(String, String), Result<Value>>>,
    calls: Mutex<Vec<(String, String, Value)>>,
}

impl MockCallRouter {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script the outcome for one (capability, tool) pair.
    pub fn script(&self, capability: &str, tool: &str, outcome: Result<Value>) {
        self.responses
            .lock()
            .unwrap()
            .insert((capability.to_string(), tool.to_string()), outcome);
    }

    /// Calls observed so far.
    pub fn calls(&self) -> Vec<(String, String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockCallRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallRouter for MockCallRouter {
    async fn route_call(&self, capability_id: &str, tool: &str, arguments: Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((capability_id.to_string(), tool.to_string(), arguments));

        let mut responses = self.responses.lock().unwrap();
        match responses.remove(&(capability_id.to_string(), tool.to_string())) {
            Some(outcome) => outcome,
            None => Err(Error::call_rejected(format!(
                "capability '{}' is not connected",
                capability_id
            ))),
        }
    }

    fn knows(&self, capability_id: &str) -> bool {
        self.responses
            .lock()
            .unwrap()
            .keys()
            .any(|(cap, _)| cap == capability_id)
    }
}
