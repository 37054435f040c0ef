//! Transport adapters for provider connections.
//!
//! Both adapters speak JSON-RPC 2.0: [`StdioTransport`] over line-delimited
//! messages on a spawned child process's stdio, [`HttpTransport`] over plain
//! request/response against a remote endpoint. The Supervisor drives the
//! handshake and tool calls through the [`Transport`] trait and never sees
//! the difference.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use agentbox_core::{Error, Result};

/// Uniform request/notify surface over one provider connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one JSON-RPC request and wait for its matching response.
    async fn request(&mut self, method: &str, params: Value) -> Result<Value>;

    /// Send a JSON-RPC notification (no response expected).
    async fn notify(&mut self, method: &str, params: Value) -> Result<()>;

    /// OS process id of the provider, absent for remote transports.
    fn pid(&self) -> Option<u32>;

    /// Request graceful termination, forcing it after the grace period.
    async fn shutdown(&mut self, grace: Duration) -> Result<()>;
}

// =============================================================================
// Stdio Transport
// =============================================================================

/// Line-delimited JSON-RPC over a spawned subprocess's stdin/stdout.
pub struct StdioTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl StdioTransport {
    /// Spawn the configured command with piped stdio.
    pub fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::handshake(format!("failed to spawn '{}': {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::internal("child stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::internal("child stdout not captured"))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            lines: BufReader::new(stdout).lines(),
            next_id: 1,
        })
    }

    async fn send(&mut self, message: &Value) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::provider_crashed("provider stdin already closed"))?;

        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::provider_crashed(format!("write to provider failed: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| Error::provider_crashed(format!("flush to provider failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn request(&mut self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await?;

        // Read until the response with our id shows up; inbound notifications
        // and requests from the provider are skipped.
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| Error::provider_crashed(format!("read from provider failed: {}", e)))?
                .ok_or_else(|| Error::provider_crashed("provider exited before responding"))?;

            if line.trim().is_empty() {
                continue;
            }

            let message: Value = serde_json::from_str(&line)
                .map_err(|e| Error::internal(format!("malformed provider message: {}", e)))?;

            if message.get("id").and_then(Value::as_u64) != Some(id) {
                tracing::trace!(method = %method, "skipping unrelated provider message");
                continue;
            }

            return unwrap_response(message);
        }
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<()> {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .await
    }

    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn shutdown(&mut self, grace: Duration) -> Result<()> {
        // Closing stdin is the protocol-level termination request; well-behaved
        // providers exit on EOF.
        drop(self.stdin.take());

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(status = ?status.code(), "provider exited gracefully");
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "waiting for provider exit failed");
            }
            Err(_) => {
                tracing::warn!("provider ignored termination request, killing");
                let _ = self.child.kill().await;
            }
        }
        Ok(())
    }
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// JSON-RPC request/response against a remote HTTP endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    headers: HashMap<String, String>,
    next_id: u64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, headers: HashMap<String, String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            headers,
            next_id: 1,
        }
    }

    fn post(&self, body: &Value) -> reqwest::RequestBuilder {
        let mut req = self.client.post(&self.url).json(body);
        for (name, value) in &self.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        req
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&mut self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .post(&body)
            .send()
            .await
            .map_err(|e| Error::provider_crashed(format!("provider unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::internal(format!(
                "provider returned HTTP {}",
                response.status()
            )));
        }

        let message: Value = response
            .json()
            .await
            .map_err(|e| Error::internal(format!("malformed provider response: {}", e)))?;

        unwrap_response(message)
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<()> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });

        self.post(&body)
            .send()
            .await
            .map_err(|e| Error::provider_crashed(format!("provider unreachable: {}", e)))?;
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        None
    }

    async fn shutdown(&mut self, _grace: Duration) -> Result<()> {
        // Nothing to terminate; the session is stateless on our side.
        Ok(())
    }
}

/// Extract `result` from a JSON-RPC response, mapping error objects.
fn unwrap_response(message: Value) -> Result<Value> {
    if let Some(error) = message.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let detail = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown provider error");
        return Err(Error::tool_execution(format!("{} (code {})", detail, code)));
    }

    message
        .get("result")
        .cloned()
        .ok_or_else(|| Error::internal("provider response carried neither result nor error"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_response_returns_result() {
        let message = json!({ "jsonrpc": "2.0", "id": 1, "result": { "ok": true } });
        let result = unwrap_response(message).unwrap();
        assert_eq!(result["ok"], true);
    }

    #[test]
    fn unwrap_response_maps_error_objects() {
        let message = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32601, "message": "method not found" }
        });
        let err = unwrap_response(message).unwrap_err();
        assert!(matches!(err, Error::ToolExecution(_)));
        assert!(err.to_string().contains("method not found"));
    }

    #[test]
    fn unwrap_response_rejects_empty_messages() {
        let err = unwrap_response(json!({ "jsonrpc": "2.0", "id": 1 })).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
