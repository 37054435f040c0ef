//! Axum-based HTTP server for the relay.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use agentbox_core::config::RelayConfig;
use agentbox_core::traits::CallRouter;
use agentbox_core::{Error, Result};

/// Relay server bridging sandboxed code to the Controller.
///
/// Binds the first free local port starting from the configured base so that
/// several instances can coexist on one host.
pub struct RelayServer {
    config: RelayConfig,
    router: Arc<dyn CallRouter>,
}

impl RelayServer {
    pub fn new(config: RelayConfig, router: Arc<dyn CallRouter>) -> Self {
        Self { config, router }
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/call/:capability_id", post(call_handler))
            .with_state(self.router.clone())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
            .layer(TraceLayer::new_for_http())
    }

    /// Probe loopback ports from the configured base until one binds.
    pub async fn bind(&self) -> Result<(tokio::net::TcpListener, u16)> {
        let base = self.config.base_port;
        for offset in 0..self.config.probe_range {
            let port = base + offset;
            match tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
                Ok(listener) => {
                    tracing::info!(port = port, "relay bound");
                    return Ok((listener, port));
                }
                Err(e) => {
                    tracing::debug!(port = port, error = %e, "port unavailable, probing next");
                }
            }
        }
        Err(Error::PortExhausted {
            base,
            range: self.config.probe_range,
        })
    }

    /// Serve forever on an already-bound listener.
    pub async fn serve(self, listener: tokio::net::TcpListener) -> Result<()> {
        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::relay(format!("server error: {}", e)))
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Call forwarding request body.
#[derive(Debug, Deserialize)]
pub struct CallRequest {
    /// Tool to invoke on the capability's provider.
    #[serde(rename = "toolName")]
    pub tool_name: String,
    /// Argument payload, passed through verbatim.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Call forwarding response body.
#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallResponse {
    fn ok(result: serde_json::Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Call forwarding handler.
///
/// Failures come back as structured bodies with a non-success status code;
/// nothing thrown by a provider ever crosses this boundary as anything but
/// JSON.
async fn call_handler(
    State(router): State<Arc<dyn CallRouter>>,
    Path(capability_id): Path<String>,
    Json(payload): Json<CallRequest>,
) -> impl IntoResponse {
    let trace_id = Uuid::new_v4().to_string();

    tracing::debug!(
        trace_id = %trace_id,
        capability = %capability_id,
        tool = %payload.tool_name,
        "forwarding call"
    );

    if !router.knows(&capability_id) {
        return (
            StatusCode::NOT_FOUND,
            Json(CallResponse::fail(format!(
                "unknown capability '{}'",
                capability_id
            ))),
        );
    }

    match router
        .route_call(&capability_id, &payload.tool_name, payload.arguments)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(CallResponse::ok(result))),
        Err(e) => {
            tracing::warn!(
                trace_id = %trace_id,
                capability = %capability_id,
                tool = %payload.tool_name,
                error = %e,
                "call failed"
            );
            (failure_status(&e), Json(CallResponse::fail(e.to_string())))
        }
    }
}

/// Map call failures onto HTTP status codes.
fn failure_status(error: &Error) -> StatusCode {
    match error {
        Error::CallRejected(_) => StatusCode::CONFLICT,
        Error::CallTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::ProviderCrashed(_) | Error::ToolExecution(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_status_mapping() {
        assert_eq!(
            failure_status(&Error::call_rejected("x")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            failure_status(&Error::call_timeout("x")),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            failure_status(&Error::provider_crashed("x")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            failure_status(&Error::internal("x")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
