//! Error types for Agentbox.

use thiserror::Error;

/// Result type alias using Agentbox's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Agentbox.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Provider / Supervisor Errors
    // =========================================================================
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Call timed out: {0}")]
    CallTimeout(String),

    #[error("Call rejected: {0}")]
    CallRejected(String),

    #[error("Provider crashed: {0}")]
    ProviderCrashed(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    // =========================================================================
    // Relay Errors
    // =========================================================================
    #[error("No free port found within {range} ports of {base}")]
    PortExhausted { base: u16, range: u16 },

    #[error("Relay error: {0}")]
    Relay(String),

    // =========================================================================
    // Sandbox Errors
    // =========================================================================
    #[error("Submission contract violation: {0}")]
    ContractViolation(String),

    #[error("Execution error: {0}")]
    Execution(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a handshake error.
    pub fn handshake(msg: impl Into<String>) -> Self {
        Self::Handshake(msg.into())
    }

    /// Create a call timeout error.
    pub fn call_timeout(msg: impl Into<String>) -> Self {
        Self::CallTimeout(msg.into())
    }

    /// Create a call rejected error.
    pub fn call_rejected(msg: impl Into<String>) -> Self {
        Self::CallRejected(msg.into())
    }

    /// Create a provider crashed error.
    pub fn provider_crashed(msg: impl Into<String>) -> Self {
        Self::ProviderCrashed(msg.into())
    }

    /// Create a tool execution error.
    pub fn tool_execution(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create a relay error.
    pub fn relay(msg: impl Into<String>) -> Self {
        Self::Relay(msg.into())
    }

    /// Create a submission contract violation.
    pub fn contract_violation(msg: impl Into<String>) -> Self {
        Self::ContractViolation(msg.into())
    }

    /// Create an execution error.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
