use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tool::ToolDescriptor;

/// Connection state of a supervised provider.
///
/// Transitions are restricted: `Starting` may become `Connected` or `Error`,
/// `Connected` may become `Disconnected` or `Error`, and any state may return
/// to `Starting` on a resync. Everything else is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildStatus {
    Starting,
    Connected,
    Disconnected,
    Error,
}

impl ChildStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition(self, next: ChildStatus) -> bool {
        use ChildStatus::*;
        match (self, next) {
            (_, Starting) => true,
            (Starting, Connected) | (Starting, Error) => true,
            (Connected, Disconnected) | (Connected, Error) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ChildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Live state of one provider connection. Mutated only by the owning
/// Supervisor; everyone else sees clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Capability this record belongs to.
    pub capability_id: String,
    /// Transport kind label ("stdio" or "http").
    pub transport: String,
    /// OS process id; absent for remote providers.
    pub pid: Option<u32>,
    /// Current connection status.
    pub status: ChildStatus,
    /// Last moment the provider answered successfully.
    pub last_health_check: Option<DateTime<Utc>>,
    /// Detail of the last failure, if any.
    pub error: Option<String>,
    /// Tool catalog reported by the provider's handshake.
    pub tools: Vec<ToolDescriptor>,
}

impl ConnectionRecord {
    /// Fresh record for a capability about to be spawned.
    pub fn new(capability_id: impl Into<String>, transport: impl Into<String>) -> Self {
        Self {
            capability_id: capability_id.into(),
            transport: transport.into(),
            pid: None,
            status: ChildStatus::Starting,
            last_health_check: None,
            error: None,
            tools: Vec::new(),
        }
    }

    /// Number of tools in the catalog.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Serializable summary for the status snapshot.
    pub fn summary(&self) -> ChildSummary {
        ChildSummary {
            capability_id: self.capability_id.clone(),
            pid: self.pid,
            status: self.status,
            transport: self.transport.clone(),
            last_health_check: self.last_health_check,
            error: self.error.clone(),
            tool_count: if self.tools.is_empty() && self.status != ChildStatus::Connected {
                None
            } else {
                Some(self.tools.len())
            },
        }
    }
}

/// One provider's entry in the persisted status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSummary {
    pub capability_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub status: ChildStatus,
    pub transport: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_health_check: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_count: Option<usize>,
}

/// Aggregate of every provider connection plus the relay port; persisted to a
/// well-known path and treated read-only by external consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_port: Option<u16>,
    pub children: Vec<ChildSummary>,
}
