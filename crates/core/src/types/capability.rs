use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Transport configuration for reaching a capability's provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportSpec {
    /// Spawn a local command and speak line-delimited JSON-RPC over stdio.
    Stdio {
        /// Command to run.
        command: String,
        /// Command arguments.
        #[serde(default)]
        args: Vec<String>,
        /// Extra environment variables for the child process.
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Speak JSON-RPC request/response against a remote HTTP endpoint.
    Http {
        /// Endpoint URL.
        url: String,
        /// Extra request headers (e.g. authorization).
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

impl TransportSpec {
    /// Short label used in connection records and status snapshots.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stdio { .. } => "stdio",
            Self::Http { .. } => "http",
        }
    }

    /// Environment variables this transport declares for sandboxed code.
    pub fn declared_env(&self) -> Option<&HashMap<String, String>> {
        match self {
            Self::Stdio { env, .. } => Some(env),
            Self::Http { .. } => None,
        }
    }
}

/// A capability as supplied by the external registry.
///
/// The Controller only ever reads descriptors; ownership stays with the
/// registry that resolved them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Unique capability identifier.
    pub id: String,
    /// Module name under which generated bindings are exposed to submissions.
    pub module: String,
    /// Source location of the capability on disk (watched for hot reload).
    pub path: PathBuf,
    /// How to reach the provider.
    pub transport: TransportSpec,
}

impl CapabilityDescriptor {
    /// Create a descriptor whose module name defaults to the capability id.
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, transport: TransportSpec) -> Self {
        let id = id.into();
        Self {
            module: id.clone(),
            id,
            path: path.into(),
            transport,
        }
    }

    /// Override the module name bindings are generated under.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }
}
