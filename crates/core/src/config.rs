use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::types::{CapabilityDescriptor, TransportSpec};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub relay: RelayConfig,
    pub supervisor: SupervisorConfig,
    pub sandbox: SandboxConfig,
    pub watcher: WatcherConfig,
    /// Capability entries supplied by the deployment's registry file.
    #[serde(default)]
    pub capabilities: Vec<CapabilityEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// First port probed when binding the relay.
    pub base_port: u16,
    /// How many consecutive ports to probe before giving up.
    pub probe_range: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SupervisorConfig {
    /// Bound on the initialize/catalog handshake.
    pub handshake_timeout_ms: u64,
    /// Bound on a single tool call round trip.
    pub call_timeout_ms: u64,
    /// Grace period between requesting termination and forcing it.
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    /// Command prefix used to run submissions (the harness path is appended).
    pub runtime: Vec<String>,
    /// Session working area, relative to the process working directory.
    pub dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatcherConfig {
    pub enabled: bool,
    /// Quiet window before a burst of filesystem events triggers a reload.
    pub debounce_ms: u64,
}

/// One capability as written in the registry section of the config file.
#[derive(Debug, Deserialize, Clone)]
pub struct CapabilityEntry {
    pub id: String,
    /// Module name for generated bindings; defaults to the id.
    pub module: Option<String>,
    /// Watched source location; defaults to the session working area.
    pub path: Option<PathBuf>,
    pub transport: TransportSpec,
}

impl CapabilityEntry {
    /// Resolve this entry into the descriptor form the Controller consumes.
    pub fn into_descriptor(self, default_root: &std::path::Path) -> CapabilityDescriptor {
        let module = self.module.unwrap_or_else(|| self.id.clone());
        let path = self
            .path
            .unwrap_or_else(|| default_root.join(&self.id));
        CapabilityDescriptor {
            id: self.id,
            module,
            path,
            transport: self.transport,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("AGENTBOX_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map APP__RELAY__BASE_PORT=8700 to relay.base_port
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            relay: RelayConfig {
                base_port: 8700,
                probe_range: 50,
            },
            supervisor: SupervisorConfig {
                handshake_timeout_ms: 10_000,
                call_timeout_ms: 30_000,
                shutdown_grace_ms: 3_000,
            },
            sandbox: SandboxConfig {
                runtime: vec!["node".into(), "--experimental-strip-types".into()],
                dir: ".agentbox".into(),
            },
            watcher: WatcherConfig {
                enabled: true,
                debounce_ms: 300,
            },
            capabilities: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.relay.base_port, 8700);
        assert!(cfg.relay.probe_range > 0);
        assert!(cfg.supervisor.handshake_timeout_ms >= 1_000);
        assert_eq!(cfg.sandbox.runtime[0], "node");
    }

    #[test]
    fn entry_defaults_module_and_path() {
        let entry = CapabilityEntry {
            id: "files".into(),
            module: None,
            path: None,
            transport: TransportSpec::Http {
                url: "http://localhost:9000/rpc".into(),
                headers: Default::default(),
            },
        };

        let descriptor = entry.into_descriptor(std::path::Path::new("/srv/caps"));
        assert_eq!(descriptor.module, "files");
        assert_eq!(descriptor.path, PathBuf::from("/srv/caps/files"));
    }
}
