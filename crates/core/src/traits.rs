//! Cross-crate traits.
//!
//! Implementations live in the crates that own the behavior; the traits live
//! here so the Relay can talk to the Controller (and tests can talk to mocks)
//! without a dependency cycle.

use async_trait::async_trait;
use serde_json::Value;

use crate::types::CapabilityDescriptor;
use crate::Result;

/// Supplies the enabled capability set and each one's transport descriptor.
///
/// Discovery and on-disk configuration parsing are the registry's problem;
/// the Controller only consumes resolved descriptors.
#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
    /// Resolve the currently desired capability set.
    async fn resolve(&self) -> Result<Vec<CapabilityDescriptor>>;
}

/// Routes one tool invocation to the provider owning it.
///
/// Implemented by the Controller; the Relay holds it as a trait object and
/// only ever reads through it.
#[async_trait]
pub trait CallRouter: Send + Sync {
    /// Forward a call to `capability_id`'s provider.
    async fn route_call(&self, capability_id: &str, tool: &str, arguments: Value) -> Result<Value>;

    /// Whether a supervisor exists for this capability at all.
    fn knows(&self, capability_id: &str) -> bool;
}
