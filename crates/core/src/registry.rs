//! Registry implementations.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::traits::CapabilityRegistry;
use crate::types::CapabilityDescriptor;
use crate::Result;

/// Registry backed by an in-memory descriptor list.
///
/// The production registry for configuration-file deployments: the config
/// loader resolves capability entries and hands the descriptors to this
/// type. `set` swaps the desired set, which is how tests (and embedders with
/// their own discovery) simulate registry changes.
pub struct StaticRegistry {
    descriptors: Mutex<Vec<CapabilityDescriptor>>,
    resolve_count: AtomicUsize,
}

impl StaticRegistry {
    pub fn new(descriptors: Vec<CapabilityDescriptor>) -> Self {
        Self {
            descriptors: Mutex::new(descriptors),
            resolve_count: AtomicUsize::new(0),
        }
    }

    /// Replace the descriptor set.
    pub fn set(&self, descriptors: Vec<CapabilityDescriptor>) {
        *self.descriptors.lock().unwrap() = descriptors;
    }

    /// How many times `resolve` has been called.
    pub fn resolve_count(&self) -> usize {
        self.resolve_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapabilityRegistry for StaticRegistry {
    async fn resolve(&self) -> Result<Vec<CapabilityDescriptor>> {
        self.resolve_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.descriptors.lock().unwrap().clone())
    }
}
