//! Hot reload of capability configuration.
//!
//! Watches capability source locations, debounces event bursts, and drives a
//! registry rebuild → controller reconciliation → binding regeneration pass
//! without a full restart. Supervisors for capabilities untouched by a change
//! keep running.

pub mod reload;
pub mod watcher;

pub use reload::{regenerate_bindings, ReloadContext};
pub use watcher::HotReloadWatcher;
