//! Provider lifecycle management.
//!
//! A [`Supervisor`] owns one provider's connection state machine: handshake,
//! tool catalog, health, termination. The [`Controller`] owns the map of
//! capability id → Supervisor and reconciles the running set against the
//! desired set. Transports (stdio subprocess, remote HTTP) live in
//! [`transport`] behind one trait so the Supervisor never cares which wire
//! it is speaking over.

pub mod controller;
pub mod mocks;
pub mod supervisor;
pub mod transport;

pub use controller::{Controller, SyncReport};
pub use supervisor::Supervisor;
pub use transport::{HttpTransport, StdioTransport, Transport};
