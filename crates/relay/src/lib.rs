//! Local HTTP bridge between sandboxed code and the Controller.
//!
//! Sandboxed submissions have no memory access to the host process; generated
//! bindings reach their providers through this relay's single
//! call-forwarding endpoint instead.

pub mod server;

pub use server::RelayServer;
