//! Core types, errors, configuration and traits shared across Agentbox.
//!
//! This crate carries no runtime logic of its own: the Controller, Relay,
//! Binding Generator and Sandbox Executor crates all build on the types
//! defined here.

pub mod config;
pub mod error;
pub mod mocks;
pub mod registry;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
