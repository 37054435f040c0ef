//! Binding generation for capability tool catalogs.
//!
//! [`generate`] is a pure function from a catalog to TypeScript source plus a
//! signature-only declaration artifact; it never touches the filesystem.
//! [`writer::write_binding`] lays the generated module out under
//! `node_modules/<module>/` so sandboxed submissions can import a capability
//! by its configured module name with no further setup.

pub mod generator;
pub mod naming;
pub mod schema;
pub mod writer;

pub use generator::{generate, BindingSpec, GeneratedBinding};
