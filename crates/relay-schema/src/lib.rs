//! # relay-schema
//!
//! JSON Schema registry for Relay request payloads.
//!
//! Request DTOs are defined in `relay-core` with `#[derive(JsonSchema)]`. This
//! crate compiles one validator per DTO at startup so the HTTP layer can reject
//! a body with a complete list of violations before any service is called.

mod error;
mod registry;

pub use error::SchemaError;
pub use registry::SchemaRegistry;
