//! # relay-auth
//!
//! Authentication for the Relay API.
//!
//! Validates Clerk session JWTs against the instance JWKS (`clerk-rs`),
//! turns them into [`relay_core::identity::AuthIdentity`], and wraps the
//! Clerk Backend API endpoints the server needs for organization members.
//! Static development tokens can stand in for Clerk when no secret key is
//! configured.

pub mod authenticator;
pub mod claims;
pub mod clerk_api;
pub mod error;
pub mod jwks;

pub use authenticator::{Authenticator, bearer_token};
pub use claims::RelayClaims;
pub use error::AuthError;
