//! Clerk authentication configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClerkConfig {
    /// Clerk publishable key.
    #[serde(default)]
    pub publishable_key: String,

    /// Clerk secret key. Used for the JWKS fetch and the Backend API.
    #[serde(default)]
    pub secret_key: String,
    /// Static bearer token to Clerk user ID, accepted when no secret key is
    /// set. For local development and tests only.
    #[serde(default)]
    pub dev_tokens: BTreeMap<String, String>,
}

impl ClerkConfig {
    /// Check if the Clerk config has the minimum required fields.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_empty()
    }
}
