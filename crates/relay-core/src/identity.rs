use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Authenticated caller identity passed between crates.
///
/// Produced by `relay-auth`, consumed by `relay-server` guards.
/// Contains only data fields, no auth logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuthIdentity {
    /// Clerk user ID (JWT `sub` claim).
    pub user_id: String,
    /// Clerk organization ID (JWT `org_id` claim). `None` outside an org session.
    pub org_id: Option<String>,
    /// Clerk organization slug.
    pub org_slug: Option<String>,
    /// Clerk organization role, e.g. `"org:admin"`.
    pub org_role: Option<String>,
}

impl AuthIdentity {
    /// Identity for a user without an active Clerk organization.
    #[must_use]
    pub fn personal(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            org_id: None,
            org_slug: None,
            org_role: None,
        }
    }
}
