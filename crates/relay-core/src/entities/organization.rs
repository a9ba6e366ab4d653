use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::MemberRole;

/// A tenant. Every board row, column and member belongs to exactly one.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
    pub name: String,
    /// URL-safe unique handle derived from the name.
    pub slug: String,
    /// Matching Clerk organization, when the tenant was created from one.
    pub clerk_org_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's membership in an organization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub organization_id: String,
    /// Clerk user ID.
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}
