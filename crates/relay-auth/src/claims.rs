use chrono::{DateTime, Utc};
use relay_core::identity::AuthIdentity;

/// Validated claims of a Clerk session JWT.
#[derive(Debug, Clone)]
pub struct RelayClaims {
    /// Raw JWT string, kept for forwarding to Clerk.
    pub raw_jwt: String,
    /// Clerk user ID (`sub` claim).
    pub user_id: String,
    /// Active organization (`org_id` claim). `None` outside an org session.
    pub org_id: Option<String>,
    pub org_slug: Option<String>,
    /// Organization role (`org_role` claim, e.g. `"org:admin"`).
    pub org_role: Option<String>,
    /// From the `exp` claim.
    pub expires_at: DateTime<Utc>,
}

impl RelayClaims {
    #[must_use]
    pub fn to_identity(&self) -> AuthIdentity {
        AuthIdentity {
            user_id: self.user_id.clone(),
            org_id: self.org_id.clone(),
            org_slug: self.org_slug.clone(),
            org_role: self.org_role.clone(),
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
