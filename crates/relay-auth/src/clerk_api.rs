//! Clerk Backend API helpers for organization membership.
//!
//! `clerk-rs` covers JWT validation only, so these endpoints are called
//! directly with `reqwest`.

use relay_core::enums::MemberRole;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub const CLERK_API_BASE: &str = "https://api.clerk.com/v1";

/// A member of a Clerk organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClerkMember {
    pub user_id: String,
    /// Clerk role key, e.g. `"org:admin"`.
    pub role: String,
    /// Primary identifier (usually the email address).
    pub email: Option<String>,
    pub name: Option<String>,
}

impl ClerkMember {
    /// Relay role for this member: Clerk admins become admins, everyone else
    /// a regular member.
    #[must_use]
    pub fn relay_role(&self) -> MemberRole {
        if self.role == "org:admin" {
            MemberRole::Admin
        } else {
            MemberRole::Member
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClerkInvitation {
    pub id: String,
    pub email_address: String,
    pub role: String,
    pub status: String,
}

/// Clerk role key for a Relay role. Clerk only knows admins and members.
#[must_use]
pub const fn clerk_role(role: MemberRole) -> &'static str {
    match role {
        MemberRole::Owner | MemberRole::Admin => "org:admin",
        MemberRole::Member | MemberRole::Liaison => "org:member",
    }
}

#[derive(Deserialize)]
struct MembershipList {
    data: Vec<Membership>,
}

#[derive(Deserialize)]
struct Membership {
    role: String,
    public_user_data: Option<PublicUserData>,
}

#[derive(Deserialize)]
struct PublicUserData {
    user_id: String,
    identifier: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// Decode a `GET /organizations/{id}/memberships` body. Memberships without
/// public user data are skipped.
///
/// # Errors
///
/// Returns `AuthError::ClerkApiError` if the body has the wrong shape.
pub fn parse_memberships(body: serde_json::Value) -> Result<Vec<ClerkMember>, AuthError> {
    let list: MembershipList = serde_json::from_value(body)
        .map_err(|e| AuthError::ClerkApiError(format!("parse members: {e}")))?;
    Ok(list
        .data
        .into_iter()
        .filter_map(|m| {
            let user = m.public_user_data?;
            let name = [user.first_name, user.last_name]
                .into_iter()
                .flatten()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            Some(ClerkMember {
                user_id: user.user_id,
                role: m.role,
                email: user.identifier,
                name: (!name.is_empty()).then_some(name),
            })
        })
        .collect())
}

/// Client for the Clerk Backend API.
#[derive(Debug, Clone)]
pub struct ClerkApi {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl ClerkApi {
    #[must_use]
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base_url(secret_key, CLERK_API_BASE)
    }

    #[must_use]
    pub fn with_base_url(secret_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response, AuthError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(AuthError::ClerkApiError(format!("{what}: HTTP {status}: {body}")))
    }

    /// List the members of a Clerk organization (first 100).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClerkApiError` if the call fails or returns non-2xx.
    pub async fn list_members(&self, org_id: &str) -> Result<Vec<ClerkMember>, AuthError> {
        let resp = self
            .client
            .get(format!("{}/organizations/{org_id}/memberships", self.base_url))
            .query(&[("limit", "100")])
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AuthError::ClerkApiError(format!("list members: {e}")))?;
        let body = Self::check(resp, "list members")
            .await?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| AuthError::ClerkApiError(format!("parse members: {e}")))?;
        parse_memberships(body)
    }

    /// Invite `email` to a Clerk organization.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClerkApiError` if the call fails or returns non-2xx.
    pub async fn invite_member(
        &self,
        org_id: &str,
        email: &str,
        role: MemberRole,
    ) -> Result<ClerkInvitation, AuthError> {
        let resp = self
            .client
            .post(format!("{}/organizations/{org_id}/invitations", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&serde_json::json!({
                "email_address": email,
                "role": clerk_role(role),
            }))
            .send()
            .await
            .map_err(|e| AuthError::ClerkApiError(format!("invite member: {e}")))?;
        Self::check(resp, "invite member")
            .await?
            .json()
            .await
            .map_err(|e| AuthError::ClerkApiError(format!("parse invitation: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn memberships_are_decoded() {
        let body = serde_json::json!({
            "data": [
                {
                    "role": "org:admin",
                    "created_at": 1_760_000_000_000_i64,
                    "public_user_data": {
                        "user_id": "user_a",
                        "identifier": "ana@example.com",
                        "first_name": "Ana",
                        "last_name": "Silva"
                    }
                },
                { "role": "org:member", "public_user_data": null },
                {
                    "role": "org:member",
                    "public_user_data": { "user_id": "user_b", "identifier": null }
                }
            ],
            "total_count": 3
        });

        let members = parse_memberships(body).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name.as_deref(), Some("Ana Silva"));
        assert_eq!(members[0].relay_role(), MemberRole::Admin);
        assert_eq!(members[1].email, None);
        assert_eq!(members[1].name, None);
        assert_eq!(members[1].relay_role(), MemberRole::Member);
    }

    #[test]
    fn malformed_body_is_an_api_error() {
        let err = parse_memberships(serde_json::json!({"items": []})).unwrap_err();
        assert!(matches!(err, AuthError::ClerkApiError(_)));
    }

    #[test]
    fn roles_map_onto_clerk_keys() {
        assert_eq!(clerk_role(MemberRole::Owner), "org:admin");
        assert_eq!(clerk_role(MemberRole::Liaison), "org:member");
    }

    #[test]
    fn base_url_is_normalised() {
        let api = ClerkApi::with_base_url("sk", "http://localhost:9999/v1/");
        assert_eq!(api.base_url, "http://localhost:9999/v1");
    }
}
