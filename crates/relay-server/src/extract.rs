//! Request guards.
//!
//! | Extractor        | Requires |
//! |------------------|----------|
//! | [`CurrentUser`]  | a valid bearer token |
//! | [`OrgContext`]   | ... and membership of the selected organization |
//! | [`BoardAccess`]  | ... and a subscription that grants access |
//! | [`PlatformAdmin`]| a bearer token of a configured platform admin |
//! | [`Payload`]      | a JSON body valid against its registered schema |
//!
//! [`Query`] and [`Path`] wrap axum's extractors so malformed input is
//! answered with the JSON error body instead of plain text.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use relay_auth::bearer_token;
use relay_core::entities::{Member, Organization};
use relay_core::identity::AuthIdentity;
use relay_core::requests::RequestPayload;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::state::AppState;

/// Explicit organization selector; falls back to the session's Clerk org.
pub const ORG_HEADER: &str = "x-organization-id";

pub struct CurrentUser(pub AuthIdentity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        let token = bearer_token(header)?;
        Ok(Self(state.auth.authenticate(token).await?))
    }
}

/// The caller, the organization they act in, and their membership.
#[derive(Debug, Clone)]
pub struct OrgContext {
    pub identity: AuthIdentity,
    pub organization: Organization,
    pub member: Member,
}

impl OrgContext {
    /// Resolve the organization from `explicit` (header or query) or the
    /// identity's Clerk organization and check membership.
    ///
    /// # Errors
    ///
    /// `BadRequest` when no organization is selected, `NotFound` for an
    /// unknown one, `Forbidden` when the caller is not a member.
    pub async fn resolve(
        state: &AppState,
        identity: AuthIdentity,
        explicit: Option<&str>,
    ) -> Result<Self, ApiError> {
        let organization = match (explicit.filter(|s| !s.is_empty()), identity.org_id.as_deref()) {
            (Some(id), _) => state.service.get_organization(id).await,
            (None, Some(clerk_org)) => state.service.get_organization_by_clerk_id(clerk_org).await,
            (None, None) => {
                return Err(ApiError::BadRequest("no organization selected".into()));
            }
        }
        .map_err(|e| {
            if e.is_not_found() {
                ApiError::not_found("organization")
            } else {
                e.into()
            }
        })?;

        let member = state
            .service
            .find_member(&organization.id, &identity.user_id)
            .await?
            .ok_or_else(|| ApiError::forbidden("not a member of this organization"))?;

        Ok(Self {
            identity,
            organization,
            member,
        })
    }

    #[must_use]
    pub fn org_id(&self) -> &str {
        &self.organization.id
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    /// Owners and admins: columns, exports, billing.
    ///
    /// # Errors
    ///
    /// `Forbidden` for other roles.
    pub fn require_manager(&self) -> Result<(), ApiError> {
        if self.member.role.can_manage_board() {
            Ok(())
        } else {
            Err(ApiError::forbidden("requires the owner or admin role"))
        }
    }

    /// Board rows.
    ///
    /// # Errors
    ///
    /// `Forbidden` for roles without record access.
    pub fn require_editor(&self) -> Result<(), ApiError> {
        if self.member.role.can_edit_records() {
            Ok(())
        } else {
            Err(ApiError::forbidden("this role cannot edit board records"))
        }
    }

    /// Owners and admins: membership changes.
    ///
    /// # Errors
    ///
    /// `Forbidden` for other roles.
    pub fn require_member_admin(&self) -> Result<(), ApiError> {
        if self.member.role.can_manage_members() {
            Ok(())
        } else {
            Err(ApiError::forbidden("requires the owner or admin role"))
        }
    }
}

impl FromRequestParts<AppState> for OrgContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        let explicit = parts
            .headers
            .get(ORG_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self::resolve(state, identity, explicit.as_deref()).await
    }
}

/// Membership plus an active (or trialing) subscription.
pub struct BoardAccess(pub OrgContext);

impl FromRequestParts<AppState> for BoardAccess {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = OrgContext::from_request_parts(parts, state).await?;
        if !state.service.has_active_subscription(ctx.org_id()).await? {
            return Err(ApiError::forbidden("an active subscription is required"));
        }
        Ok(Self(ctx))
    }
}

pub struct PlatformAdmin(pub AuthIdentity);

impl FromRequestParts<AppState> for PlatformAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        if !state.config.admin.is_admin(&identity.user_id) {
            return Err(ApiError::forbidden("platform administrators only"));
        }
        Ok(Self(identity))
    }
}

/// A JSON body validated against the schema registered for `T`.
pub struct Payload<T>(pub T);

impl<T> FromRequest<AppState> for Payload<T>
where
    T: RequestPayload + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Self(state.schemas.parse::<T>(value)?))
    }
}

/// Query string extractor with JSON rejections.
pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) = axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Path parameter extractor with JSON rejections.
pub struct Path<T>(pub T);

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) = axum::extract::Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}
