//! Organizations and their members.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use relay_auth::clerk_api::ClerkApi;
use relay_core::entities::{Member, Organization};
use relay_core::requests::{
    AddMemberRequest, CreateOrganizationRequest, UpdateMemberRequest, UpdateOrganizationRequest,
};
use relay_core::responses::OrganizationCreated;

use crate::error::ApiError;
use crate::extract::{CurrentUser, OrgContext, Path, Payload};
use crate::notify;
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Payload(req): Payload<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<OrganizationCreated>), ApiError> {
    let created = state.service.create_organization(&identity.user_id, &req).await?;
    tracing::info!(org = %created.organization.id, owner = %identity.user_id, "organization created");

    if let (Some(clerk), Some(clerk_org)) = (&state.clerk, created.organization.clerk_org_id.as_deref()) {
        import_clerk_members(&state, clerk, clerk_org, &created.organization, &identity.user_id).await;
    }
    Ok((StatusCode::CREATED, Json(created)))
}

/// Copy the Clerk organization's existing members. Best effort.
async fn import_clerk_members(
    state: &AppState,
    clerk: &ClerkApi,
    clerk_org: &str,
    organization: &Organization,
    owner_id: &str,
) {
    let members = match clerk.list_members(clerk_org).await {
        Ok(members) => members,
        Err(e) => {
            tracing::warn!(org = %organization.id, error = %e, "could not import clerk members");
            return;
        }
    };
    let mut imported = 0_u32;
    for clerk_member in members {
        if clerk_member.user_id == owner_id {
            continue;
        }
        let Some(email) = clerk_member.email.clone() else {
            continue;
        };
        let req = AddMemberRequest {
            user_id: clerk_member.user_id.clone(),
            email,
            name: clerk_member.name.clone(),
            role: clerk_member.relay_role(),
        };
        match state.service.add_member(owner_id, &organization.id, &req).await {
            Ok(_) => imported += 1,
            Err(e) => tracing::warn!(user = %req.user_id, error = %e, "skipped clerk member"),
        }
    }
    tracing::info!(org = %organization.id, imported, "clerk members imported");
}

pub async fn list_mine(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<Organization>>, ApiError> {
    Ok(Json(state.service.list_organizations_for_user(&identity.user_id).await?))
}

pub async fn current(ctx: OrgContext) -> Json<Organization> {
    Json(ctx.organization)
}

pub async fn rename(
    State(state): State<AppState>,
    ctx: OrgContext,
    Payload(req): Payload<UpdateOrganizationRequest>,
) -> Result<Json<Organization>, ApiError> {
    ctx.require_member_admin()?;
    Ok(Json(
        state
            .service
            .update_organization(ctx.user_id(), ctx.org_id(), &req.name)
            .await?,
    ))
}

pub async fn list_members(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> Result<Json<Vec<Member>>, ApiError> {
    Ok(Json(state.service.list_members(ctx.org_id()).await?))
}

pub async fn add_member(
    State(state): State<AppState>,
    ctx: OrgContext,
    Payload(req): Payload<AddMemberRequest>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    ctx.require_member_admin()?;
    let member = state.service.add_member(ctx.user_id(), ctx.org_id(), &req).await?;

    if let (Some(clerk), Some(clerk_org)) = (&state.clerk, ctx.organization.clerk_org_id.as_deref()) {
        if let Err(e) = clerk.invite_member(clerk_org, &member.email, member.role).await {
            tracing::warn!(member = %member.id, error = %e, "clerk invitation failed");
        }
    }
    notify::member_added(&state, &ctx.organization, &member).await;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update_member(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(member_id): Path<String>,
    Payload(req): Payload<UpdateMemberRequest>,
) -> Result<Json<Member>, ApiError> {
    ctx.require_member_admin()?;
    Ok(Json(
        state
            .service
            .update_member_role(ctx.user_id(), ctx.org_id(), &member_id, req.role)
            .await?,
    ))
}

pub async fn remove_member(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(member_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.require_member_admin()?;
    state
        .service
        .remove_member(ctx.user_id(), ctx.org_id(), &member_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
