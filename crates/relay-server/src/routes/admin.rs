//! Platform administration: the support desk, organizations, the activity
//! log and the email queue.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use relay_core::entities::{ActivityEntry, EmailJob, Organization, SupportTicket, TicketMessage};
use relay_core::enums::{EmailStatus, MessageAuthor};
use relay_core::prompts;
use relay_core::requests::{ActivityQuery, AdminTicketUpdateRequest, PostMessageRequest, TicketQuery};
use relay_core::responses::{AssistDraft, RatingSummary, TicketThread};
use relay_db::repos::activity::ActivityFilter;
use relay_db::repos::ticket::TicketFilter;
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{Path, Payload, PlatformAdmin, Query};
use crate::notify;
use crate::state::AppState;

pub async fn list_tickets(
    State(state): State<AppState>,
    _admin: PlatformAdmin,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Vec<SupportTicket>>, ApiError> {
    Ok(Json(state.service.list_tickets(&TicketFilter::from(query)).await?))
}

pub async fn ticket(
    State(state): State<AppState>,
    _admin: PlatformAdmin,
    Path(ticket_id): Path<String>,
) -> Result<Json<TicketThread>, ApiError> {
    Ok(Json(state.service.ticket_thread(&ticket_id, true).await?))
}

/// Apply status, priority and assignee changes atomically. The requester is
/// emailed only after the whole update commits.
pub async fn update_ticket(
    State(state): State<AppState>,
    PlatformAdmin(admin): PlatformAdmin,
    Path(ticket_id): Path<String>,
    Payload(req): Payload<AdminTicketUpdateRequest>,
) -> Result<Json<TicketThread>, ApiError> {
    let update = state
        .service
        .update_ticket(&admin.user_id, &ticket_id, &req)
        .await?;
    if update.status_changed {
        notify::ticket_status_changed(&state, &update.ticket).await;
    }
    Ok(Json(state.service.ticket_thread(&ticket_id, true).await?))
}

pub async fn post_message(
    State(state): State<AppState>,
    PlatformAdmin(admin): PlatformAdmin,
    Path(ticket_id): Path<String>,
    Payload(req): Payload<PostMessageRequest>,
) -> Result<(StatusCode, Json<TicketMessage>), ApiError> {
    let message = state
        .service
        .post_message(&ticket_id, &admin.user_id, MessageAuthor::Staff, &req.body, req.internal)
        .await?;
    if !message.internal {
        let ticket = state.service.get_ticket(&ticket_id).await?;
        notify::ticket_reply(&state, &ticket, &message).await;
    }
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn assist(
    State(state): State<AppState>,
    _admin: PlatformAdmin,
    Path(ticket_id): Path<String>,
) -> Result<Json<AssistDraft>, ApiError> {
    let client = state.assist.as_ref().ok_or(ApiError::Unavailable("AI assistant"))?;
    let thread = state.service.ticket_thread(&ticket_id, true).await?;
    let prompt = prompts::ticket_reply(&thread.ticket, &thread.messages);
    Ok(Json(client.draft(&prompt).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

pub async fn organizations(
    State(state): State<AppState>,
    _admin: PlatformAdmin,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Organization>>, ApiError> {
    Ok(Json(state.service.list_organizations(query.limit).await?))
}

pub async fn activity(
    State(state): State<AppState>,
    _admin: PlatformAdmin,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    Ok(Json(
        state
            .service
            .query_activity(&ActivityFilter::from(query))
            .await?,
    ))
}

pub async fn ratings(
    State(state): State<AppState>,
    _admin: PlatformAdmin,
) -> Result<Json<RatingSummary>, ApiError> {
    Ok(Json(state.service.rating_summary().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    pub status: Option<EmailStatus>,
    pub limit: Option<u32>,
}

pub async fn emails(
    State(state): State<AppState>,
    _admin: PlatformAdmin,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<EmailJob>>, ApiError> {
    Ok(Json(state.service.list_emails(query.status, query.limit).await?))
}
