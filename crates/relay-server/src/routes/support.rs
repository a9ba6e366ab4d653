//! Support tickets from the requester's side.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use relay_core::entities::{SupportTicket, TicketMessage, TicketRating};
use relay_core::enums::{MessageAuthor, TicketStatus};
use relay_core::identity::AuthIdentity;
use relay_core::requests::{CreateTicketRequest, PostMessageRequest, RateTicketRequest};
use relay_core::responses::TicketThread;

use crate::error::ApiError;
use crate::extract::{CurrentUser, ORG_HEADER, OrgContext, Path, Payload};
use crate::notify;
use crate::state::AppState;

/// The ticket, if `user_id` opened it.
async fn own_ticket(state: &AppState, ticket_id: &str, user_id: &str) -> Result<SupportTicket, ApiError> {
    let ticket = state.service.get_ticket(ticket_id).await?;
    if ticket.requester_id != user_id {
        return Err(ApiError::forbidden("only the requester can access this ticket"));
    }
    Ok(ticket)
}

/// Organization to attach a new ticket to. An explicit header must name an
/// organization the caller belongs to; the session's Clerk org is used only
/// when it maps to one.
async fn ticket_org(
    state: &AppState,
    identity: &AuthIdentity,
    headers: &HeaderMap,
) -> Result<Option<String>, ApiError> {
    if let Some(explicit) = headers.get(ORG_HEADER).and_then(|v| v.to_str().ok()) {
        let ctx = OrgContext::resolve(state, identity.clone(), Some(explicit)).await?;
        return Ok(Some(ctx.organization.id));
    }
    if identity.org_id.is_some() {
        return Ok(OrgContext::resolve(state, identity.clone(), None)
            .await
            .ok()
            .map(|ctx| ctx.organization.id));
    }
    Ok(None)
}

pub async fn open(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    headers: HeaderMap,
    Payload(req): Payload<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketThread>), ApiError> {
    let org = ticket_org(&state, &identity, &headers).await?;
    let thread = state
        .service
        .create_ticket(&identity.user_id, org.as_deref(), &req)
        .await?;
    tracing::info!(ticket = %thread.ticket.id, priority = %thread.ticket.priority, "ticket opened");
    notify::ticket_created(&state, &thread.ticket, &req.message).await;
    Ok((StatusCode::CREATED, Json(thread)))
}

pub async fn list_mine(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<SupportTicket>>, ApiError> {
    Ok(Json(
        state
            .service
            .list_tickets_for_requester(&identity.user_id)
            .await?,
    ))
}

pub async fn thread(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(ticket_id): Path<String>,
) -> Result<Json<TicketThread>, ApiError> {
    own_ticket(&state, &ticket_id, &identity.user_id).await?;
    Ok(Json(state.service.ticket_thread(&ticket_id, false).await?))
}

pub async fn reply(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(ticket_id): Path<String>,
    Payload(req): Payload<PostMessageRequest>,
) -> Result<(StatusCode, Json<TicketMessage>), ApiError> {
    own_ticket(&state, &ticket_id, &identity.user_id).await?;
    let message = state
        .service
        .post_message(&ticket_id, &identity.user_id, MessageAuthor::Customer, &req.body, false)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn close(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(ticket_id): Path<String>,
) -> Result<Json<SupportTicket>, ApiError> {
    own_ticket(&state, &ticket_id, &identity.user_id).await?;
    Ok(Json(
        state
            .service
            .transition_ticket(
                &identity.user_id,
                &ticket_id,
                TicketStatus::Closed,
                Some("closed by requester"),
            )
            .await?,
    ))
}

pub async fn rate(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(ticket_id): Path<String>,
    Payload(req): Payload<RateTicketRequest>,
) -> Result<(StatusCode, Json<TicketRating>), ApiError> {
    let rating = state
        .service
        .rate_ticket(&identity.user_id, &ticket_id, &req)
        .await?;
    Ok((StatusCode::CREATED, Json(rating)))
}
