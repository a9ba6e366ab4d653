//! Email notifications queued after successful mutations.
//!
//! The mutation has already committed when these run, so a failure to queue
//! is logged and swallowed.

use relay_core::entities::{Member, Organization, SupportTicket, TicketMessage};
use relay_mail::{EmailMessage, templates};

use crate::state::AppState;

async fn queue(state: &AppState, message: EmailMessage, kind: &'static str) {
    if let Err(e) = relay_mail::enqueue(&state.service, &message).await {
        tracing::warn!(kind, to = %message.to, error = %e, "failed to queue email");
    }
}

pub async fn ticket_created(state: &AppState, ticket: &SupportTicket, first_message: &str) {
    let inbox = &state.config.email.support_inbox;
    if inbox.is_empty() {
        tracing::debug!(ticket = %ticket.id, "no support inbox configured");
        return;
    }
    let message = templates::ticket_created(inbox, ticket, first_message, state.app_url());
    queue(state, message, "ticket_created").await;
}

pub async fn ticket_reply(state: &AppState, ticket: &SupportTicket, reply: &TicketMessage) {
    if reply.internal {
        return;
    }
    queue(state, templates::ticket_reply(ticket, reply, state.app_url()), "ticket_reply").await;
}

pub async fn ticket_status_changed(state: &AppState, ticket: &SupportTicket) {
    queue(
        state,
        templates::ticket_status_changed(ticket, state.app_url()),
        "ticket_status_changed",
    )
    .await;
}

pub async fn member_added(state: &AppState, organization: &Organization, member: &Member) {
    queue(
        state,
        templates::member_added(organization, member, state.app_url()),
        "member_added",
    )
    .await;
}
