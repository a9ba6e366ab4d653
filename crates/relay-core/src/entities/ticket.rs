use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{MessageAuthor, TicketCategory, TicketPriority, TicketStatus};

/// A customer support ticket.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SupportTicket {
    pub id: String,
    /// Organization the requester was acting for, if any.
    pub organization_id: Option<String>,
    pub requester_id: String,
    pub requester_email: String,
    pub subject: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    /// Platform admin handling the ticket.
    pub assignee_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// One message in a ticket thread.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TicketMessage {
    pub id: String,
    pub ticket_id: String,
    pub author_id: String,
    pub author: MessageAuthor,
    pub body: String,
    /// Staff-only note, never shown to the requester.
    pub internal: bool,
    pub created_at: DateTime<Utc>,
}

/// Requester satisfaction rating, at most one per ticket.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TicketRating {
    pub id: String,
    pub ticket_id: String,
    /// 1 (worst) to 5 (best).
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
