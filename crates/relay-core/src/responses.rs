//! Response bodies that are not plain entities.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{BoardRecord, Field, Member, Organization, SupportTicket, TicketMessage, TicketRating};
use crate::enums::BoardKind;

/// Everything the board page needs in one request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct BoardView {
    pub board: BoardKind,
    /// Visible columns in display order.
    pub fields: Vec<Field>,
    pub records: Vec<BoardRecord>,
    pub total: u64,
}

/// Response from `POST /api/organizations`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OrganizationCreated {
    pub organization: Organization,
    pub owner: Member,
}

/// A ticket with its (possibly filtered) messages and rating.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TicketThread {
    pub ticket: SupportTicket,
    pub messages: Vec<TicketMessage>,
    pub rating: Option<TicketRating>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MonthCount {
    /// `YYYY-MM`.
    pub month: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct LiaisonCount {
    pub liaison_id: Option<String>,
    pub name: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OptionCount {
    pub value: String,
    pub count: u64,
}

/// Counts per option of one `select` column.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FieldBreakdown {
    pub field_id: String,
    pub name: String,
    pub counts: Vec<OptionCount>,
}

/// Analytics for one board of one organization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct BoardSummary {
    pub board: BoardKind,
    pub total: u64,
    pub last_30_days: u64,
    /// Last 12 months, oldest first, months without records included.
    pub by_month: Vec<MonthCount>,
    /// Referrals only; empty for leads.
    pub by_liaison: Vec<LiaisonCount>,
    pub by_field: Vec<FieldBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RatingSummary {
    pub count: u64,
    /// `None` when there are no ratings.
    pub average: Option<f64>,
    /// Index 0 holds the number of 1-star ratings.
    pub distribution: [u64; 5],
}

/// One entry of an `/api/options/*` dropdown.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OptionItem {
    pub value: String,
    pub label: String,
}

impl OptionItem {
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Text drafted by the AI assistant.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AssistDraft {
    pub draft: String,
    pub model: String,
}

/// Response from `POST /api/billing/checkout`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CheckoutSession {
    pub url: String,
}
