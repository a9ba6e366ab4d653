//! Status enums, roles, board kinds, entity types and actions for Relay.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and store the same string in SQL (`as_str()`). Status enums with a lifecycle
//! provide `allowed_next_states()` so transitions are checked in the service layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CoreError;
use crate::ids::{PREFIX_LEAD, PREFIX_LEAD_FIELD, PREFIX_REFERRAL, PREFIX_REFERRAL_FIELD};

// ---------------------------------------------------------------------------
// BoardKind
// ---------------------------------------------------------------------------

/// The two CRM boards every organization has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BoardKind {
    Leads,
    Referrals,
}

impl BoardKind {
    pub const ALL: &'static [Self] = &[Self::Leads, Self::Referrals];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leads => "leads",
            Self::Referrals => "referrals",
        }
    }

    /// Entity type of a row on this board.
    #[must_use]
    pub const fn record_entity(self) -> EntityType {
        match self {
            Self::Leads => EntityType::Lead,
            Self::Referrals => EntityType::Referral,
        }
    }

    /// Entity type of a column on this board.
    #[must_use]
    pub const fn field_entity(self) -> EntityType {
        match self {
            Self::Leads => EntityType::LeadField,
            Self::Referrals => EntityType::ReferralField,
        }
    }

    #[must_use]
    pub const fn record_prefix(self) -> &'static str {
        match self {
            Self::Leads => PREFIX_LEAD,
            Self::Referrals => PREFIX_REFERRAL,
        }
    }

    #[must_use]
    pub const fn field_prefix(self) -> &'static str {
        match self {
            Self::Leads => PREFIX_LEAD_FIELD,
            Self::Referrals => PREFIX_REFERRAL_FIELD,
        }
    }
}

impl fmt::Display for BoardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FieldType
// ---------------------------------------------------------------------------

/// Data type of an organization-defined custom field.
///
/// Values are always stored as TEXT; the type only governs validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Select,
    Checkbox,
    Email,
    Phone,
}

impl FieldType {
    pub const ALL: &'static [Self] = &[
        Self::Text,
        Self::Number,
        Self::Date,
        Self::Select,
        Self::Checkbox,
        Self::Email,
        Self::Phone,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Number => "Number",
            Self::Date => "Date",
            Self::Select => "Dropdown",
            Self::Checkbox => "Checkbox",
            Self::Email => "Email",
            Self::Phone => "Phone",
        }
    }

    /// Check that the raw value `v` fits this type.
    ///
    /// `options` is only consulted for [`FieldType::Select`].
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` with a human-readable reason when the
    /// value does not fit.
    pub fn validate(self, v: &str, options: &[String]) -> Result<(), CoreError> {
        self.check(v, options).map_err(CoreError::Validation)
    }

    fn check(self, v: &str, options: &[String]) -> Result<(), String> {
        match self {
            Self::Text => Ok(()),
            Self::Number => match v.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(()),
                _ => Err(format!("'{v}' is not a number")),
            },
            Self::Date => chrono::NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| format!("'{v}' is not a date (expected YYYY-MM-DD)")),
            Self::Select => {
                if options.iter().any(|o| o == v) {
                    Ok(())
                } else {
                    Err(format!("'{v}' is not one of: {}", options.join(", ")))
                }
            }
            Self::Checkbox => match v {
                "true" | "false" => Ok(()),
                _ => Err(format!("'{v}' must be 'true' or 'false'")),
            },
            Self::Email => {
                let valid = !v.chars().any(char::is_whitespace)
                    && v.split_once('@').is_some_and(|(local, domain)| {
                        !local.is_empty()
                            && !domain.contains('@')
                            && domain.contains('.')
                            && !domain.starts_with('.')
                            && !domain.ends_with('.')
                    });
                if valid {
                    Ok(())
                } else {
                    Err(format!("'{v}' is not an email address"))
                }
            }
            Self::Phone => {
                let allowed = v
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.'));
                let digits = v.chars().filter(char::is_ascii_digit).count();
                if allowed && (7..=15).contains(&digits) {
                    Ok(())
                } else {
                    Err(format!("'{v}' is not a phone number"))
                }
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MemberRole
// ---------------------------------------------------------------------------

/// Role of a member inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
    Liaison,
}

impl MemberRole {
    pub const ALL: &'static [Self] = &[Self::Owner, Self::Admin, Self::Member, Self::Liaison];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Liaison => "liaison",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Owner => "Owner",
            Self::Admin => "Admin",
            Self::Member => "Member",
            Self::Liaison => "Liaison",
        }
    }

    /// Columns, exports and billing.
    #[must_use]
    pub const fn can_manage_board(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    #[must_use]
    pub const fn can_manage_members(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    /// Every role can create, edit and delete board rows.
    #[must_use]
    pub const fn can_edit_records(self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Member | Self::Liaison)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TicketStatus
// ---------------------------------------------------------------------------

/// Status of a support ticket.
///
/// ```text
/// open → in_progress | waiting_on_customer | resolved | closed
/// in_progress → waiting_on_customer | resolved | closed
/// waiting_on_customer → in_progress | resolved | closed
/// resolved → open (reopen) | closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    WaitingOnCustomer,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: &'static [Self] = &[
        Self::Open,
        Self::InProgress,
        Self::WaitingOnCustomer,
        Self::Resolved,
        Self::Closed,
    ];

    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Open => &[
                Self::InProgress,
                Self::WaitingOnCustomer,
                Self::Resolved,
                Self::Closed,
            ],
            Self::InProgress => &[Self::WaitingOnCustomer, Self::Resolved, Self::Closed],
            Self::WaitingOnCustomer => &[Self::InProgress, Self::Resolved, Self::Closed],
            Self::Resolved => &[Self::Open, Self::Closed],
            Self::Closed => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` when `next` is not reachable
    /// from `self`.
    pub fn check_transition(self, ticket_id: &str, next: Self) -> Result<(), CoreError> {
        if self.can_transition_to(next) {
            return Ok(());
        }
        Err(CoreError::InvalidTransition {
            entity_type: EntityType::Ticket,
            id: ticket_id.to_string(),
            from: self.as_str().to_string(),
            to: next.as_str().to_string(),
        })
    }

    /// Resolved or closed tickets can be rated.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::WaitingOnCustomer => "waiting_on_customer",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In progress",
            Self::WaitingOnCustomer => "Waiting on customer",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TicketPriority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl TicketPriority {
    pub const ALL: &'static [Self] = &[Self::Low, Self::Normal, Self::High, Self::Urgent];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TicketCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Billing,
    Technical,
    Account,
    FeatureRequest,
    Other,
}

impl TicketCategory {
    pub const ALL: &'static [Self] = &[
        Self::Billing,
        Self::Technical,
        Self::Account,
        Self::FeatureRequest,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Billing => "billing",
            Self::Technical => "technical",
            Self::Account => "account",
            Self::FeatureRequest => "feature_request",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Billing => "Billing",
            Self::Technical => "Technical issue",
            Self::Account => "Account",
            Self::FeatureRequest => "Feature request",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MessageAuthor
// ---------------------------------------------------------------------------

/// Which side of the conversation wrote a ticket message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageAuthor {
    Customer,
    Staff,
}

impl MessageAuthor {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Staff => "staff",
        }
    }
}

impl fmt::Display for MessageAuthor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SubscriptionStatus
// ---------------------------------------------------------------------------

/// Stripe subscription status, mirrored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    /// Whether the organization may use the boards.
    #[must_use]
    pub const fn grants_access(self) -> bool {
        matches!(self, Self::Trialing | Self::Active)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EmailStatus
// ---------------------------------------------------------------------------

/// Delivery state of a queued email.
///
/// ```text
/// pending → sent
///         → pending (retry scheduled)
///         → failed (attempts exhausted)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

impl EmailStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Entity types referenced by the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Organization,
    Member,
    LeadField,
    ReferralField,
    Lead,
    Referral,
    Ticket,
    Message,
    Rating,
    Subscription,
}

impl EntityType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Member => "member",
            Self::LeadField => "lead_field",
            Self::ReferralField => "referral_field",
            Self::Lead => "lead",
            Self::Referral => "referral",
            Self::Ticket => "ticket",
            Self::Message => "message",
            Self::Rating => "rating",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActivityAction
// ---------------------------------------------------------------------------

/// Actions recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    Hidden,
    Restored,
    Reordered,
    Assigned,
    Rated,
    RoleChanged,
}

impl ActivityAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::StatusChanged => "status_changed",
            Self::Hidden => "hidden",
            Self::Restored => "restored",
            Self::Reordered => "reordered",
            Self::Assigned => "assigned",
            Self::Rated => "rated",
            Self::RoleChanged => "role_changed",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BoardAction / BoardTarget
// ---------------------------------------------------------------------------

/// Kind of row-level change pushed over board sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BoardAction {
    Created,
    Updated,
    Deleted,
}

/// Whether a board event concerns a row or a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BoardTarget {
    Record,
    Field,
}
