//! Request bodies and query strings accepted by the HTTP API.
//!
//! Body types implement [`RequestPayload`]; the `SCHEMA` name is the key under
//! which `relay-schema` registers the type's JSON Schema, so a body can be
//! validated before it is deserialized. Length and range limits are declared
//! with `schemars` attributes and end up in that schema.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::enums::{
    ActivityAction, EntityType, FieldType, MemberRole, TicketCategory, TicketPriority,
    TicketStatus,
};

/// A JSON request body with a registered schema.
pub trait RequestPayload: DeserializeOwned {
    const SCHEMA: &'static str;
}

macro_rules! payload {
    ($ty:ty, $name:literal) => {
        impl RequestPayload for $ty {
            const SCHEMA: &'static str = $name;
        }
    };
}

// ---------------------------------------------------------------------------
// Organizations and members
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CreateOrganizationRequest {
    #[schemars(length(min = 1, max = 120))]
    pub name: String,
    #[serde(default)]
    pub clerk_org_id: Option<String>,
    #[schemars(email)]
    pub owner_email: String,
    #[serde(default)]
    pub owner_name: Option<String>,
}
payload!(CreateOrganizationRequest, "create_organization");

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UpdateOrganizationRequest {
    #[schemars(length(min = 1, max = 120))]
    pub name: String,
}
payload!(UpdateOrganizationRequest, "update_organization");

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AddMemberRequest {
    #[schemars(length(min = 1, max = 200))]
    pub user_id: String,
    #[schemars(email)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: MemberRole,
}
payload!(AddMemberRequest, "add_member");

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UpdateMemberRequest {
    pub role: MemberRole,
}
payload!(UpdateMemberRequest, "update_member");

// ---------------------------------------------------------------------------
// Board columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CreateFieldRequest {
    #[schemars(length(min = 1, max = 80))]
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
}
payload!(CreateFieldRequest, "create_field");

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UpdateFieldRequest {
    #[serde(default)]
    #[schemars(length(min = 1, max = 80))]
    pub name: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub required: Option<bool>,
}
payload!(UpdateFieldRequest, "update_field");

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReorderFieldsRequest {
    #[schemars(length(min = 1))]
    pub field_ids: Vec<String>,
}
payload!(ReorderFieldsRequest, "reorder_fields");

// ---------------------------------------------------------------------------
// Board records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CreateRecordRequest {
    /// Field ID to raw value.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default)]
    pub liaison_id: Option<String>,
    #[serde(default)]
    pub lead_id: Option<String>,
}
payload!(CreateRecordRequest, "create_record");

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UpdateRecordRequest {
    /// Field ID to raw value; an empty string clears the value.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    /// Referrals only; an empty string clears the liaison.
    #[serde(default)]
    pub liaison_id: Option<String>,
}
payload!(UpdateRecordRequest, "update_record");

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct RecordQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub liaison_id: Option<String>,
    /// Case-insensitive substring match over all visible values.
    pub q: Option<String>,
}

// ---------------------------------------------------------------------------
// Support
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CreateTicketRequest {
    #[schemars(length(min = 3, max = 200))]
    pub subject: String,
    pub category: TicketCategory,
    #[serde(default)]
    pub priority: TicketPriority,
    /// Where replies are sent.
    #[schemars(email)]
    pub email: String,
    #[schemars(length(min = 1, max = 10000))]
    pub message: String,
}
payload!(CreateTicketRequest, "create_ticket");

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PostMessageRequest {
    #[schemars(length(min = 1, max = 10000))]
    pub body: String,
    /// Staff-only note. Ignored for requester replies.
    #[serde(default)]
    pub internal: bool,
}
payload!(PostMessageRequest, "post_message");

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RateTicketRequest {
    #[schemars(range(min = 1, max = 5))]
    pub rating: u8,
    #[serde(default)]
    #[schemars(length(max = 2000))]
    pub comment: Option<String>,
}
payload!(RateTicketRequest, "rate_ticket");

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AdminTicketUpdateRequest {
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub priority: Option<TicketPriority>,
    /// An empty string unassigns.
    #[serde(default)]
    pub assignee_id: Option<String>,
}
payload!(AdminTicketUpdateRequest, "admin_ticket_update");

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assignee_id: Option<String>,
    pub organization_id: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ActivityQuery {
    pub organization_id: Option<String>,
    pub actor_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub action: Option<ActivityAction>,
    pub limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// Billing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Overrides the configured default price.
    #[serde(default)]
    pub price_id: Option<String>,
}
payload!(CheckoutRequest, "checkout");
