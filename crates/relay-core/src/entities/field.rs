use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{BoardKind, FieldType};

/// An organization-defined column on the lead or referral board.
///
/// Deleting a column only sets `hidden`; its values stay in the database and
/// reappear if the column is restored.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Field {
    pub id: String,
    pub organization_id: String,
    pub board: BoardKind,
    pub name: String,
    pub field_type: FieldType,
    /// Allowed values for `select` fields, empty otherwise.
    pub options: Vec<String>,
    pub position: i64,
    pub required: bool,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
