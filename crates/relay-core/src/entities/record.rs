use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::BoardKind;

/// A lead or a referral together with its custom-field values.
///
/// `values` maps field ID to the stored text value and only contains
/// visible fields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct BoardRecord {
    pub id: String,
    pub board: BoardKind,
    pub organization_id: String,
    /// Referrals only: the liaison member credited with the referral.
    pub liaison_id: Option<String>,
    /// Referrals only: the lead this referral converted from.
    pub lead_id: Option<String>,
    pub created_by: String,
    pub values: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One stored cell: the value of a field for a record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FieldValue {
    pub record_id: String,
    pub field_id: String,
    pub value: String,
}
