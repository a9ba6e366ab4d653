use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{BoardAction, BoardKind, BoardTarget};

/// A row-level change notification pushed to board sync subscribers.
///
/// `data` carries the new row (record or field) for creates and updates and
/// is `None` for deletes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct BoardEvent {
    pub organization_id: String,
    pub board: BoardKind,
    pub target: BoardTarget,
    pub action: BoardAction,
    pub id: String,
    pub data: Option<serde_json::Value>,
}
