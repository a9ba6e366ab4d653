//! Dropdown sources for the frontend.

use axum::Json;
use axum::extract::State;
use relay_core::enums::{FieldType, MemberRole, TicketCategory, TicketPriority, TicketStatus};
use relay_core::responses::OptionItem;

use super::boards::board_kind;
use crate::error::ApiError;
use crate::extract::{CurrentUser, OrgContext, Path};
use crate::state::AppState;

/// Static option lists by name, `None` for an unknown name.
#[must_use]
pub fn static_options(kind: &str) -> Option<Vec<OptionItem>> {
    let items = match kind {
        "field-types" => FieldType::ALL
            .iter()
            .map(|t| OptionItem::new(t.as_str(), t.label()))
            .collect(),
        "roles" => MemberRole::ALL
            .iter()
            .map(|r| OptionItem::new(r.as_str(), r.label()))
            .collect(),
        "ticket-categories" => TicketCategory::ALL
            .iter()
            .map(|c| OptionItem::new(c.as_str(), c.label()))
            .collect(),
        "ticket-priorities" => TicketPriority::ALL
            .iter()
            .map(|p| OptionItem::new(p.as_str(), p.label()))
            .collect(),
        "ticket-statuses" => TicketStatus::ALL
            .iter()
            .map(|s| OptionItem::new(s.as_str(), s.label()))
            .collect(),
        _ => return None,
    };
    Some(items)
}

pub async fn by_kind(
    _user: CurrentUser,
    Path(kind): Path<String>,
) -> Result<Json<Vec<OptionItem>>, ApiError> {
    static_options(&kind)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("option list '{kind}'")))
}

pub async fn liaisons(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> Result<Json<Vec<OptionItem>>, ApiError> {
    let liaisons = state.service.list_liaisons(ctx.org_id()).await?;
    Ok(Json(
        liaisons
            .into_iter()
            .map(|m| {
                let label = m.name.unwrap_or_else(|| m.email.clone());
                OptionItem::new(m.id, label)
            })
            .collect(),
    ))
}

/// Options of a `select` column; empty for other types.
pub async fn field_options(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path((board, field_id)): Path<(String, String)>,
) -> Result<Json<Vec<OptionItem>>, ApiError> {
    let board = board_kind(&board)?;
    let field = state.service.get_field(ctx.org_id(), board, &field_id).await?;
    Ok(Json(
        field
            .options
            .iter()
            .map(|o| OptionItem::new(o.clone(), o.clone()))
            .collect(),
    ))
}
