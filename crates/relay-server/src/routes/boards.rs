//! Lead and referral boards: columns, records, analytics, export and the
//! follow-up assistant.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use chrono::Utc;
use relay_core::entities::{BoardRecord, Field};
use relay_core::enums::BoardKind;
use relay_core::prompts;
use relay_core::requests::{
    CreateFieldRequest, CreateRecordRequest, RecordQuery, ReorderFieldsRequest, UpdateFieldRequest,
    UpdateRecordRequest,
};
use relay_core::responses::{AssistDraft, BoardSummary, BoardView};
use relay_db::repos::board::RecordFilter;
use relay_db::updates::field::FieldUpdate;
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{BoardAccess, Path, Payload, Query};
use crate::state::AppState;

/// Parse the `{board}` path segment.
pub(crate) fn board_kind(raw: &str) -> Result<BoardKind, ApiError> {
    BoardKind::ALL
        .iter()
        .copied()
        .find(|board| board.as_str() == raw)
        .ok_or_else(|| ApiError::not_found(format!("board '{raw}'")))
}

pub async fn view(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path(board): Path<String>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<BoardView>, ApiError> {
    let board = board_kind(&board)?;
    let filter = RecordFilter::from(query);
    Ok(Json(state.service.board_view(ctx.org_id(), board, &filter).await?))
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct FieldListQuery {
    #[serde(default)]
    pub include_hidden: bool,
}

pub async fn list_fields(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path(board): Path<String>,
    Query(query): Query<FieldListQuery>,
) -> Result<Json<Vec<Field>>, ApiError> {
    let board = board_kind(&board)?;
    // Hidden columns are a restore list for managers.
    let include_hidden = query.include_hidden && ctx.member.role.can_manage_board();
    Ok(Json(
        state
            .service
            .list_fields(ctx.org_id(), board, include_hidden)
            .await?,
    ))
}

pub async fn create_field(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path(board): Path<String>,
    Payload(req): Payload<CreateFieldRequest>,
) -> Result<(StatusCode, Json<Field>), ApiError> {
    ctx.require_manager()?;
    let board = board_kind(&board)?;
    let field = state
        .service
        .create_field(ctx.user_id(), ctx.org_id(), board, &req)
        .await?;
    Ok((StatusCode::CREATED, Json(field)))
}

pub async fn update_field(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path((board, field_id)): Path<(String, String)>,
    Payload(req): Payload<UpdateFieldRequest>,
) -> Result<Json<Field>, ApiError> {
    ctx.require_manager()?;
    let board = board_kind(&board)?;
    Ok(Json(
        state
            .service
            .update_field(ctx.user_id(), ctx.org_id(), board, &field_id, FieldUpdate::from(&req))
            .await?,
    ))
}

pub async fn hide_field(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path((board, field_id)): Path<(String, String)>,
) -> Result<Json<Field>, ApiError> {
    ctx.require_manager()?;
    let board = board_kind(&board)?;
    Ok(Json(
        state
            .service
            .hide_field(ctx.user_id(), ctx.org_id(), board, &field_id)
            .await?,
    ))
}

pub async fn restore_field(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path((board, field_id)): Path<(String, String)>,
) -> Result<Json<Field>, ApiError> {
    ctx.require_manager()?;
    let board = board_kind(&board)?;
    Ok(Json(
        state
            .service
            .restore_field(ctx.user_id(), ctx.org_id(), board, &field_id)
            .await?,
    ))
}

pub async fn reorder_fields(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path(board): Path<String>,
    Payload(req): Payload<ReorderFieldsRequest>,
) -> Result<Json<Vec<Field>>, ApiError> {
    ctx.require_manager()?;
    let board = board_kind(&board)?;
    Ok(Json(
        state
            .service
            .reorder_fields(ctx.user_id(), ctx.org_id(), board, &req.field_ids)
            .await?,
    ))
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

pub async fn list_records(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path(board): Path<String>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<BoardRecord>>, ApiError> {
    let board = board_kind(&board)?;
    let filter = RecordFilter::from(query);
    Ok(Json(state.service.list_records(ctx.org_id(), board, &filter).await?))
}

pub async fn create_record(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path(board): Path<String>,
    Payload(req): Payload<CreateRecordRequest>,
) -> Result<(StatusCode, Json<BoardRecord>), ApiError> {
    ctx.require_editor()?;
    let board = board_kind(&board)?;
    let record = state
        .service
        .create_record(ctx.user_id(), ctx.org_id(), board, &req)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_record(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path((board, record_id)): Path<(String, String)>,
) -> Result<Json<BoardRecord>, ApiError> {
    let board = board_kind(&board)?;
    Ok(Json(state.service.get_record(ctx.org_id(), board, &record_id).await?))
}

pub async fn update_record(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path((board, record_id)): Path<(String, String)>,
    Payload(req): Payload<UpdateRecordRequest>,
) -> Result<Json<BoardRecord>, ApiError> {
    ctx.require_editor()?;
    let board = board_kind(&board)?;
    Ok(Json(
        state
            .service
            .update_record(ctx.user_id(), ctx.org_id(), board, &record_id, &req)
            .await?,
    ))
}

pub async fn delete_record(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path((board, record_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    ctx.require_editor()?;
    let board = board_kind(&board)?;
    state
        .service
        .delete_record(ctx.user_id(), ctx.org_id(), board, &record_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assist(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path((board, record_id)): Path<(String, String)>,
) -> Result<Json<AssistDraft>, ApiError> {
    let client = state.assist.as_ref().ok_or(ApiError::Unavailable("AI assistant"))?;
    let board = board_kind(&board)?;
    let record = state.service.get_record(ctx.org_id(), board, &record_id).await?;
    let fields = state.service.list_fields(ctx.org_id(), board, false).await?;
    let liaison_name = match record.liaison_id.as_deref() {
        Some(id) => state
            .service
            .get_member(ctx.org_id(), id)
            .await
            .ok()
            .map(|m| m.name.unwrap_or(m.email)),
        None => None,
    };
    let prompt = prompts::follow_up(&ctx.organization.name, &fields, &record, liaison_name.as_deref());
    let draft = client.draft(&prompt).await?;
    tracing::debug!(record = %record.id, model = %draft.model, "follow-up drafted");
    Ok(Json(draft))
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

pub async fn analytics(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path(board): Path<String>,
) -> Result<Json<BoardSummary>, ApiError> {
    let board = board_kind(&board)?;
    Ok(Json(
        state
            .service
            .board_summary(ctx.org_id(), board, Utc::now())
            .await?,
    ))
}

pub async fn export(
    State(state): State<AppState>,
    BoardAccess(ctx): BoardAccess,
    Path(board): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.require_manager()?;
    let board = board_kind(&board)?;
    let csv = state.service.export_board_csv(ctx.org_id(), board).await?;
    let filename = format!(
        "{}-{board}-{}.csv",
        ctx.organization.slug,
        Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        csv,
    ))
}
