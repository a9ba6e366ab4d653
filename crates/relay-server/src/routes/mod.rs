//! Route table.

pub mod admin;
pub mod billing;
pub mod boards;
pub mod options;
pub mod organizations;
pub mod support;
pub mod ws;

use axum::Json;
use axum::Router;
use axum::routing::{get, patch, post, put};

use crate::state::AppState;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// All `/api` routes, without middleware.
pub fn api() -> Router<AppState> {
    let organizations = Router::new()
        .route("/", get(organizations::list_mine).post(organizations::create))
        .route("/current", get(organizations::current).patch(organizations::rename))
        .route(
            "/current/members",
            get(organizations::list_members).post(organizations::add_member),
        )
        .route(
            "/current/members/{id}",
            patch(organizations::update_member).delete(organizations::remove_member),
        );

    let boards = Router::new()
        .route("/ws", get(ws::board_sync))
        .route("/{board}", get(boards::view))
        .route("/{board}/fields", get(boards::list_fields).post(boards::create_field))
        .route("/{board}/fields/order", put(boards::reorder_fields))
        .route(
            "/{board}/fields/{id}",
            patch(boards::update_field).delete(boards::hide_field),
        )
        .route("/{board}/fields/{id}/restore", post(boards::restore_field))
        .route("/{board}/records", get(boards::list_records).post(boards::create_record))
        .route(
            "/{board}/records/{id}",
            get(boards::get_record)
                .patch(boards::update_record)
                .delete(boards::delete_record),
        )
        .route("/{board}/records/{id}/assist", post(boards::assist))
        .route("/{board}/analytics", get(boards::analytics))
        .route("/{board}/export", get(boards::export));

    let support = Router::new()
        .route("/tickets", get(support::list_mine).post(support::open))
        .route("/tickets/{id}", get(support::thread))
        .route("/tickets/{id}/messages", post(support::reply))
        .route("/tickets/{id}/close", post(support::close))
        .route("/tickets/{id}/rating", post(support::rate));

    let admin = Router::new()
        .route("/tickets", get(admin::list_tickets))
        .route("/tickets/{id}", get(admin::ticket).patch(admin::update_ticket))
        .route("/tickets/{id}/messages", post(admin::post_message))
        .route("/tickets/{id}/assist", post(admin::assist))
        .route("/organizations", get(admin::organizations))
        .route("/activity", get(admin::activity))
        .route("/ratings", get(admin::ratings))
        .route("/emails", get(admin::emails));

    let options = Router::new()
        .route("/liaisons", get(options::liaisons))
        .route("/fields/{board}/{id}", get(options::field_options))
        .route("/{kind}", get(options::by_kind));

    let billing = Router::new()
        .route("/subscription", get(billing::subscription))
        .route("/checkout", post(billing::checkout))
        .route("/webhook", post(billing::webhook));

    Router::new()
        .nest("/organizations", organizations)
        .nest("/boards", boards)
        .nest("/support", support)
        .nest("/user/admin", admin)
        .nest("/options", options)
        .nest("/billing", billing)
}

/// `/health` plus the API under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health)).nest("/api", api())
}
