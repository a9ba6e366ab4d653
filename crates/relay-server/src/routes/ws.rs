//! WebSocket board sync.
//!
//! Browsers cannot set headers on a WebSocket handshake, so the token and
//! organization come from the query string. Membership is checked again
//! before each event goes out and on a timer, so a removed member's socket
//! is closed.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use relay_core::entities::BoardEvent;
use relay_db::service::RelayService;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::error::ApiError;
use crate::extract::{OrgContext, Query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SyncParams {
    #[serde(default)]
    pub token: String,
    pub organization_id: Option<String>,
}

/// Server-to-client frame.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncFrame {
    BoardEvent(BoardEvent),
    /// Events were dropped; the client must refetch.
    Resync,
}

pub async fn board_sync(
    State(state): State<AppState>,
    Query(params): Query<SyncParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let identity = state.auth.authenticate(&params.token).await?;
    let ctx = OrgContext::resolve(&state, identity, params.organization_id.as_deref()).await?;
    let rx = state
        .service
        .feed()
        .subscribe()
        .ok_or(ApiError::Unavailable("board sync"))?;
    let subscriber = Subscriber {
        org_id: ctx.organization.id,
        user_id: ctx.identity.user_id,
    };
    tracing::debug!(org = %subscriber.org_id, user = %subscriber.user_id, "board sync connected");
    let service = state.service.clone();
    Ok(ws.on_upgrade(move |socket| forward(socket, rx, service, subscriber)))
}

/// Idle sockets re-check membership this often.
const MEMBERSHIP_RECHECK: Duration = Duration::from_secs(30);

/// The member a socket was opened for.
#[derive(Debug, Clone)]
struct Subscriber {
    org_id: String,
    user_id: String,
}

impl Subscriber {
    /// Lookup failures count as "no longer a member"; the client reconnects.
    async fn still_member(&self, service: &RelayService) -> bool {
        match service.find_member(&self.org_id, &self.user_id).await {
            Ok(member) => member.is_some(),
            Err(e) => {
                tracing::warn!(org = %self.org_id, error = %e, "board sync membership check failed");
                false
            }
        }
    }

    /// Gate a board event on current membership.
    async fn admit(&self, service: &RelayService, step: Step) -> Step {
        let is_event = matches!(step, Step::Send(SyncFrame::BoardEvent(_)));
        if is_event && !self.still_member(service).await {
            tracing::debug!(org = %self.org_id, user = %self.user_id, "board sync member removed");
            return Step::Stop;
        }
        step
    }
}

/// What to do with one item from the feed.
#[derive(Debug)]
enum Step {
    Send(SyncFrame),
    Skip,
    Stop,
}

fn step_for(event: Result<BoardEvent, RecvError>, org_id: &str) -> Step {
    match event {
        Ok(event) if event.organization_id == org_id => Step::Send(SyncFrame::BoardEvent(event)),
        Ok(_) => Step::Skip,
        Err(RecvError::Lagged(skipped)) => {
            tracing::debug!(org = %org_id, skipped, "board sync lagged");
            Step::Send(SyncFrame::Resync)
        }
        Err(RecvError::Closed) => Step::Stop,
    }
}

async fn forward(
    mut socket: WebSocket,
    mut rx: broadcast::Receiver<BoardEvent>,
    service: Arc<RelayService>,
    subscriber: Subscriber,
) {
    let mut recheck = tokio::time::interval(MEMBERSHIP_RECHECK);
    recheck.tick().await;
    loop {
        tokio::select! {
            event = rx.recv() => {
                let step = step_for(event, &subscriber.org_id);
                let frame = match subscriber.admit(&service, step).await {
                    Step::Send(frame) => frame,
                    Step::Skip => continue,
                    Step::Stop => break,
                };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "could not encode board event");
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = recheck.tick() => {
                if !subscriber.still_member(&service).await {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    let _ = socket.send(Message::Close(None)).await;
    tracing::debug!(org = %subscriber.org_id, "board sync disconnected");
}
