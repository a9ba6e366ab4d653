//! Subscription status, Stripe Checkout and the Stripe webhook.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use relay_core::entities::Subscription;
use relay_core::requests::CheckoutRequest;
use relay_core::responses::CheckoutSession;

use crate::error::ApiError;
use crate::extract::{OrgContext, Payload};
use crate::state::AppState;
use crate::stripe::{
    self, CheckoutParams, SIGNATURE_HEADER, StripeEvent, SubscriptionChange, WebhookError,
};

pub async fn subscription(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> Result<Json<Subscription>, ApiError> {
    Ok(Json(state.service.get_subscription(ctx.org_id()).await?))
}

pub async fn checkout(
    State(state): State<AppState>,
    ctx: OrgContext,
    Payload(req): Payload<CheckoutRequest>,
) -> Result<Json<CheckoutSession>, ApiError> {
    ctx.require_manager()?;
    let client = state.stripe.as_ref().ok_or(ApiError::Unavailable("billing"))?;

    let existing = match state.service.get_subscription(ctx.org_id()).await {
        Ok(sub) => Some(sub),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };
    let price_id = req
        .price_id
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or(&state.config.stripe.price_id);

    let params = CheckoutParams {
        organization_id: ctx.org_id(),
        price_id,
        customer_id: existing.as_ref().and_then(|s| s.stripe_customer_id.as_deref()),
        customer_email: Some(ctx.member.email.as_str()),
        success_url: format!("{}/billing?checkout=success", state.app_url()),
        cancel_url: format!("{}/billing?checkout=cancel", state.app_url()),
    };
    let session = client.create_checkout_session(&params).await?;
    tracing::info!(org = %ctx.org_id(), price = price_id, "checkout session created");
    Ok(Json(session))
}

/// Stripe webhook endpoint. Unknown events and events for unknown
/// organizations are acknowledged so Stripe stops retrying them.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config = &state.config.stripe;
    if !config.webhooks_enabled() {
        return Err(ApiError::Unavailable("stripe webhooks"));
    }
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;
    stripe::verify_signature(
        signature,
        &body,
        &config.webhook_secret,
        config.webhook_tolerance_secs,
        Utc::now().timestamp(),
    )?;

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| WebhookError::Payload(e.to_string()))?;
    let received = Json(serde_json::json!({ "received": true }));

    let Some(change) = stripe::subscription_change(&event)? else {
        tracing::debug!(event = %event.id, kind = %event.event_type, "stripe event ignored");
        return Ok(received);
    };
    let Some(org_id) = organization_for(&state, &change).await? else {
        tracing::warn!(event = %event.id, customer = ?change.customer_id, "stripe event for unknown organization");
        return Ok(received);
    };

    match state.service.upsert_subscription(&org_id, &change.upsert).await {
        Ok(sub) => {
            tracing::info!(org = %org_id, status = %sub.status, event = %event.id, "subscription updated");
        }
        Err(e) if e.is_not_found() => {
            tracing::warn!(org = %org_id, event = %event.id, "stripe event for deleted organization");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(received)
}

async fn organization_for(
    state: &AppState,
    change: &SubscriptionChange,
) -> Result<Option<String>, ApiError> {
    if let Some(org) = &change.organization_id {
        return Ok(Some(org.clone()));
    }
    let Some(customer) = change.customer_id.as_deref() else {
        return Ok(None);
    };
    Ok(state
        .service
        .find_subscription_by_customer(customer)
        .await?
        .map(|sub| sub.organization_id))
}
