//! Stripe billing: webhook signature verification, subscription events and
//! Checkout sessions.
//!
//! Only the handful of fields Relay stores are read from Stripe objects, so
//! events are decoded from `serde_json::Value` rather than full models.

use chrono::DateTime;
use hmac::{Hmac, Mac};
use relay_config::StripeConfig;
use relay_core::enums::SubscriptionStatus;
use relay_core::responses::CheckoutSession;
use relay_db::updates::subscription::SubscriptionUpsert;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing Stripe-Signature header")]
    MissingSignature,

    #[error("malformed Stripe-Signature header")]
    MalformedSignature,

    #[error("signature timestamp outside the tolerance window")]
    StaleTimestamp,

    #[error("no matching v1 signature")]
    SignatureMismatch,

    #[error("unexpected event payload: {0}")]
    Payload(String),
}

impl From<WebhookError> for ApiError {
    fn from(e: WebhookError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::MalformedSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex `v1` signature Stripe would send for `payload` at `timestamp`.
///
/// # Errors
///
/// Never fails for a real secret; HMAC accepts keys of any length.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
    Ok(hex::encode(mac_for(secret, timestamp, payload)?.finalize().into_bytes()))
}

/// Check a `Stripe-Signature: t=<ts>,v1=<hex>[,v1=...]` header against the raw
/// body. Returns the signed timestamp.
///
/// # Errors
///
/// Returns the `WebhookError` describing why the signature was rejected.
pub fn verify_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    tolerance_secs: u64,
    now: i64,
) -> Result<i64, WebhookError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedSignature)?,
                );
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
    if candidates.is_empty() {
        return Err(WebhookError::MalformedSignature);
    }
    if now.abs_diff(timestamp) > tolerance_secs {
        return Err(WebhookError::StaleTimestamp);
    }

    let expected = mac_for(secret, timestamp, payload)?.finalize().into_bytes();
    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|given| {
            given.len() == expected.len() && bool::from(given.as_slice().ct_eq(expected.as_slice()))
        })
    });
    if matched {
        Ok(timestamp)
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// A `customer.subscription.*` event reduced to what Relay stores.
#[derive(Debug, Clone)]
pub struct SubscriptionChange {
    /// From `metadata.organization_id`, set when Relay created the checkout.
    pub organization_id: Option<String>,
    pub customer_id: Option<String>,
    pub upsert: SubscriptionUpsert,
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Decode a subscription event. `Ok(None)` for every other event type.
///
/// # Errors
///
/// Returns `WebhookError::Payload` if a subscription object lacks its
/// status or carries one Relay does not know.
pub fn subscription_change(event: &StripeEvent) -> Result<Option<SubscriptionChange>, WebhookError> {
    if !event.event_type.starts_with("customer.subscription.") {
        return Ok(None);
    }
    let object = &event.data.object;

    let status = if event.event_type == "customer.subscription.deleted" {
        SubscriptionStatus::Canceled
    } else {
        let raw = str_at(object, "/status")
            .ok_or_else(|| WebhookError::Payload("subscription without status".into()))?;
        serde_json::from_value(Value::String(raw.to_string()))
            .map_err(|_| WebhookError::Payload(format!("unknown subscription status '{raw}'")))?
    };

    // Expanded customers arrive as objects.
    let customer_id = str_at(object, "/customer")
        .or_else(|| str_at(object, "/customer/id"))
        .map(str::to_string);

    let mut upsert = SubscriptionUpsert::new(status);
    if let Some(customer) = &customer_id {
        upsert = upsert.customer(customer.clone());
    }
    if let Some(id) = str_at(object, "/id") {
        upsert = upsert.subscription(id);
    }
    if let Some(price) = str_at(object, "/items/data/0/price/id") {
        upsert = upsert.plan(price);
    }
    // Newer API versions moved the period onto the subscription item.
    let period_end = object
        .pointer("/current_period_end")
        .or_else(|| object.pointer("/items/data/0/current_period_end"))
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0));
    if let Some(end) = period_end {
        upsert = upsert.period_end(end);
    }

    Ok(Some(SubscriptionChange {
        organization_id: str_at(object, "/metadata/organization_id").map(str::to_string),
        customer_id,
        upsert,
    }))
}

/// Parameters of a subscription Checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutParams<'a> {
    pub organization_id: &'a str,
    pub price_id: &'a str,
    /// Reuse the organization's existing Stripe customer.
    pub customer_id: Option<&'a str>,
    pub customer_email: Option<&'a str>,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutParams<'_> {
    fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", self.price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("client_reference_id", self.organization_id.to_string()),
            ("metadata[organization_id]", self.organization_id.to_string()),
            (
                "subscription_data[metadata][organization_id]",
                self.organization_id.to_string(),
            ),
        ];
        match (self.customer_id, self.customer_email) {
            (Some(customer), _) => form.push(("customer", customer.to_string())),
            (None, Some(email)) => form.push(("customer_email", email.to_string())),
            (None, None) => {}
        }
        form
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeClient {
    /// `None` unless a secret key and default price are configured.
    #[must_use]
    pub fn from_config(config: &StripeConfig) -> Option<Self> {
        config
            .is_configured()
            .then(|| Self::with_base_url(&config.secret_key, STRIPE_API_BASE))
    }

    #[must_use]
    pub fn with_base_url(secret_key: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a hosted Checkout session and return its URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Upstream` if Stripe rejects the request.
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutParams<'_>,
    ) -> Result<CheckoutSession, ApiError> {
        let resp = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&params.form())
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("stripe checkout: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("stripe checkout: HTTP {status}: {body}")));
        }
        let session: SessionResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("stripe checkout response: {e}")))?;
        let url = session
            .url
            .ok_or_else(|| ApiError::Upstream("stripe checkout session has no url".into()))?;
        Ok(CheckoutSession { url })
    }
}
