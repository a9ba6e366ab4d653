//! Subscription state pushed by billing webhooks.

use chrono::{DateTime, Utc};
use relay_core::enums::SubscriptionStatus;
use serde::Serialize;

/// The full Stripe-side state of a subscription. Absent IDs keep the stored value.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionUpsert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    pub status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
}

impl SubscriptionUpsert {
    #[must_use]
    pub const fn new(status: SubscriptionStatus) -> Self {
        Self {
            stripe_customer_id: None,
            stripe_subscription_id: None,
            plan: None,
            status,
            current_period_end: None,
        }
    }

    #[must_use]
    pub fn customer(mut self, id: impl Into<String>) -> Self {
        self.stripe_customer_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn subscription(mut self, id: impl Into<String>) -> Self {
        self.stripe_subscription_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    #[must_use]
    pub const fn period_end(mut self, end: DateTime<Utc>) -> Self {
        self.current_period_end = Some(end);
        self
    }
}
