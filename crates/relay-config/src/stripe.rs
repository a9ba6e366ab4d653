//! Stripe billing configuration.

use serde::{Deserialize, Serialize};

const fn default_trial_days() -> u32 {
    14
}

const fn default_webhook_tolerance_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeConfig {
    #[serde(default)]
    pub secret_key: String,

    /// Signing secret of the webhook endpoint (`whsec_...`).
    #[serde(default)]
    pub webhook_secret: String,

    /// Default price for checkout sessions.
    #[serde(default)]
    pub price_id: String,

    /// Length of the trial granted to new organizations.
    #[serde(default = "default_trial_days")]
    pub trial_days: u32,

    /// Maximum age of a webhook signature timestamp.
    #[serde(default = "default_webhook_tolerance_secs")]
    pub webhook_tolerance_secs: u64,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            webhook_secret: String::new(),
            price_id: String::new(),
            trial_days: default_trial_days(),
            webhook_tolerance_secs: default_webhook_tolerance_secs(),
        }
    }
}

impl StripeConfig {
    /// Checkout needs the API key and a price.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_empty() && !self.price_id.is_empty()
    }

    #[must_use]
    pub fn webhooks_enabled(&self) -> bool {
        !self.webhook_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StripeConfig::default();
        assert!(!config.is_configured());
        assert!(!config.webhooks_enabled());
        assert_eq!(config.trial_days, 14);
        assert_eq!(config.webhook_tolerance_secs, 300);
    }

    #[test]
    fn checkout_needs_price() {
        let config = StripeConfig {
            secret_key: "sk_test_1".into(),
            ..Default::default()
        };
        assert!(!config.is_configured());
    }
}
