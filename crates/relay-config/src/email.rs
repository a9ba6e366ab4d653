//! Transactional email configuration.

use serde::{Deserialize, Serialize};

fn default_api_url() -> String {
    "https://api.resend.com/emails".into()
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_base_delay_secs() -> u64 {
    30
}

const fn default_max_delay_secs() -> u64 {
    3600
}

const fn default_poll_interval_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    /// Provider endpoint that accepts `{from, to, subject, text}`.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Sender address, e.g. `Relay <support@relay.example>`.
    #[serde(default)]
    pub from: String,

    /// Where new-ticket notifications go.
    #[serde(default)]
    pub support_inbox: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,

    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            from: String::new(),
            support_inbox: String::new(),
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl EmailConfig {
    /// Without an API key and sender, emails are logged instead of sent.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.from.is_empty()
    }
}
