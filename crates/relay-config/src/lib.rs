//! # relay-config
//!
//! Layered configuration loading for Relay using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`RELAY_*` prefix, `__` as separator)
//! 2. An explicit file passed with `--config`
//! 3. Project-level `./relay.toml`
//! 4. User-level `~/.config/relay/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `RELAY_STRIPE__WEBHOOK_SECRET` -> `stripe.webhook_secret`,
//! `RELAY_ADMIN__USER_IDS=[user_a,user_b]` -> `admin.user_ids`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use relay_config::RelayConfig;
//!
//! let config = RelayConfig::load_with_dotenv(None).expect("config");
//! if config.stripe.is_configured() {
//!     println!("billing enabled with price {}", config.stripe.price_id);
//! }
//! ```

mod admin;
mod ai;
mod clerk;
mod database;
mod email;
mod error;
mod general;
mod server;
mod stripe;

pub use admin::AdminConfig;
pub use ai::AiConfig;
pub use clerk::ClerkConfig;
pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use server::ServerConfig;
pub use stripe::StripeConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "RELAY_";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub clerk: ClerkConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl RelayConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] when a source cannot be parsed and
    /// [`ConfigError::InvalidValue`] when the merged values are inconsistent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(explicit).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration after reading `.env` from the current directory.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load(explicit)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    #[must_use]
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from("relay.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file_exact(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Reject combinations no component can work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.default_limit == 0 {
            return Err(invalid("general.default_limit", "must be at least 1"));
        }
        if self.general.max_limit < self.general.default_limit {
            return Err(invalid(
                "general.max_limit",
                "must not be smaller than general.default_limit",
            ));
        }
        if self.email.max_attempts == 0 {
            return Err(invalid("email.max_attempts", "must be at least 1"));
        }
        if self.email.max_delay_secs < self.email.base_delay_secs {
            return Err(invalid(
                "email.max_delay_secs",
                "must not be smaller than email.base_delay_secs",
            ));
        }
        if self.email.poll_interval_secs == 0 {
            return Err(invalid("email.poll_interval_secs", "must be at least 1"));
        }
        Ok(())
    }

    /// Fail with [`ConfigError::NotConfigured`] unless `configured` holds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] for `section`.
    pub fn require(section: &str, configured: bool) -> Result<(), ConfigError> {
        if configured {
            Ok(())
        } else {
            Err(ConfigError::NotConfigured {
                section: section.to_string(),
            })
        }
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("relay").join("config.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
