//! Integration tests for TOML configuration loading.
//!
//! Uses `figment::Jail` for sandboxed files and env vars.

use figment::Jail;
use pretty_assertions::assert_eq;
use relay_config::{ConfigError, RelayConfig};

#[test]
fn project_file_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "relay.toml",
            r#"
[server]
port = 9090
cors_origins = ["https://app.relay.example"]

[stripe]
secret_key = "sk_test_abc"
price_id = "price_123"
trial_days = 30

[admin]
user_ids = ["user_ops"]
"#,
        )?;

        let config = RelayConfig::load(None).expect("config loads");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.cors_origins, vec!["https://app.relay.example".to_string()]);
        assert!(config.stripe.is_configured());
        assert_eq!(config.stripe.trial_days, 30);
        assert_eq!(config.stripe.webhook_tolerance_secs, 300);
        assert!(config.admin.is_admin("user_ops"));
        Ok(())
    });
}

#[test]
fn explicit_file_beats_project_file() {
    Jail::expect_with(|jail| {
        jail.create_file("relay.toml", "[database]\npath = \"project.db\"\n")?;
        jail.create_file("prod.toml", "[database]\npath = \"prod.db\"\n")?;

        let config = RelayConfig::load(Some(std::path::Path::new("prod.toml"))).expect("config loads");
        assert_eq!(config.database.path, "prod.db");
        Ok(())
    });
}

#[test]
fn missing_explicit_file_is_an_error() {
    Jail::expect_with(|_jail| {
        let result = RelayConfig::load(Some(std::path::Path::new("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Figment(_))));
        Ok(())
    });
}

#[test]
fn inconsistent_email_backoff_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("relay.toml", "[email]\nbase_delay_secs = 600\nmax_delay_secs = 60\n")?;

        let result = RelayConfig::load(None);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        Ok(())
    });
}
