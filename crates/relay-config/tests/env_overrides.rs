use figment::Jail;
use pretty_assertions::assert_eq;
use relay_config::RelayConfig;

#[test]
fn env_vars_map_to_nested_sections() {
    Jail::expect_with(|jail| {
        jail.set_env("RELAY_STRIPE__WEBHOOK_SECRET", "whsec_env");
        jail.set_env("RELAY_EMAIL__MAX_ATTEMPTS", "3");
        jail.set_env("RELAY_DATABASE__URL", "libsql://relay.turso.io");
        jail.set_env("RELAY_DATABASE__AUTH_TOKEN", "tok");

        let config = RelayConfig::load(None).expect("config loads");
        assert_eq!(config.stripe.webhook_secret, "whsec_env");
        assert_eq!(config.email.max_attempts, 3);
        assert!(config.database.is_remote());
        Ok(())
    });
}

#[test]
fn env_beats_project_file() {
    Jail::expect_with(|jail| {
        jail.create_file("relay.toml", "[ai]\nmodel = \"from-file\"\napi_key = \"k\"\n")?;
        jail.set_env("RELAY_AI__MODEL", "from-env");

        let config = RelayConfig::load(None).expect("config loads");
        assert_eq!(config.ai.model, "from-env");
        assert!(config.ai.is_configured());
        Ok(())
    });
}

#[test]
fn env_list_syntax_sets_admins() {
    Jail::expect_with(|jail| {
        jail.set_env("RELAY_ADMIN__USER_IDS", "[user_a, user_b]");

        let config = RelayConfig::load(None).expect("config loads");
        assert_eq!(config.admin.user_ids, vec!["user_a".to_string(), "user_b".to_string()]);
        Ok(())
    });
}
