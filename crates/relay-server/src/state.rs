//! Shared application state handed to every handler.

use std::sync::Arc;

use relay_auth::Authenticator;
use relay_auth::clerk_api::ClerkApi;
use relay_config::RelayConfig;
use relay_db::service::RelayService;
use relay_schema::SchemaRegistry;

use crate::assist::AssistClient;
use crate::stripe::StripeClient;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RelayService>,
    pub config: Arc<RelayConfig>,
    pub auth: Arc<Authenticator>,
    pub schemas: Arc<SchemaRegistry>,
    /// Present when Clerk is configured.
    pub clerk: Option<ClerkApi>,
    pub assist: Option<AssistClient>,
    pub stripe: Option<StripeClient>,
}

impl AppState {
    /// Build the state, enabling each integration whose credentials are set.
    #[must_use]
    pub fn new(config: RelayConfig, service: Arc<RelayService>) -> Self {
        let clerk = config
            .clerk
            .is_configured()
            .then(|| ClerkApi::new(config.clerk.secret_key.clone()));
        let assist = AssistClient::from_config(&config.ai);
        let stripe = StripeClient::from_config(&config.stripe);
        tracing::info!(
            clerk = clerk.is_some(),
            assist = assist.is_some(),
            billing = stripe.is_some(),
            webhooks = config.stripe.webhooks_enabled(),
            board_feed = service.feed().is_enabled(),
            "integrations"
        );
        Self {
            service,
            auth: Arc::new(Authenticator::from_config(&config.clerk)),
            schemas: Arc::new(SchemaRegistry::new()),
            config: Arc::new(config),
            clerk,
            assist,
            stripe,
        }
    }

    /// Replace the authenticator (tests, embedding).
    #[must_use]
    pub fn with_authenticator(mut self, auth: Authenticator) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    #[must_use]
    pub fn app_url(&self) -> &str {
        self.config.server.app_url.trim_end_matches('/')
    }
}
