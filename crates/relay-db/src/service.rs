//! Service layer orchestrating database mutations with the activity log and
//! the board event feed.
//!
//! `RelayService` wraps `RelayDb` (raw database access) and `BoardFeed`
//! (real-time notifications). All repo methods are implemented as
//! `impl RelayService` blocks under `repos/`.

use relay_config::RelayConfig;
use relay_core::entities::BoardEvent;
use relay_core::enums::{BoardAction, BoardKind, BoardTarget};

use crate::RelayDb;
use crate::error::DatabaseError;
use crate::events::BoardFeed;

/// Limits and defaults the repositories need from configuration.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub default_limit: u32,
    pub max_limit: u32,
    /// Length of the trial subscription created with an organization.
    pub trial_days: u32,
    /// Delivery attempts before an email job is marked failed.
    pub email_max_attempts: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

impl ServiceSettings {
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            default_limit: config.general.default_limit,
            max_limit: config.general.max_limit,
            trial_days: config.stripe.trial_days,
            email_max_attempts: config.email.max_attempts,
        }
    }
}

/// Orchestrates database mutations.
///
/// Every mutation method follows this protocol:
/// 1. Validate input against the current rows
/// 2. Begin a transaction (takes the write lock)
/// 3. Execute SQL
/// 4. Append an activity entry (inside the transaction)
/// 5. Commit
/// 6. Publish a board event (board mutations only)
pub struct RelayService {
    db: RelayDb,
    feed: BoardFeed,
    settings: ServiceSettings,
}

impl RelayService {
    /// Open the database described by `config` (remote when URL and token are set).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or migrated.
    pub async fn open(config: &RelayConfig, feed: BoardFeed) -> Result<Self, DatabaseError> {
        let db = if config.database.is_remote() {
            tracing::info!(url = %config.database.url, "opening remote database");
            RelayDb::open_remote(&config.database.url, &config.database.auth_token).await?
        } else {
            tracing::info!(path = %config.database.path, "opening local database");
            RelayDb::open_local(&config.database.path).await?
        };
        Ok(Self::from_db(db, feed, ServiceSettings::from_config(config)))
    }

    /// Create a service wrapping a local database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(
        db_path: &str,
        feed: BoardFeed,
        settings: ServiceSettings,
    ) -> Result<Self, DatabaseError> {
        let db = RelayDb::open_local(db_path).await?;
        Ok(Self::from_db(db, feed, settings))
    }

    #[must_use]
    pub const fn from_db(db: RelayDb, feed: BoardFeed, settings: ServiceSettings) -> Self {
        Self { db, feed, settings }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &RelayDb {
        &self.db
    }

    #[must_use]
    pub const fn feed(&self) -> &BoardFeed {
        &self.feed
    }

    #[must_use]
    pub const fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Resolve a requested page size against the configured limits.
    #[must_use]
    pub fn clamp_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.settings.default_limit)
            .clamp(1, self.settings.max_limit.max(1))
    }

    pub(crate) fn publish(
        &self,
        organization_id: &str,
        board: BoardKind,
        target: BoardTarget,
        action: BoardAction,
        id: &str,
        data: Option<serde_json::Value>,
    ) {
        self.feed.publish(BoardEvent {
            organization_id: organization_id.to_string(),
            board,
            target,
            action,
            id: id.to_string(),
            data,
        });
    }
}
