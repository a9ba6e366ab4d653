use anyhow::Context;
use relay_config::RelayConfig;
use relay_db::events::BoardFeed;
use relay_db::service::RelayService;

use crate::cli::GlobalFlags;

/// Load `.env`, the TOML layers and `RELAY_*` overrides.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<RelayConfig> {
    if let Some(path) = &flags.config {
        if !path.is_file() {
            anyhow::bail!("config file '{}' does not exist", path.display());
        }
    }
    RelayConfig::load_with_dotenv(flags.config.as_deref()).context("failed to load configuration")
}

/// Open the configured database without a live board feed.
pub async fn open_offline(config: &RelayConfig) -> anyhow::Result<RelayService> {
    RelayService::open(config, BoardFeed::disabled())
        .await
        .context("failed to open database")
}
