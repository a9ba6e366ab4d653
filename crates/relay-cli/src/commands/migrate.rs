use relay_config::RelayConfig;
use serde::Serialize;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::output::output;

#[derive(Debug, Serialize)]
struct MigrateResponse {
    database: String,
    remote: bool,
    status: &'static str,
}

/// Opening the service applies any pending migrations.
pub async fn handle(config: &RelayConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let remote = config.database.is_remote();
    bootstrap::open_offline(config).await?;
    tracing::info!("database schema is up to date");
    output(
        &MigrateResponse {
            database: if remote {
                config.database.url.clone()
            } else {
                config.database.path.clone()
            },
            remote,
            status: "migrated",
        },
        flags.quiet,
    )
}
