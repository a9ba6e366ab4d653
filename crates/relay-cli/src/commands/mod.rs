pub mod export;
pub mod migrate;
pub mod orgs;
pub mod seed;
pub mod serve;

use relay_config::RelayConfig;

use crate::cli::{Commands, GlobalFlags};

/// Dispatch a parsed command to its handler.
pub async fn dispatch(command: Commands, config: RelayConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Serve => serve::handle(config).await,
        Commands::Migrate => migrate::handle(&config, flags).await,
        Commands::Seed(args) => seed::handle(&args, &config, flags).await,
        Commands::Export(args) => export::handle(&args, &config, flags).await,
        Commands::Orgs(args) => orgs::handle(&args, &config, flags).await,
    }
}
