use relay_config::RelayConfig;

use crate::bootstrap;
use crate::cli::{GlobalFlags, OrgsArgs};
use crate::output::output;

pub async fn handle(args: &OrgsArgs, config: &RelayConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let service = bootstrap::open_offline(config).await?;
    let organizations = service.list_organizations(args.limit).await?;
    output(&organizations, flags.quiet)
}
