use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use relay_config::RelayConfig;
use relay_core::enums::BoardKind;
use relay_db::service::RelayService;
use serde::Serialize;

use crate::bootstrap;
use crate::cli::{ExportArgs, GlobalFlags};
use crate::output::output;

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub organization_id: String,
    pub board: BoardKind,
    pub path: String,
    pub rows: usize,
}

pub async fn handle(args: &ExportArgs, config: &RelayConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let service = bootstrap::open_offline(config).await?;
    let board = BoardKind::from(args.board);

    match &args.out {
        Some(path) => {
            let response = export_to_file(&service, &args.org, board, path).await?;
            output(&response, flags.quiet)
        }
        None => {
            let csv = board_csv(&service, &args.org, board).await?;
            std::io::stdout()
                .write_all(csv.as_bytes())
                .context("failed to write CSV to stdout")
        }
    }
}

async fn board_csv(service: &RelayService, organization_id: &str, board: BoardKind) -> anyhow::Result<String> {
    service
        .get_organization(organization_id)
        .await
        .with_context(|| format!("organization '{organization_id}' not found"))?;
    Ok(service.export_board_csv(organization_id, board).await?)
}

pub async fn export_to_file(
    service: &RelayService,
    organization_id: &str,
    board: BoardKind,
    path: &Path,
) -> anyhow::Result<ExportResponse> {
    let csv = board_csv(service, organization_id, board).await?;
    std::fs::write(path, &csv).with_context(|| format!("failed to write {}", path.display()))?;
    let rows = csv.lines().count().saturating_sub(1);
    tracing::info!(org = organization_id, %board, rows, path = %path.display(), "board exported");
    Ok(ExportResponse {
        organization_id: organization_id.to_string(),
        board,
        path: path.display().to_string(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use relay_core::enums::BoardKind;
    use relay_db::events::BoardFeed;
    use relay_db::service::{RelayService, ServiceSettings};

    use super::export_to_file;
    use crate::cli::SeedArgs;
    use crate::commands::seed::seed;

    #[tokio::test]
    async fn exports_seeded_referrals_to_a_file() {
        let service = RelayService::new_local(":memory:", BoardFeed::disabled(), ServiceSettings::default())
            .await
            .unwrap();
        let summary = seed(
            &service,
            &SeedArgs {
                name: "Harbor Care".into(),
                owner: "user_1".into(),
                email: "owner@harbor.test".into(),
                leads: 0,
                referrals: 3,
            },
        )
        .await
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("referrals.csv");
        let response = export_to_file(&service, &summary.organization_id, BoardKind::Referrals, &path)
            .await
            .unwrap();

        assert_eq!(response.rows, 3);
        let csv = std::fs::read_to_string(&path).unwrap();
        assert!(csv.starts_with("id,created_at,liaison,"), "{csv}");
    }

    #[tokio::test]
    async fn unknown_organization_is_an_error() {
        let service = RelayService::new_local(":memory:", BoardFeed::disabled(), ServiceSettings::default())
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = export_to_file(&service, "org-missing", BoardKind::Leads, &dir.path().join("x.csv"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("org-missing"));
        assert!(!dir.path().join("x.csv").exists());
    }
}
