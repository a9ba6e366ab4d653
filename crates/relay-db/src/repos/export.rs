//! CSV export of a board.

use std::collections::HashMap;

use relay_core::enums::BoardKind;

use crate::error::DatabaseError;
use crate::service::RelayService;

impl RelayService {
    /// Render every record of a board as CSV.
    ///
    /// Columns are `id`, `created_at`, `liaison` (referrals only) and then
    /// the visible fields in display order. Missing values are empty cells.
    pub async fn export_board_csv(
        &self,
        organization_id: &str,
        board: BoardKind,
    ) -> Result<String, DatabaseError> {
        let fields = self.list_fields(organization_id, board, false).await?;
        let records = self.all_records(organization_id, board).await?;
        let liaisons: HashMap<String, String> = match board {
            BoardKind::Leads => HashMap::new(),
            BoardKind::Referrals => self
                .list_members(organization_id)
                .await?
                .into_iter()
                .map(|m| (m.id, m.name.unwrap_or(m.email)))
                .collect(),
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header = vec!["id", "created_at"];
        if board == BoardKind::Referrals {
            header.push("liaison");
        }
        header.extend(fields.iter().map(|f| f.name.as_str()));
        writer.write_record(&header).map_err(csv_error)?;

        for record in &records {
            let mut row = vec![record.id.clone(), record.created_at.to_rfc3339()];
            if board == BoardKind::Referrals {
                row.push(
                    record
                        .liaison_id
                        .as_ref()
                        .and_then(|id| liaisons.get(id))
                        .cloned()
                        .unwrap_or_default(),
                );
            }
            row.extend(
                fields
                    .iter()
                    .map(|f| record.values.get(&f.id).cloned().unwrap_or_default()),
            );
            writer.write_record(&row).map_err(csv_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DatabaseError::Other(anyhow::anyhow!("csv flush failed: {e}")))?;
        tracing::debug!(org = %organization_id, board = %board, rows = records.len(), "board exported");
        String::from_utf8(bytes).map_err(|e| DatabaseError::Other(e.into()))
    }
}

fn csv_error(e: csv::Error) -> DatabaseError {
    DatabaseError::Other(e.into())
}
