//! Board analytics.
//!
//! Counts are computed on demand from the record and value tables. Only
//! visible `select` columns get a per-option breakdown.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Utc};
use relay_core::enums::{BoardKind, FieldType};
use relay_core::responses::{BoardSummary, FieldBreakdown, LiaisonCount, MonthCount, OptionCount};

use crate::error::DatabaseError;
use crate::helpers::{board_tables, get_count, get_opt_string};
use crate::service::RelayService;

/// Months covered by [`BoardSummary::by_month`].
pub const SUMMARY_MONTHS: u32 = 12;

/// `YYYY-MM` keys of the `SUMMARY_MONTHS` months ending with `now`'s month,
/// oldest first.
fn month_keys(now: DateTime<Utc>) -> Vec<String> {
    let current = i64::from(now.year()) * 12 + i64::from(now.month0());
    (0..i64::from(SUMMARY_MONTHS))
        .rev()
        .map(|back| {
            let n = current - back;
            format!("{:04}-{:02}", n.div_euclid(12), n.rem_euclid(12) + 1)
        })
        .collect()
}

impl RelayService {
    async fn count_where(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<u64, DatabaseError> {
        let mut rows = self.db().conn().query(sql, params).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        get_count(&row, 0)
    }

    /// Summary statistics for one board as of `now`.
    pub async fn board_summary(
        &self,
        organization_id: &str,
        board: BoardKind,
        now: DateTime<Utc>,
    ) -> Result<BoardSummary, DatabaseError> {
        let tables = board_tables(board);

        let total = self
            .count_where(
                &format!("SELECT COUNT(*) FROM {} WHERE organization_id = ?1", tables.records),
                [organization_id],
            )
            .await?;
        let since = (now - Duration::days(30)).to_rfc3339();
        let last_30_days = self
            .count_where(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE organization_id = ?1 AND created_at >= ?2",
                    tables.records
                ),
                libsql::params![organization_id, since.as_str()],
            )
            .await?;

        let months = month_keys(now);
        let mut per_month: HashMap<String, u64> = HashMap::new();
        if let Some(first) = months.first() {
            let mut rows = self
                .db()
                .conn()
                .query(
                    &format!(
                        "SELECT substr(created_at, 1, 7), COUNT(*) FROM {}
                         WHERE organization_id = ?1 AND substr(created_at, 1, 7) >= ?2
                         GROUP BY 1",
                        tables.records
                    ),
                    libsql::params![organization_id, first.as_str()],
                )
                .await?;
            while let Some(row) = rows.next().await? {
                per_month.insert(row.get::<String>(0)?, get_count(&row, 1)?);
            }
        }
        let by_month = months
            .into_iter()
            .map(|month| MonthCount {
                count: per_month.get(&month).copied().unwrap_or(0),
                month,
            })
            .collect();

        let by_liaison = match board {
            BoardKind::Leads => Vec::new(),
            BoardKind::Referrals => self.referrals_by_liaison(organization_id).await?,
        };

        let mut by_field = Vec::new();
        for field in self.list_fields(organization_id, board, false).await? {
            if field.field_type != FieldType::Select {
                continue;
            }
            let mut rows = self
                .db()
                .conn()
                .query(
                    &format!(
                        "SELECT v.value, COUNT(*) FROM {} v
                         JOIN {} r ON r.id = v.record_id
                         WHERE v.field_id = ?1 AND r.organization_id = ?2
                         GROUP BY v.value ORDER BY v.value",
                        tables.values, tables.records
                    ),
                    libsql::params![field.id.as_str(), organization_id],
                )
                .await?;
            let mut stored: Vec<(String, u64)> = Vec::new();
            while let Some(row) = rows.next().await? {
                stored.push((row.get::<String>(0)?, get_count(&row, 1)?));
            }

            // Configured options first, in their order, then values whose
            // option has since been removed.
            let mut counts: Vec<OptionCount> = field
                .options
                .iter()
                .map(|option| OptionCount {
                    value: option.clone(),
                    count: stored
                        .iter()
                        .find(|(v, _)| v == option)
                        .map_or(0, |(_, n)| *n),
                })
                .collect();
            counts.extend(
                stored
                    .into_iter()
                    .filter(|(v, _)| !field.options.contains(v))
                    .map(|(value, count)| OptionCount { value, count }),
            );
            by_field.push(FieldBreakdown {
                field_id: field.id,
                name: field.name,
                counts,
            });
        }

        Ok(BoardSummary {
            board,
            total,
            last_30_days,
            by_month,
            by_liaison,
            by_field,
        })
    }

    async fn referrals_by_liaison(
        &self,
        organization_id: &str,
    ) -> Result<Vec<LiaisonCount>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT r.liaison_id, COALESCE(m.name, m.email), COUNT(*) FROM referrals r
                 LEFT JOIN members m ON m.id = r.liaison_id
                 WHERE r.organization_id = ?1
                 GROUP BY r.liaison_id
                 ORDER BY COUNT(*) DESC, 2",
                [organization_id],
            )
            .await?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next().await? {
            counts.push(LiaisonCount {
                liaison_id: get_opt_string(&row, 0)?,
                name: get_opt_string(&row, 1)?,
                count: get_count(&row, 2)?,
            });
        }
        Ok(counts)
    }
}
