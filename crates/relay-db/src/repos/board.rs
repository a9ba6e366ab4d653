//! Board record repository: leads and referrals with their custom values.
//!
//! A record's values live in one row per (record, field) in the board's
//! values table. Reads only return values of visible columns.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use relay_core::entities::{BoardRecord, Field};
use relay_core::enums::{ActivityAction, BoardAction, BoardKind, BoardTarget};
use relay_core::requests::{CreateRecordRequest, RecordQuery, UpdateRecordRequest};
use relay_core::responses::BoardView;

use crate::error::DatabaseError;
use crate::helpers::{board_tables, escape_like, get_count, get_opt_string, parse_datetime, to_json};
use crate::repos::activity::Activity;
use crate::service::RelayService;

/// Filter and paging for record listings.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Referrals only.
    pub liaison_id: Option<String>,
    /// Case-insensitive substring matched against visible values.
    pub search: Option<String>,
}

impl From<RecordQuery> for RecordFilter {
    fn from(q: RecordQuery) -> Self {
        Self {
            limit: q.limit,
            offset: q.offset,
            liaison_id: q.liaison_id.filter(|s| !s.is_empty()),
            search: q.q.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Record columns. Leads have no liaison or lead link and select NULL.
const fn record_cols(board: BoardKind) -> &'static str {
    match board {
        BoardKind::Leads => "r.id, r.organization_id, NULL, NULL, r.created_by, r.created_at, r.updated_at",
        BoardKind::Referrals => {
            "r.id, r.organization_id, r.liaison_id, r.lead_id, r.created_by, r.created_at, r.updated_at"
        }
    }
}

fn row_to_record(row: &libsql::Row, board: BoardKind) -> Result<BoardRecord, DatabaseError> {
    Ok(BoardRecord {
        id: row.get::<String>(0)?,
        board,
        organization_id: row.get::<String>(1)?,
        liaison_id: get_opt_string(row, 2)?,
        lead_id: get_opt_string(row, 3)?,
        created_by: row.get::<String>(4)?,
        values: BTreeMap::new(),
        created_at: parse_datetime(&row.get::<String>(5)?)?,
        updated_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

/// Check a submitted value against its column.
fn check_value<'f>(
    fields: &'f HashMap<String, Field>,
    field_id: &str,
    value: &str,
) -> Result<&'f Field, DatabaseError> {
    let field = fields
        .get(field_id)
        .ok_or_else(|| DatabaseError::Validation(format!("unknown field '{field_id}'")))?;
    if field.hidden {
        return Err(DatabaseError::Validation(format!(
            "field '{}' is hidden and cannot be written",
            field.name
        )));
    }
    if !value.is_empty() {
        field
            .field_type
            .validate(value, &field.options)
            .map_err(|reason| DatabaseError::Validation(format!("{}: {reason}", field.name)))?;
    }
    Ok(field)
}

/// Record IDs per `IN (...)` query when loading values.
const VALUE_BATCH: usize = 500;

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl RelayService {
    async fn fields_by_id(
        &self,
        organization_id: &str,
        board: BoardKind,
    ) -> Result<HashMap<String, Field>, DatabaseError> {
        Ok(self
            .list_fields(organization_id, board, true)
            .await?
            .into_iter()
            .map(|f| (f.id.clone(), f))
            .collect())
    }

    /// Visible values of the given records, keyed by record ID.
    pub(crate) async fn load_values(
        &self,
        board: BoardKind,
        record_ids: &[String],
    ) -> Result<HashMap<String, BTreeMap<String, String>>, DatabaseError> {
        let tables = board_tables(board);
        let mut out: HashMap<String, BTreeMap<String, String>> = HashMap::new();
        for chunk in record_ids.chunks(VALUE_BATCH) {
            let sql = format!(
                "SELECT v.record_id, v.field_id, v.value FROM {} v
                 JOIN {} f ON f.id = v.field_id
                 WHERE f.hidden = 0 AND v.record_id IN ({})",
                tables.values,
                tables.fields,
                placeholders(1, chunk.len())
            );
            let params: Vec<libsql::Value> = chunk.iter().map(|id| id.clone().into()).collect();
            let mut rows = self
                .db()
                .conn()
                .query(&sql, libsql::params_from_iter(params))
                .await?;
            while let Some(row) = rows.next().await? {
                out.entry(row.get::<String>(0)?)
                    .or_default()
                    .insert(row.get::<String>(1)?, row.get::<String>(2)?);
            }
        }
        Ok(out)
    }

    /// Every record of a board with its values, oldest first.
    pub(crate) async fn all_records(
        &self,
        organization_id: &str,
        board: BoardKind,
    ) -> Result<Vec<BoardRecord>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {} FROM {} r WHERE r.organization_id = ?1 ORDER BY r.created_at, r.rowid",
                    record_cols(board),
                    board_tables(board).records
                ),
                [organization_id],
            )
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row, board)?);
        }
        self.attach_values(board, &mut records).await?;
        Ok(records)
    }

    async fn attach_values(
        &self,
        board: BoardKind,
        records: &mut [BoardRecord],
    ) -> Result<(), DatabaseError> {
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let mut values = self.load_values(board, &ids).await?;
        for record in records {
            if let Some(v) = values.remove(&record.id) {
                record.values = v;
            }
        }
        Ok(())
    }

    /// Validate a liaison or lead link for a referral.
    async fn check_referral_links(
        &self,
        organization_id: &str,
        liaison_id: Option<&str>,
        lead_id: Option<&str>,
    ) -> Result<(), DatabaseError> {
        if let Some(liaison_id) = liaison_id {
            match self.get_member(organization_id, liaison_id).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    return Err(DatabaseError::Validation(format!(
                        "liaison '{liaison_id}' is not a member of this organization"
                    )));
                }
                Err(e) => return Err(e),
            }
        }
        if let Some(lead_id) = lead_id {
            let mut rows = self
                .db()
                .conn()
                .query(
                    "SELECT 1 FROM leads WHERE id = ?1 AND organization_id = ?2",
                    libsql::params![lead_id, organization_id],
                )
                .await?;
            if rows.next().await?.is_none() {
                return Err(DatabaseError::Validation(format!(
                    "lead '{lead_id}' does not belong to this organization"
                )));
            }
        }
        Ok(())
    }

    /// Create a record with its values in one transaction.
    ///
    /// Empty values are skipped. `liaison_id` and `lead_id` are only accepted
    /// on the referral board.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for unknown, hidden or wrongly
    /// typed values, missing required values, or invalid links.
    pub async fn create_record(
        &self,
        actor_id: &str,
        organization_id: &str,
        board: BoardKind,
        req: &CreateRecordRequest,
    ) -> Result<BoardRecord, DatabaseError> {
        let fields = self.fields_by_id(organization_id, board).await?;
        let mut values = BTreeMap::new();
        for (field_id, raw) in &req.values {
            let value = raw.trim();
            check_value(&fields, field_id, value)?;
            if !value.is_empty() {
                values.insert(field_id.clone(), value.to_string());
            }
        }
        if let Some(missing) = fields
            .values()
            .find(|f| f.required && !f.hidden && !values.contains_key(&f.id))
        {
            return Err(DatabaseError::Validation(format!(
                "field '{}' is required",
                missing.name
            )));
        }

        let liaison_id = req.liaison_id.as_deref().filter(|s| !s.is_empty());
        let lead_id = req.lead_id.as_deref().filter(|s| !s.is_empty());
        match board {
            BoardKind::Leads if liaison_id.is_some() || lead_id.is_some() => {
                return Err(DatabaseError::Validation(
                    "liaison_id and lead_id only apply to referrals".into(),
                ));
            }
            BoardKind::Leads => {}
            BoardKind::Referrals => {
                self.check_referral_links(organization_id, liaison_id, lead_id)
                    .await?;
            }
        }

        let tables = board_tables(board);
        let now = Utc::now();
        let id = self.db().generate_id(board.record_prefix()).await?;

        let tx = self.db().begin().await?;
        match board {
            BoardKind::Leads => {
                tx.execute(
                    "INSERT INTO leads (id, organization_id, created_by, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    libsql::params![id.as_str(), organization_id, actor_id, now.to_rfc3339(), now.to_rfc3339()],
                )
                .await?;
            }
            BoardKind::Referrals => {
                tx.execute(
                    "INSERT INTO referrals (id, organization_id, liaison_id, lead_id, created_by, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    libsql::params![
                        id.as_str(),
                        organization_id,
                        liaison_id,
                        lead_id,
                        actor_id,
                        now.to_rfc3339(),
                        now.to_rfc3339()
                    ],
                )
                .await?;
            }
        }
        for (field_id, value) in &values {
            tx.execute(
                &format!(
                    "INSERT INTO {} (record_id, field_id, value) VALUES (?1, ?2, ?3)",
                    tables.values
                ),
                libsql::params![id.as_str(), field_id.as_str(), value.as_str()],
            )
            .await?;
        }

        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(organization_id),
                actor_id: Some(actor_id),
                entity_type: board.record_entity(),
                entity_id: &id,
                action: ActivityAction::Created,
                detail: Some(serde_json::json!({ "values": values.len() })),
            },
        )
        .await?;
        tx.commit().await?;

        let record = BoardRecord {
            id: id.clone(),
            board,
            organization_id: organization_id.to_string(),
            liaison_id: liaison_id.map(String::from),
            lead_id: lead_id.map(String::from),
            created_by: actor_id.to_string(),
            values,
            created_at: now,
            updated_at: now,
        };
        tracing::debug!(%id, board = %board.as_str(), "record created");
        self.publish(
            organization_id,
            board,
            BoardTarget::Record,
            BoardAction::Created,
            &id,
            Some(to_json(&record)?),
        );
        Ok(record)
    }

    /// A record with its visible values. Records of other organizations are
    /// not found.
    pub async fn get_record(
        &self,
        organization_id: &str,
        board: BoardKind,
        record_id: &str,
    ) -> Result<BoardRecord, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {} FROM {} r WHERE r.id = ?1 AND r.organization_id = ?2",
                    record_cols(board),
                    board_tables(board).records
                ),
                libsql::params![record_id, organization_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let mut record = row_to_record(&row, board)?;
        if let Some(values) = self
            .load_values(board, std::slice::from_ref(&record.id))
            .await?
            .remove(&record.id)
        {
            record.values = values;
        }
        Ok(record)
    }

    /// WHERE clause and parameters shared by listing and counting.
    fn record_filter_clause(
        board: BoardKind,
        organization_id: &str,
        filter: &RecordFilter,
    ) -> Result<(String, Vec<libsql::Value>), DatabaseError> {
        let tables = board_tables(board);
        let mut conditions = vec!["r.organization_id = ?1".to_string()];
        let mut params: Vec<libsql::Value> = vec![organization_id.into()];

        if let Some(ref liaison_id) = filter.liaison_id {
            if board == BoardKind::Leads {
                return Err(DatabaseError::Validation(
                    "leads cannot be filtered by liaison".into(),
                ));
            }
            params.push(liaison_id.clone().into());
            conditions.push(format!("r.liaison_id = ?{}", params.len()));
        }
        if let Some(ref search) = filter.search {
            params.push(format!("%{}%", escape_like(search.trim())).into());
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM {} v JOIN {} f ON f.id = v.field_id
                         WHERE v.record_id = r.id AND f.hidden = 0
                           AND v.value LIKE ?{} ESCAPE '\\')",
                tables.values,
                tables.fields,
                params.len()
            ));
        }
        Ok((conditions.join(" AND "), params))
    }

    /// Records of a board, newest first.
    pub async fn list_records(
        &self,
        organization_id: &str,
        board: BoardKind,
        filter: &RecordFilter,
    ) -> Result<Vec<BoardRecord>, DatabaseError> {
        let (where_clause, params) = Self::record_filter_clause(board, organization_id, filter)?;
        let limit = self.clamp_limit(filter.limit);
        let offset = filter.offset.unwrap_or(0);
        let sql = format!(
            "SELECT {} FROM {} r WHERE {where_clause}
             ORDER BY r.created_at DESC, r.rowid DESC LIMIT {limit} OFFSET {offset}",
            record_cols(board),
            board_tables(board).records
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row, board)?);
        }

        self.attach_values(board, &mut records).await?;
        Ok(records)
    }

    /// Number of records matching `filter`, ignoring paging.
    pub async fn count_records(
        &self,
        organization_id: &str,
        board: BoardKind,
        filter: &RecordFilter,
    ) -> Result<u64, DatabaseError> {
        let (where_clause, params) = Self::record_filter_clause(board, organization_id, filter)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} r WHERE {where_clause}",
            board_tables(board).records
        );
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        get_count(&row, 0)
    }

    /// Upsert the supplied values; an empty string clears a value.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for unknown, hidden or wrongly
    /// typed values, for clearing a required value, or for an invalid
    /// liaison.
    pub async fn update_record(
        &self,
        actor_id: &str,
        organization_id: &str,
        board: BoardKind,
        record_id: &str,
        req: &UpdateRecordRequest,
    ) -> Result<BoardRecord, DatabaseError> {
        self.get_record(organization_id, board, record_id).await?;
        let fields = self.fields_by_id(organization_id, board).await?;

        let mut upserts = Vec::new();
        let mut clears = Vec::new();
        for (field_id, raw) in &req.values {
            let value = raw.trim();
            let field = check_value(&fields, field_id, value)?;
            if value.is_empty() {
                if field.required {
                    return Err(DatabaseError::Validation(format!(
                        "field '{}' is required",
                        field.name
                    )));
                }
                clears.push(field_id.as_str());
            } else {
                upserts.push((field_id.as_str(), value));
            }
        }

        let liaison = match (board, req.liaison_id.as_deref()) {
            (_, None) => None,
            (BoardKind::Leads, Some(_)) => {
                return Err(DatabaseError::Validation(
                    "liaison_id only applies to referrals".into(),
                ));
            }
            (BoardKind::Referrals, Some("")) => Some(None),
            (BoardKind::Referrals, Some(id)) => {
                self.check_referral_links(organization_id, Some(id), None)
                    .await?;
                Some(Some(id))
            }
        };

        let tables = board_tables(board);
        let now = Utc::now();
        let tx = self.db().begin().await?;
        for (field_id, value) in &upserts {
            tx.execute(
                &format!(
                    "INSERT INTO {} (record_id, field_id, value) VALUES (?1, ?2, ?3)
                     ON CONFLICT(record_id, field_id) DO UPDATE SET value = excluded.value",
                    tables.values
                ),
                libsql::params![record_id, *field_id, *value],
            )
            .await?;
        }
        for field_id in &clears {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE record_id = ?1 AND field_id = ?2",
                    tables.values
                ),
                libsql::params![record_id, *field_id],
            )
            .await?;
        }
        if let Some(liaison_id) = liaison {
            tx.execute(
                "UPDATE referrals SET liaison_id = ?1 WHERE id = ?2",
                libsql::params![liaison_id, record_id],
            )
            .await?;
        }
        tx.execute(
            &format!("UPDATE {} SET updated_at = ?1 WHERE id = ?2", tables.records),
            libsql::params![now.to_rfc3339(), record_id],
        )
        .await?;

        let changed: Vec<&str> = req.values.keys().map(String::as_str).collect();
        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(organization_id),
                actor_id: Some(actor_id),
                entity_type: board.record_entity(),
                entity_id: record_id,
                action: ActivityAction::Updated,
                detail: Some(serde_json::json!({
                    "fields": changed,
                    "liaison_id": liaison.flatten(),
                })),
            },
        )
        .await?;
        tx.commit().await?;

        let record = self.get_record(organization_id, board, record_id).await?;
        self.publish(
            organization_id,
            board,
            BoardTarget::Record,
            BoardAction::Updated,
            record_id,
            Some(to_json(&record)?),
        );
        Ok(record)
    }

    /// Delete a record and its values.
    pub async fn delete_record(
        &self,
        actor_id: &str,
        organization_id: &str,
        board: BoardKind,
        record_id: &str,
    ) -> Result<(), DatabaseError> {
        let tx = self.db().begin().await?;
        let affected = tx
            .execute(
                &format!(
                    "DELETE FROM {} WHERE id = ?1 AND organization_id = ?2",
                    board_tables(board).records
                ),
                libsql::params![record_id, organization_id],
            )
            .await?;
        if affected == 0 {
            return Err(DatabaseError::NoResult);
        }
        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(organization_id),
                actor_id: Some(actor_id),
                entity_type: board.record_entity(),
                entity_id: record_id,
                action: ActivityAction::Deleted,
                detail: None,
            },
        )
        .await?;
        tx.commit().await?;

        self.publish(
            organization_id,
            board,
            BoardTarget::Record,
            BoardAction::Deleted,
            record_id,
            None,
        );
        Ok(())
    }

    /// Visible columns plus a page of records.
    pub async fn board_view(
        &self,
        organization_id: &str,
        board: BoardKind,
        filter: &RecordFilter,
    ) -> Result<BoardView, DatabaseError> {
        Ok(BoardView {
            board,
            fields: self.list_fields(organization_id, board, false).await?,
            records: self.list_records(organization_id, board, filter).await?,
            total: self.count_records(organization_id, board, filter).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{OWNER, test_org, test_service};
    use pretty_assertions::assert_eq;
    use relay_core::enums::{FieldType, MemberRole};
    use relay_core::requests::{AddMemberRequest, CreateFieldRequest};

    async fn field(
        svc: &RelayService,
        org: &str,
        board: BoardKind,
        name: &str,
        field_type: FieldType,
        required: bool,
    ) -> Field {
        let options = if field_type == FieldType::Select {
            vec!["Hot".to_string(), "Cold".to_string()]
        } else {
            vec![]
        };
        svc.create_field(
            OWNER,
            org,
            board,
            &CreateFieldRequest {
                name: name.into(),
                field_type,
                options,
                required,
            },
        )
        .await
        .unwrap()
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    async fn value_rows(svc: &RelayService, table: &str, record_id: &str) -> i64 {
        let mut rows = svc
            .db()
            .conn()
            .query(
                &format!("SELECT COUNT(*) FROM {table} WHERE record_id = ?1"),
                [record_id],
            )
            .await
            .unwrap();
        rows.next().await.unwrap().unwrap().get::<i64>(0).unwrap()
    }

    #[tokio::test]
    async fn create_lead_writes_one_row_per_value() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let name = field(&svc, &org.id, BoardKind::Leads, "Name", FieldType::Text, true).await;
        let phone = field(&svc, &org.id, BoardKind::Leads, "Phone", FieldType::Phone, false).await;
        let temp = field(&svc, &org.id, BoardKind::Leads, "Temp", FieldType::Select, false).await;

        let record = svc
            .create_record(
                OWNER,
                &org.id,
                BoardKind::Leads,
                &CreateRecordRequest {
                    values: values(&[
                        (&name.id, "Ada Lovelace"),
                        (&phone.id, "+44 20 7946 0000"),
                        (&temp.id, "Hot"),
                    ]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(record.id.starts_with("led-"));
        assert_eq!(value_rows(&svc, "lead_values", &record.id).await, 3);
        let fetched = svc.get_record(&org.id, BoardKind::Leads, &record.id).await.unwrap();
        assert_eq!(fetched.values, record.values);
    }

    #[tokio::test]
    async fn invalid_values_are_rejected() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let name = field(&svc, &org.id, BoardKind::Leads, "Name", FieldType::Text, true).await;
        let age = field(&svc, &org.id, BoardKind::Leads, "Age", FieldType::Number, false).await;
        let old = field(&svc, &org.id, BoardKind::Leads, "Old", FieldType::Text, false).await;
        svc.hide_field(OWNER, &org.id, BoardKind::Leads, &old.id).await.unwrap();

        let cases = [
            values(&[(&name.id, "Ada"), (&age.id, "forty")]),
            values(&[(&name.id, "Ada"), ("lfd-00000000", "x")]),
            values(&[(&name.id, "Ada"), (&old.id, "x")]),
            values(&[(&age.id, "40")]),
            values(&[(&name.id, "   ")]),
        ];
        for values in cases {
            let err = svc
                .create_record(
                    OWNER,
                    &org.id,
                    BoardKind::Leads,
                    &CreateRecordRequest {
                        values: values.clone(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, DatabaseError::Validation(_)), "{values:?}: {err:?}");
        }
        assert_eq!(
            svc.count_records(&org.id, BoardKind::Leads, &RecordFilter::default())
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn referral_links_are_checked() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let (other, _) = test_org(&svc, "Other").await;
        let liaison = svc
            .add_member(
                OWNER,
                &org.id,
                &AddMemberRequest {
                    user_id: "user_dana".into(),
                    email: "dana@example.com".into(),
                    name: Some("Dana".into()),
                    role: MemberRole::Liaison,
                },
            )
            .await
            .unwrap();
        let foreign_lead = svc
            .create_record(OWNER, &other.id, BoardKind::Leads, &CreateRecordRequest::default())
            .await
            .unwrap();

        let bad_lead = CreateRecordRequest {
            lead_id: Some(foreign_lead.id.clone()),
            ..Default::default()
        };
        assert!(matches!(
            svc.create_record(OWNER, &org.id, BoardKind::Referrals, &bad_lead).await,
            Err(DatabaseError::Validation(_))
        ));
        let bad_liaison = CreateRecordRequest {
            liaison_id: Some("mem-00000000".into()),
            ..Default::default()
        };
        assert!(svc
            .create_record(OWNER, &org.id, BoardKind::Referrals, &bad_liaison)
            .await
            .is_err());
        let lead_with_liaison = CreateRecordRequest {
            liaison_id: Some(liaison.id.clone()),
            ..Default::default()
        };
        assert!(svc
            .create_record(OWNER, &org.id, BoardKind::Leads, &lead_with_liaison)
            .await
            .is_err());

        let referral = svc
            .create_record(OWNER, &org.id, BoardKind::Referrals, &lead_with_liaison)
            .await
            .unwrap();
        assert_eq!(referral.liaison_id.as_deref(), Some(liaison.id.as_str()));

        let filter = RecordFilter {
            liaison_id: Some(liaison.id.clone()),
            ..Default::default()
        };
        let listed = svc.list_records(&org.id, BoardKind::Referrals, &filter).await.unwrap();
        assert_eq!(listed.len(), 1);

        let cleared = svc
            .update_record(
                OWNER,
                &org.id,
                BoardKind::Referrals,
                &referral.id,
                &UpdateRecordRequest {
                    liaison_id: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.liaison_id, None);
    }

    #[tokio::test]
    async fn update_upserts_and_clears() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let name = field(&svc, &org.id, BoardKind::Leads, "Name", FieldType::Text, true).await;
        let note = field(&svc, &org.id, BoardKind::Leads, "Note", FieldType::Text, false).await;
        let record = svc
            .create_record(
                OWNER,
                &org.id,
                BoardKind::Leads,
                &CreateRecordRequest {
                    values: values(&[(&name.id, "Ada")]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let updated = svc
            .update_record(
                OWNER,
                &org.id,
                BoardKind::Leads,
                &record.id,
                &UpdateRecordRequest {
                    values: values(&[(&name.id, "Ada King"), (&note.id, "call back")]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.values.get(&name.id).map(String::as_str), Some("Ada King"));
        assert_eq!(value_rows(&svc, "lead_values", &record.id).await, 2);

        let cleared = svc
            .update_record(
                OWNER,
                &org.id,
                BoardKind::Leads,
                &record.id,
                &UpdateRecordRequest {
                    values: values(&[(&note.id, "")]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!cleared.values.contains_key(&note.id));

        let clear_required = UpdateRecordRequest {
            values: values(&[(&name.id, "")]),
            ..Default::default()
        };
        assert!(svc
            .update_record(OWNER, &org.id, BoardKind::Leads, &record.id, &clear_required)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn hidden_columns_disappear_from_reads_until_restored() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let name = field(&svc, &org.id, BoardKind::Leads, "Name", FieldType::Text, false).await;
        let secret = field(&svc, &org.id, BoardKind::Leads, "Secret", FieldType::Text, false).await;
        let record = svc
            .create_record(
                OWNER,
                &org.id,
                BoardKind::Leads,
                &CreateRecordRequest {
                    values: values(&[(&name.id, "Ada"), (&secret.id, "needle")]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        svc.hide_field(OWNER, &org.id, BoardKind::Leads, &secret.id).await.unwrap();
        let view = svc
            .board_view(&org.id, BoardKind::Leads, &RecordFilter::default())
            .await
            .unwrap();
        assert_eq!(view.fields.len(), 1);
        assert!(!view.records[0].values.contains_key(&secret.id));
        let search = RecordFilter {
            search: Some("NEEDLE".into()),
            ..Default::default()
        };
        assert!(svc.list_records(&org.id, BoardKind::Leads, &search).await.unwrap().is_empty());

        svc.restore_field(OWNER, &org.id, BoardKind::Leads, &secret.id).await.unwrap();
        let restored = svc.get_record(&org.id, BoardKind::Leads, &record.id).await.unwrap();
        assert_eq!(restored.values.get(&secret.id).map(String::as_str), Some("needle"));
        assert_eq!(svc.list_records(&org.id, BoardKind::Leads, &search).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn records_are_tenant_isolated() {
        let svc = test_service().await;
        let (a, _) = test_org(&svc, "A").await;
        let (b, _) = test_org(&svc, "B").await;
        let record = svc
            .create_record(OWNER, &a.id, BoardKind::Leads, &CreateRecordRequest::default())
            .await
            .unwrap();

        assert!(svc.get_record(&b.id, BoardKind::Leads, &record.id).await.unwrap_err().is_not_found());
        assert!(svc.delete_record(OWNER, &b.id, BoardKind::Leads, &record.id).await.unwrap_err().is_not_found());
        assert!(svc.list_records(&b.id, BoardKind::Leads, &RecordFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_pages_newest_first_and_delete_publishes() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let mut ids = Vec::new();
        for _ in 0..3 {
            let r = svc
                .create_record(OWNER, &org.id, BoardKind::Leads, &CreateRecordRequest::default())
                .await
                .unwrap();
            ids.push(r.id);
        }
        let page = RecordFilter {
            limit: Some(2),
            offset: Some(1),
            ..Default::default()
        };
        let listed: Vec<_> = svc
            .list_records(&org.id, BoardKind::Leads, &page)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(listed, vec![ids[1].clone(), ids[0].clone()]);

        let mut rx = svc.feed().subscribe().unwrap();
        svc.delete_record(OWNER, &org.id, BoardKind::Leads, &ids[2]).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!((event.action, event.data), (BoardAction::Deleted, None));
        assert_eq!(
            svc.count_records(&org.id, BoardKind::Leads, &RecordFilter::default()).await.unwrap(),
            2
        );
    }
}
