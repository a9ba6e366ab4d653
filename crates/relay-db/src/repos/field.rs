//! Board column repository.
//!
//! Columns are soft-deleted: hiding sets `hidden = 1` and every read of
//! records, exports and analytics joins on visible columns only. Restoring a
//! column brings its stored values back.

use std::collections::HashSet;

use chrono::Utc;
use relay_core::activity_detail::ReorderedDetail;
use relay_core::entities::Field;
use relay_core::enums::{ActivityAction, BoardAction, BoardKind, BoardTarget, FieldType};
use relay_core::requests::CreateFieldRequest;

use crate::error::DatabaseError;
use crate::helpers::{board_tables, get_bool, parse_datetime, parse_enum, to_json};
use crate::repos::activity::Activity;
use crate::service::RelayService;
use crate::updates::field::FieldUpdate;

const SELECT_COLS: &str =
    "id, organization_id, name, field_type, options, position, required, hidden, created_at, updated_at";

fn row_to_field(row: &libsql::Row, board: BoardKind) -> Result<Field, DatabaseError> {
    let options: Vec<String> = serde_json::from_str(&row.get::<String>(4)?)
        .map_err(|e| DatabaseError::Query(format!("Invalid field options: {e}")))?;
    Ok(Field {
        id: row.get::<String>(0)?,
        organization_id: row.get::<String>(1)?,
        board,
        name: row.get::<String>(2)?,
        field_type: parse_enum(&row.get::<String>(3)?)?,
        options,
        position: row.get::<i64>(5)?,
        required: get_bool(row, 6)?,
        hidden: get_bool(row, 7)?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
        updated_at: parse_datetime(&row.get::<String>(9)?)?,
    })
}

fn validate_name(name: &str) -> Result<String, DatabaseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DatabaseError::Validation("column name must not be empty".into()));
    }
    Ok(name.to_string())
}

/// Trim options and check they suit `field_type`.
fn normalize_options(field_type: FieldType, options: &[String]) -> Result<Vec<String>, DatabaseError> {
    if field_type != FieldType::Select {
        if options.is_empty() {
            return Ok(Vec::new());
        }
        return Err(DatabaseError::Validation(format!(
            "options are only allowed on select columns, not {field_type}"
        )));
    }
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(options.len());
    for option in options {
        let option = option.trim();
        if option.is_empty() {
            return Err(DatabaseError::Validation("select options must not be empty".into()));
        }
        if !seen.insert(option.to_string()) {
            return Err(DatabaseError::Validation(format!("duplicate select option '{option}'")));
        }
        out.push(option.to_string());
    }
    if out.is_empty() {
        return Err(DatabaseError::Validation("select columns need at least one option".into()));
    }
    Ok(out)
}

fn options_json(options: &[String]) -> Result<String, DatabaseError> {
    serde_json::to_string(options).map_err(|e| DatabaseError::Other(e.into()))
}

impl RelayService {
    /// Add a column at the end of the board.
    pub async fn create_field(
        &self,
        actor_id: &str,
        organization_id: &str,
        board: BoardKind,
        req: &CreateFieldRequest,
    ) -> Result<Field, DatabaseError> {
        let name = validate_name(&req.name)?;
        let options = normalize_options(req.field_type, &req.options)?;
        let tables = board_tables(board);
        let now = Utc::now();
        let id = self.db().generate_id(board.field_prefix()).await?;

        let tx = self.db().begin().await?;
        let mut rows = tx
            .query(
                &format!(
                    "SELECT COALESCE(MAX(position), 0) + 1 FROM {} WHERE organization_id = ?1",
                    tables.fields
                ),
                [organization_id],
            )
            .await?;
        let position = rows
            .next()
            .await?
            .ok_or(DatabaseError::NoResult)?
            .get::<i64>(0)?;

        tx.execute(
            &format!(
                "INSERT INTO {} ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)",
                tables.fields
            ),
            libsql::params![
                id.as_str(),
                organization_id,
                name.as_str(),
                req.field_type.as_str(),
                options_json(&options)?,
                position,
                i64::from(req.required),
                now.to_rfc3339(),
                now.to_rfc3339()
            ],
        )
        .await?;

        let field = Field {
            id: id.clone(),
            organization_id: organization_id.to_string(),
            board,
            name,
            field_type: req.field_type,
            options,
            position,
            required: req.required,
            hidden: false,
            created_at: now,
            updated_at: now,
        };

        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(organization_id),
                actor_id: Some(actor_id),
                entity_type: board.field_entity(),
                entity_id: &id,
                action: ActivityAction::Created,
                detail: Some(serde_json::json!({ "name": field.name, "field_type": field.field_type })),
            },
        )
        .await?;
        tx.commit().await?;

        self.publish(
            organization_id,
            board,
            BoardTarget::Field,
            BoardAction::Created,
            &id,
            Some(to_json(&field)?),
        );
        Ok(field)
    }

    /// Columns of a board in display order.
    pub async fn list_fields(
        &self,
        organization_id: &str,
        board: BoardKind,
        include_hidden: bool,
    ) -> Result<Vec<Field>, DatabaseError> {
        let hidden_filter = if include_hidden { "" } else { "AND hidden = 0" };
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM {} WHERE organization_id = ?1 {hidden_filter}
                     ORDER BY position, rowid",
                    board_tables(board).fields
                ),
                [organization_id],
            )
            .await?;
        let mut fields = Vec::new();
        while let Some(row) = rows.next().await? {
            fields.push(row_to_field(&row, board)?);
        }
        Ok(fields)
    }

    /// A column, hidden or not.
    pub async fn get_field(
        &self,
        organization_id: &str,
        board: BoardKind,
        field_id: &str,
    ) -> Result<Field, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM {} WHERE id = ?1 AND organization_id = ?2",
                    board_tables(board).fields
                ),
                libsql::params![field_id, organization_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_field(&row, board)
    }

    pub async fn update_field(
        &self,
        actor_id: &str,
        organization_id: &str,
        board: BoardKind,
        field_id: &str,
        update: FieldUpdate,
    ) -> Result<Field, DatabaseError> {
        let current = self.get_field(organization_id, board, field_id).await?;
        if update.is_empty() {
            return Ok(current);
        }

        let mut sets = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();
        let mut idx = 1;

        if let Some(ref name) = update.name {
            sets.push(format!("name = ?{idx}"));
            params.push(validate_name(name)?.into());
            idx += 1;
        }
        if let Some(ref options) = update.options {
            let options = normalize_options(current.field_type, options)?;
            sets.push(format!("options = ?{idx}"));
            params.push(options_json(&options)?.into());
            idx += 1;
        }
        if let Some(required) = update.required {
            sets.push(format!("required = ?{idx}"));
            params.push(i64::from(required).into());
            idx += 1;
        }

        let now = Utc::now();
        sets.push(format!("updated_at = ?{idx}"));
        params.push(now.to_rfc3339().into());
        idx += 1;
        params.push(field_id.into());
        params.push(organization_id.into());
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{idx} AND organization_id = ?{}",
            board_tables(board).fields,
            sets.join(", "),
            idx + 1
        );

        let tx = self.db().begin().await?;
        tx.execute(&sql, libsql::params_from_iter(params)).await?;
        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(organization_id),
                actor_id: Some(actor_id),
                entity_type: board.field_entity(),
                entity_id: field_id,
                action: ActivityAction::Updated,
                detail: Some(to_json(&update)?),
            },
        )
        .await?;
        tx.commit().await?;

        let field = self.get_field(organization_id, board, field_id).await?;
        self.publish(
            organization_id,
            board,
            BoardTarget::Field,
            BoardAction::Updated,
            field_id,
            Some(to_json(&field)?),
        );
        Ok(field)
    }

    /// Soft-delete a column. Its values stay stored but disappear from reads.
    pub async fn hide_field(
        &self,
        actor_id: &str,
        organization_id: &str,
        board: BoardKind,
        field_id: &str,
    ) -> Result<Field, DatabaseError> {
        let field = self
            .set_field_hidden(actor_id, organization_id, board, field_id, true)
            .await?;
        self.publish(
            organization_id,
            board,
            BoardTarget::Field,
            BoardAction::Deleted,
            field_id,
            None,
        );
        Ok(field)
    }

    /// Bring a hidden column back, at the end of the board.
    pub async fn restore_field(
        &self,
        actor_id: &str,
        organization_id: &str,
        board: BoardKind,
        field_id: &str,
    ) -> Result<Field, DatabaseError> {
        let field = self
            .set_field_hidden(actor_id, organization_id, board, field_id, false)
            .await?;
        self.publish(
            organization_id,
            board,
            BoardTarget::Field,
            BoardAction::Created,
            field_id,
            Some(to_json(&field)?),
        );
        Ok(field)
    }

    async fn set_field_hidden(
        &self,
        actor_id: &str,
        organization_id: &str,
        board: BoardKind,
        field_id: &str,
        hidden: bool,
    ) -> Result<Field, DatabaseError> {
        let current = self.get_field(organization_id, board, field_id).await?;
        if current.hidden == hidden {
            return Err(DatabaseError::InvalidState(format!(
                "column {field_id} is already {}",
                if hidden { "hidden" } else { "visible" }
            )));
        }
        let table = board_tables(board).fields;
        let now = Utc::now();

        let tx = self.db().begin().await?;
        if hidden {
            tx.execute(
                &format!("UPDATE {table} SET hidden = 1, updated_at = ?1 WHERE id = ?2"),
                libsql::params![now.to_rfc3339(), field_id],
            )
            .await?;
        } else {
            tx.execute(
                &format!(
                    "UPDATE {table} SET hidden = 0, updated_at = ?1,
                     position = (SELECT COALESCE(MAX(position), 0) + 1 FROM {table} WHERE organization_id = ?2)
                     WHERE id = ?3"
                ),
                libsql::params![now.to_rfc3339(), organization_id, field_id],
            )
            .await?;
        }
        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(organization_id),
                actor_id: Some(actor_id),
                entity_type: board.field_entity(),
                entity_id: field_id,
                action: if hidden {
                    ActivityAction::Hidden
                } else {
                    ActivityAction::Restored
                },
                detail: None,
            },
        )
        .await?;
        tx.commit().await?;

        self.get_field(organization_id, board, field_id).await
    }

    /// Set the display order of the visible columns.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` unless `field_ids` lists every
    /// visible column exactly once.
    pub async fn reorder_fields(
        &self,
        actor_id: &str,
        organization_id: &str,
        board: BoardKind,
        field_ids: &[String],
    ) -> Result<Vec<Field>, DatabaseError> {
        let visible = self.list_fields(organization_id, board, false).await?;
        let expected: HashSet<&str> = visible.iter().map(|f| f.id.as_str()).collect();
        let given: HashSet<&str> = field_ids.iter().map(String::as_str).collect();
        if given.len() != field_ids.len() || given != expected {
            return Err(DatabaseError::Validation(
                "field_ids must list every visible column exactly once".into(),
            ));
        }

        let table = board_tables(board).fields;
        let now = Utc::now();
        let tx = self.db().begin().await?;
        for (position, field_id) in (1_i64..).zip(field_ids) {
            tx.execute(
                &format!("UPDATE {table} SET position = ?1, updated_at = ?2 WHERE id = ?3"),
                libsql::params![position, now.to_rfc3339(), field_id.as_str()],
            )
            .await?;
        }
        let detail = ReorderedDetail {
            field_ids: field_ids.to_vec(),
        };
        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(organization_id),
                actor_id: Some(actor_id),
                entity_type: board.field_entity(),
                entity_id: organization_id,
                action: ActivityAction::Reordered,
                detail: Some(to_json(&detail)?),
            },
        )
        .await?;
        tx.commit().await?;

        let fields = self.list_fields(organization_id, board, false).await?;
        for field in &fields {
            self.publish(
                organization_id,
                board,
                BoardTarget::Field,
                BoardAction::Updated,
                &field.id,
                Some(to_json(field)?),
            );
        }
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{OWNER, test_org, test_service};
    use crate::updates::field::FieldUpdateBuilder;
    use pretty_assertions::assert_eq;

    pub(crate) fn text(name: &str) -> CreateFieldRequest {
        CreateFieldRequest {
            name: name.into(),
            field_type: FieldType::Text,
            options: vec![],
            required: false,
        }
    }

    #[tokio::test]
    async fn fields_are_appended_in_order() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let a = svc.create_field(OWNER, &org.id, BoardKind::Leads, &text("Name")).await.unwrap();
        let b = svc.create_field(OWNER, &org.id, BoardKind::Leads, &text("Phone")).await.unwrap();

        assert!(a.id.starts_with("lfd-"));
        assert_eq!((a.position, b.position), (1, 2));
        let names: Vec<_> = svc
            .list_fields(&org.id, BoardKind::Leads, false)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["Name", "Phone"]);
        assert!(svc.list_fields(&org.id, BoardKind::Referrals, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn select_fields_need_options() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let mut req = text("Insurance");
        req.field_type = FieldType::Select;
        assert!(matches!(
            svc.create_field(OWNER, &org.id, BoardKind::Leads, &req).await,
            Err(DatabaseError::Validation(_))
        ));

        req.options = vec![" Medicare ".into(), "Private".into()];
        let field = svc.create_field(OWNER, &org.id, BoardKind::Leads, &req).await.unwrap();
        assert_eq!(field.options, vec!["Medicare", "Private"]);

        let mut bad = text("Notes");
        bad.options = vec!["x".into()];
        assert!(svc.create_field(OWNER, &org.id, BoardKind::Leads, &bad).await.is_err());
    }

    #[tokio::test]
    async fn update_changes_only_given_attributes() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let f = svc.create_field(OWNER, &org.id, BoardKind::Referrals, &text("Source")).await.unwrap();

        let update = FieldUpdateBuilder::new().name("Referral source").required(true).build();
        let updated = svc
            .update_field(OWNER, &org.id, BoardKind::Referrals, &f.id, update)
            .await
            .unwrap();
        assert_eq!(updated.name, "Referral source");
        assert!(updated.required);
        assert_eq!(updated.field_type, FieldType::Text);
    }

    #[tokio::test]
    async fn hide_and_restore() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let a = svc.create_field(OWNER, &org.id, BoardKind::Leads, &text("A")).await.unwrap();
        let b = svc.create_field(OWNER, &org.id, BoardKind::Leads, &text("B")).await.unwrap();

        let hidden = svc.hide_field(OWNER, &org.id, BoardKind::Leads, &a.id).await.unwrap();
        assert!(hidden.hidden);
        assert_eq!(svc.list_fields(&org.id, BoardKind::Leads, false).await.unwrap().len(), 1);
        assert_eq!(svc.list_fields(&org.id, BoardKind::Leads, true).await.unwrap().len(), 2);
        assert!(matches!(
            svc.hide_field(OWNER, &org.id, BoardKind::Leads, &a.id).await,
            Err(DatabaseError::InvalidState(_))
        ));

        let restored = svc.restore_field(OWNER, &org.id, BoardKind::Leads, &a.id).await.unwrap();
        assert!(!restored.hidden);
        assert!(restored.position > b.position);
    }

    #[tokio::test]
    async fn reorder_requires_every_visible_column() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let a = svc.create_field(OWNER, &org.id, BoardKind::Leads, &text("A")).await.unwrap();
        let b = svc.create_field(OWNER, &org.id, BoardKind::Leads, &text("B")).await.unwrap();

        assert!(svc
            .reorder_fields(OWNER, &org.id, BoardKind::Leads, &[b.id.clone()])
            .await
            .is_err());

        let fields = svc
            .reorder_fields(OWNER, &org.id, BoardKind::Leads, &[b.id.clone(), a.id.clone()])
            .await
            .unwrap();
        let ids: Vec<_> = fields.into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn field_changes_reach_the_feed() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let mut rx = svc.feed().subscribe().unwrap();
        let f = svc.create_field(OWNER, &org.id, BoardKind::Leads, &text("A")).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.id, f.id);
        assert_eq!(event.target, BoardTarget::Field);
        assert_eq!(event.action, BoardAction::Created);
    }
}
