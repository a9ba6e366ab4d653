//! Activity log repository.
//!
//! Append-only entries recording every mutation, queried by the platform
//! admin activity view.

use chrono::Utc;
use relay_core::entities::ActivityEntry;
use relay_core::enums::{ActivityAction, EntityType};
use relay_core::ids::PREFIX_ACTIVITY;
use relay_core::requests::ActivityQuery;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_json};
use crate::service::RelayService;

/// Filter criteria for activity queries.
#[derive(Debug, Default, Clone)]
pub struct ActivityFilter {
    pub organization_id: Option<String>,
    pub actor_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub action: Option<ActivityAction>,
    pub limit: Option<u32>,
}

impl From<ActivityQuery> for ActivityFilter {
    fn from(q: ActivityQuery) -> Self {
        Self {
            organization_id: q.organization_id.filter(|s| !s.is_empty()),
            actor_id: q.actor_id.filter(|s| !s.is_empty()),
            entity_type: q.entity_type,
            entity_id: q.entity_id.filter(|s| !s.is_empty()),
            action: q.action,
            limit: q.limit,
        }
    }
}

/// An activity entry before its ID and timestamp are assigned.
pub(crate) struct Activity<'a> {
    pub organization_id: Option<&'a str>,
    pub actor_id: Option<&'a str>,
    pub entity_type: EntityType,
    pub entity_id: &'a str,
    pub action: ActivityAction,
    pub detail: Option<serde_json::Value>,
}

async fn insert_activity(
    conn: &libsql::Connection,
    entry: &ActivityEntry,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO activity_log (id, organization_id, actor_id, entity_type, entity_id, action, detail, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        libsql::params![
            entry.id.as_str(),
            entry.organization_id.as_deref(),
            entry.actor_id.as_deref(),
            entry.entity_type.as_str(),
            entry.entity_id.as_str(),
            entry.action.as_str(),
            entry.detail.as_ref().map(std::string::ToString::to_string),
            entry.created_at.to_rfc3339()
        ],
    )
    .await?;
    Ok(())
}

fn row_to_activity(row: &libsql::Row) -> Result<ActivityEntry, DatabaseError> {
    Ok(ActivityEntry {
        id: row.get::<String>(0)?,
        organization_id: get_opt_string(row, 1)?,
        actor_id: get_opt_string(row, 2)?,
        entity_type: parse_enum(&row.get::<String>(3)?)?,
        entity_id: row.get::<String>(4)?,
        action: parse_enum(&row.get::<String>(5)?)?,
        detail: parse_optional_json(get_opt_string(row, 6)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

impl RelayService {
    /// Append an activity entry on its own.
    ///
    /// Repositories log inside their own transaction; this is for callers
    /// outside the crate (e.g. billing events that touch no table).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), DatabaseError> {
        let tx = self.db().begin().await?;
        insert_activity(&tx, entry).await?;
        tx.commit().await
    }

    /// Log `activity` on `conn` (normally an open [`crate::WriteTxn`]).
    pub(crate) async fn record_activity(
        &self,
        conn: &libsql::Connection,
        activity: Activity<'_>,
    ) -> Result<(), DatabaseError> {
        let entry = ActivityEntry {
            id: self.db().generate_id(PREFIX_ACTIVITY).await?,
            organization_id: activity.organization_id.map(String::from),
            actor_id: activity.actor_id.map(String::from),
            entity_type: activity.entity_type,
            entity_id: activity.entity_id.to_string(),
            action: activity.action,
            detail: activity.detail,
            created_at: Utc::now(),
        };
        insert_activity(conn, &entry).await
    }

    /// Query activity entries with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_activity(
        &self,
        filter: &ActivityFilter,
    ) -> Result<Vec<ActivityEntry>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref org) = filter.organization_id {
            params.push(libsql::Value::Text(org.clone()));
            conditions.push(format!("organization_id = ?{}", params.len()));
        }
        if let Some(ref actor) = filter.actor_id {
            params.push(libsql::Value::Text(actor.clone()));
            conditions.push(format!("actor_id = ?{}", params.len()));
        }
        if let Some(et) = filter.entity_type {
            params.push(libsql::Value::Text(et.as_str().to_string()));
            conditions.push(format!("entity_type = ?{}", params.len()));
        }
        if let Some(ref eid) = filter.entity_id {
            params.push(libsql::Value::Text(eid.clone()));
            conditions.push(format!("entity_id = ?{}", params.len()));
        }
        if let Some(action) = filter.action {
            params.push(libsql::Value::Text(action.as_str().to_string()));
            conditions.push(format!("action = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = self.clamp_limit(filter.limit);
        let sql = format!(
            "SELECT id, organization_id, actor_id, entity_type, entity_id, action, detail, created_at
             FROM activity_log {where_clause}
             ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_activity(&row)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{OWNER, test_org, test_service};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn organization_creation_is_logged() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Sunrise").await;

        let entries = svc
            .query_activity(&ActivityFilter {
                organization_id: Some(org.id.clone()),
                entity_type: Some(EntityType::Organization),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ActivityAction::Created);
        assert_eq!(entries[0].actor_id.as_deref(), Some(OWNER));
        assert!(entries[0].id.starts_with("act-"));
    }

    #[tokio::test]
    async fn append_and_filter_by_action() {
        let svc = test_service().await;
        let entry = ActivityEntry {
            id: "act-00000001".into(),
            organization_id: None,
            actor_id: None,
            entity_type: EntityType::Subscription,
            entity_id: "sub-1".into(),
            action: ActivityAction::StatusChanged,
            detail: Some(serde_json::json!({"from": "trialing", "to": "active"})),
            created_at: Utc::now(),
        };
        svc.append_activity(&entry).await.unwrap();

        let found = svc
            .query_activity(&ActivityFilter {
                action: Some(ActivityAction::StatusChanged),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found, vec![entry]);
    }
}
