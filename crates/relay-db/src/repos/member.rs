//! Member repository.
//!
//! Every organization keeps at least one owner: the last owner can be neither
//! removed nor demoted.

use chrono::Utc;
use relay_core::activity_detail::RoleChangedDetail;
use relay_core::entities::Member;
use relay_core::enums::{ActivityAction, EntityType, MemberRole};
use relay_core::ids::PREFIX_MEMBER;
use relay_core::requests::AddMemberRequest;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, to_json};
use crate::repos::activity::Activity;
use crate::service::RelayService;

const SELECT_COLS: &str = "id, organization_id, user_id, email, name, role, created_at";

fn row_to_member(row: &libsql::Row) -> Result<Member, DatabaseError> {
    Ok(Member {
        id: row.get::<String>(0)?,
        organization_id: row.get::<String>(1)?,
        user_id: row.get::<String>(2)?,
        email: row.get::<String>(3)?,
        name: get_opt_string(row, 4)?,
        role: parse_enum(&row.get::<String>(5)?)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

async fn query_members_on(
    conn: &libsql::Connection,
    sql: &str,
    params: impl libsql::params::IntoParams,
) -> Result<Vec<Member>, DatabaseError> {
    let mut rows = conn.query(sql, params).await?;
    let mut members = Vec::new();
    while let Some(row) = rows.next().await? {
        members.push(row_to_member(&row)?);
    }
    Ok(members)
}

async fn member_on(
    conn: &libsql::Connection,
    organization_id: &str,
    member_id: &str,
) -> Result<Member, DatabaseError> {
    query_members_on(
        conn,
        &format!("SELECT {SELECT_COLS} FROM members WHERE id = ?1 AND organization_id = ?2"),
        libsql::params![member_id, organization_id],
    )
    .await?
    .pop()
    .ok_or(DatabaseError::NoResult)
}

/// Count owners through `conn`. Callers pass the open transaction so the
/// count and the change that depends on it happen under one write lock.
async fn owner_count(
    conn: &libsql::Connection,
    organization_id: &str,
) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM members WHERE organization_id = ?1 AND role = 'owner'",
            [organization_id],
        )
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(row.get::<i64>(0)?)
}

impl RelayService {
    async fn query_members(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Member>, DatabaseError> {
        query_members_on(self.db().conn(), sql, params).await
    }

    /// Add a user to an organization.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the user is already a member.
    pub async fn add_member(
        &self,
        actor_id: &str,
        organization_id: &str,
        req: &AddMemberRequest,
    ) -> Result<Member, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_MEMBER).await?;
        let member = Member {
            id: id.clone(),
            organization_id: organization_id.to_string(),
            user_id: req.user_id.trim().to_string(),
            email: req.email.trim().to_string(),
            name: req.name.clone().filter(|n| !n.trim().is_empty()),
            role: req.role,
            created_at: now,
        };
        if member.user_id.is_empty() {
            return Err(DatabaseError::Validation("user_id must not be empty".into()));
        }

        let tx = self.db().begin().await?;
        tx.execute(
            "INSERT INTO members (id, organization_id, user_id, email, name, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            libsql::params![
                id.as_str(),
                organization_id,
                member.user_id.as_str(),
                member.email.as_str(),
                member.name.as_deref(),
                member.role.as_str(),
                now.to_rfc3339()
            ],
        )
        .await
        .map_err(|e| DatabaseError::from(e).unique_as("user is already a member of this organization"))?;

        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(organization_id),
                actor_id: Some(actor_id),
                entity_type: EntityType::Member,
                entity_id: &id,
                action: ActivityAction::Created,
                detail: Some(serde_json::json!({ "user_id": member.user_id, "role": member.role })),
            },
        )
        .await?;
        tx.commit().await?;
        Ok(member)
    }

    pub async fn get_member(
        &self,
        organization_id: &str,
        member_id: &str,
    ) -> Result<Member, DatabaseError> {
        member_on(self.db().conn(), organization_id, member_id).await
    }

    /// The membership of `user_id` in an organization, if any.
    pub async fn find_member(
        &self,
        organization_id: &str,
        user_id: &str,
    ) -> Result<Option<Member>, DatabaseError> {
        Ok(self
            .query_members(
                &format!(
                    "SELECT {SELECT_COLS} FROM members WHERE organization_id = ?1 AND user_id = ?2"
                ),
                libsql::params![organization_id, user_id],
            )
            .await?
            .pop())
    }

    pub async fn list_members(&self, organization_id: &str) -> Result<Vec<Member>, DatabaseError> {
        self.query_members(
            &format!(
                "SELECT {SELECT_COLS} FROM members WHERE organization_id = ?1 ORDER BY created_at, rowid"
            ),
            [organization_id],
        )
        .await
    }

    /// Members with the `liaison` role, by name.
    pub async fn list_liaisons(&self, organization_id: &str) -> Result<Vec<Member>, DatabaseError> {
        self.query_members(
            &format!(
                "SELECT {SELECT_COLS} FROM members
                 WHERE organization_id = ?1 AND role = 'liaison'
                 ORDER BY COALESCE(name, email) COLLATE NOCASE"
            ),
            [organization_id],
        )
        .await
    }

    /// Change a member's role.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` when demoting the last owner.
    pub async fn update_member_role(
        &self,
        actor_id: &str,
        organization_id: &str,
        member_id: &str,
        role: MemberRole,
    ) -> Result<Member, DatabaseError> {
        let tx = self.db().begin().await?;
        let current = member_on(&tx, organization_id, member_id).await?;
        if current.role == role {
            tx.rollback().await?;
            return Ok(current);
        }
        if current.role == MemberRole::Owner && owner_count(&tx, organization_id).await? <= 1 {
            tx.rollback().await?;
            return Err(DatabaseError::InvalidState(
                "cannot demote the last owner of an organization".into(),
            ));
        }

        let detail = RoleChangedDetail {
            from: current.role.as_str().to_string(),
            to: role.as_str().to_string(),
        };
        tx.execute(
            "UPDATE members SET role = ?1 WHERE id = ?2 AND organization_id = ?3",
            libsql::params![role.as_str(), member_id, organization_id],
        )
        .await?;
        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(organization_id),
                actor_id: Some(actor_id),
                entity_type: EntityType::Member,
                entity_id: member_id,
                action: ActivityAction::RoleChanged,
                detail: Some(to_json(&detail)?),
            },
        )
        .await?;
        tx.commit().await?;

        Ok(Member { role, ..current })
    }

    /// Remove a member. Referrals credited to them lose their liaison.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` when removing the last owner.
    pub async fn remove_member(
        &self,
        actor_id: &str,
        organization_id: &str,
        member_id: &str,
    ) -> Result<(), DatabaseError> {
        let tx = self.db().begin().await?;
        let current = member_on(&tx, organization_id, member_id).await?;
        if current.role == MemberRole::Owner && owner_count(&tx, organization_id).await? <= 1 {
            tx.rollback().await?;
            return Err(DatabaseError::InvalidState(
                "cannot remove the last owner of an organization".into(),
            ));
        }
        tx.execute(
            "DELETE FROM members WHERE id = ?1 AND organization_id = ?2",
            libsql::params![member_id, organization_id],
        )
        .await?;
        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(organization_id),
                actor_id: Some(actor_id),
                entity_type: EntityType::Member,
                entity_id: member_id,
                action: ActivityAction::Deleted,
                detail: Some(serde_json::json!({ "user_id": current.user_id })),
            },
        )
        .await?;
        tx.commit().await
    }
}
