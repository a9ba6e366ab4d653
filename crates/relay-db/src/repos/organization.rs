//! Organization repository.
//!
//! Creating an organization also creates its owner membership and a trial
//! subscription, in one transaction.

use chrono::{Duration, Utc};
use relay_core::entities::{Member, Organization};
use relay_core::enums::{ActivityAction, EntityType, MemberRole, SubscriptionStatus};
use relay_core::ids::{PREFIX_MEMBER, PREFIX_ORGANIZATION, PREFIX_SUBSCRIPTION};
use relay_core::requests::CreateOrganizationRequest;
use relay_core::responses::OrganizationCreated;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime};
use crate::repos::activity::Activity;
use crate::service::RelayService;

const SELECT_COLS: &str = "id, name, slug, clerk_org_id, created_at, updated_at";

fn row_to_organization(row: &libsql::Row) -> Result<Organization, DatabaseError> {
    Ok(Organization {
        id: row.get::<String>(0)?,
        name: row.get::<String>(1)?,
        slug: row.get::<String>(2)?,
        clerk_org_id: get_opt_string(row, 3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
        updated_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

/// Lowercase ASCII alphanumerics joined by single dashes.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("org");
    }
    slug
}

fn validate_name(name: &str) -> Result<&str, DatabaseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DatabaseError::Validation(
            "organization name must not be empty".into(),
        ));
    }
    Ok(name)
}

/// First free slug for `name` (`acme`, `acme-2`, ...). Run on the open
/// transaction so the pick and the insert are not interleaved.
async fn unique_slug(conn: &libsql::Connection, name: &str) -> Result<String, DatabaseError> {
    let base = slugify(name);
    let mut candidate = base.clone();
    let mut n = 2;
    loop {
        let mut rows = conn
            .query("SELECT 1 FROM organizations WHERE slug = ?1", [candidate.as_str()])
            .await?;
        if rows.next().await?.is_none() {
            return Ok(candidate);
        }
        candidate = format!("{base}-{n}");
        n += 1;
    }
}

/// Name the column behind a UNIQUE violation on `organizations`.
fn organization_conflict(err: libsql::Error) -> DatabaseError {
    let err = DatabaseError::from(err);
    let msg = err.to_string();
    if msg.contains("organizations.clerk_org_id") {
        err.unique_as("an organization is already linked to this Clerk organization")
    } else if msg.contains("organizations.slug") {
        err.unique_as("an organization with this slug already exists")
    } else {
        err
    }
}

impl RelayService {

    /// Create an organization owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for an empty name and
    /// `DatabaseError::InvalidState` if the Clerk organization is already linked.
    pub async fn create_organization(
        &self,
        owner_id: &str,
        req: &CreateOrganizationRequest,
    ) -> Result<OrganizationCreated, DatabaseError> {
        let name = validate_name(&req.name)?;
        let clerk_org_id = req.clerk_org_id.as_deref().filter(|s| !s.is_empty());
        let now = Utc::now();
        let org_id = self.db().generate_id(PREFIX_ORGANIZATION).await?;
        let member_id = self.db().generate_id(PREFIX_MEMBER).await?;
        let sub_id = self.db().generate_id(PREFIX_SUBSCRIPTION).await?;
        let trial_end = now + Duration::days(i64::from(self.settings().trial_days));

        let tx = self.db().begin().await?;
        let slug = unique_slug(&tx, name).await?;
        tx.execute(
            "INSERT INTO organizations (id, name, slug, clerk_org_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            libsql::params![
                org_id.as_str(),
                name,
                slug.as_str(),
                clerk_org_id,
                now.to_rfc3339(),
                now.to_rfc3339()
            ],
        )
        .await
        .map_err(organization_conflict)?;

        tx.execute(
            "INSERT INTO members (id, organization_id, user_id, email, name, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            libsql::params![
                member_id.as_str(),
                org_id.as_str(),
                owner_id,
                req.owner_email.as_str(),
                req.owner_name.as_deref(),
                MemberRole::Owner.as_str(),
                now.to_rfc3339()
            ],
        )
        .await?;

        tx.execute(
            "INSERT INTO subscriptions (id, organization_id, status, current_period_end, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            libsql::params![
                sub_id.as_str(),
                org_id.as_str(),
                SubscriptionStatus::Trialing.as_str(),
                trial_end.to_rfc3339(),
                now.to_rfc3339(),
                now.to_rfc3339()
            ],
        )
        .await?;

        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(&org_id),
                actor_id: Some(owner_id),
                entity_type: EntityType::Organization,
                entity_id: &org_id,
                action: ActivityAction::Created,
                detail: Some(serde_json::json!({ "name": name, "slug": slug })),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(organization_id = %org_id, %slug, "organization created");

        Ok(OrganizationCreated {
            organization: Organization {
                id: org_id.clone(),
                name: name.to_string(),
                slug,
                clerk_org_id: clerk_org_id.map(String::from),
                created_at: now,
                updated_at: now,
            },
            owner: Member {
                id: member_id,
                organization_id: org_id,
                user_id: owner_id.to_string(),
                email: req.owner_email.clone(),
                name: req.owner_name.clone(),
                role: MemberRole::Owner,
                created_at: now,
            },
        })
    }

    pub async fn get_organization(&self, id: &str) -> Result<Organization, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM organizations WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_organization(&row)
    }

    pub async fn get_organization_by_clerk_id(
        &self,
        clerk_org_id: &str,
    ) -> Result<Organization, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM organizations WHERE clerk_org_id = ?1"),
                [clerk_org_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_organization(&row)
    }

    /// All organizations, newest first (platform admin view).
    pub async fn list_organizations(&self, limit: Option<u32>) -> Result<Vec<Organization>, DatabaseError> {
        let limit = self.clamp_limit(limit);
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM organizations ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
                ),
                (),
            )
            .await?;
        let mut orgs = Vec::new();
        while let Some(row) = rows.next().await? {
            orgs.push(row_to_organization(&row)?);
        }
        Ok(orgs)
    }

    /// Organizations `user_id` belongs to, oldest membership first.
    pub async fn list_organizations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Organization>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT o.id, o.name, o.slug, o.clerk_org_id, o.created_at, o.updated_at
                 FROM organizations o JOIN members m ON m.organization_id = o.id
                 WHERE m.user_id = ?1
                 ORDER BY m.created_at, m.rowid",
                [user_id],
            )
            .await?;
        let mut orgs = Vec::new();
        while let Some(row) = rows.next().await? {
            orgs.push(row_to_organization(&row)?);
        }
        Ok(orgs)
    }

    /// Rename an organization. The slug is kept so links stay stable.
    pub async fn update_organization(
        &self,
        actor_id: &str,
        id: &str,
        name: &str,
    ) -> Result<Organization, DatabaseError> {
        let name = validate_name(name)?;
        let current = self.get_organization(id).await?;
        let now = Utc::now();

        let tx = self.db().begin().await?;
        tx.execute(
            "UPDATE organizations SET name = ?1, updated_at = ?2 WHERE id = ?3",
            libsql::params![name, now.to_rfc3339(), id],
        )
        .await?;
        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(id),
                actor_id: Some(actor_id),
                entity_type: EntityType::Organization,
                entity_id: id,
                action: ActivityAction::Updated,
                detail: Some(serde_json::json!({ "name": { "from": current.name, "to": name } })),
            },
        )
        .await?;
        tx.commit().await?;

        Ok(Organization {
            name: name.to_string(),
            updated_at: now,
            ..current
        })
    }

    /// Delete an organization and, through `ON DELETE CASCADE`, everything it owns.
    pub async fn delete_organization(&self, actor_id: &str, id: &str) -> Result<(), DatabaseError> {
        let tx = self.db().begin().await?;
        let affected = tx
            .execute("DELETE FROM organizations WHERE id = ?1", [id])
            .await?;
        if affected == 0 {
            return Err(DatabaseError::NoResult);
        }
        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(id),
                actor_id: Some(actor_id),
                entity_type: EntityType::Organization,
                entity_id: id,
                action: ActivityAction::Deleted,
                detail: None,
            },
        )
        .await?;
        tx.commit().await?;
        tracing::info!(organization_id = %id, "organization deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{OWNER, test_org, test_service};
    use pretty_assertions::assert_eq;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Sunrise Home Health, LLC"), "sunrise-home-health-llc");
        assert_eq!(slugify("  --  "), "org");
    }

    #[tokio::test]
    async fn create_makes_owner_and_trial() {
        let svc = test_service().await;
        let (org, owner) = test_org(&svc, "Sunrise Home Health").await;

        assert!(org.id.starts_with("org-"));
        assert_eq!(org.slug, "sunrise-home-health");
        assert_eq!(owner.role, MemberRole::Owner);
        assert_eq!(owner.user_id, OWNER);

        let sub = svc.get_subscription(&org.id).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Trialing);
        let days = (sub.current_period_end.unwrap() - org.created_at).num_days();
        assert_eq!(days, 14);
    }

    #[tokio::test]
    async fn duplicate_names_get_distinct_slugs() {
        let svc = test_service().await;
        let (a, _) = test_org(&svc, "Acme").await;
        let (b, _) = test_org(&svc, "Acme").await;
        assert_eq!(a.slug, "acme");
        assert_eq!(b.slug, "acme-2");
    }

    #[tokio::test]
    async fn concurrent_same_name_creates_get_distinct_slugs() {
        let svc = test_service().await;
        let held = svc.db().begin().await.unwrap();
        let release = async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            held.commit().await.unwrap();
        };
        let ((a, _), (b, _), ()) =
            tokio::join!(test_org(&svc, "Acme"), test_org(&svc, "Acme"), release);

        let mut slugs = vec![a.slug, b.slug];
        slugs.sort();
        assert_eq!(slugs, vec!["acme".to_string(), "acme-2".to_string()]);
    }

    #[tokio::test]
    async fn slug_conflicts_are_not_reported_as_clerk_links() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Acme").await;
        let err = svc
            .db()
            .conn()
            .execute(
                "INSERT INTO organizations (id, name, slug, created_at, updated_at)
                 VALUES ('org-dup', 'Acme', ?1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                [org.slug.as_str()],
            )
            .await
            .unwrap_err();
        match organization_conflict(err) {
            DatabaseError::InvalidState(msg) => assert!(msg.contains("slug"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn clerk_org_can_only_be_linked_once() {
        let svc = test_service().await;
        let req = CreateOrganizationRequest {
            name: "Linked".into(),
            clerk_org_id: Some("org_clerk_1".into()),
            owner_email: "o@example.com".into(),
            owner_name: None,
        };
        let created = svc.create_organization(OWNER, &req).await.unwrap();
        let found = svc.get_organization_by_clerk_id("org_clerk_1").await.unwrap();
        assert_eq!(found.id, created.organization.id);

        let err = svc.create_organization(OWNER, &req).await.unwrap_err();
        match err {
            DatabaseError::InvalidState(msg) => assert!(msg.contains("Clerk"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn rename_keeps_slug() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Old Name").await;
        let renamed = svc.update_organization(OWNER, &org.id, " New Name ").await.unwrap();
        assert_eq!(renamed.name, "New Name");
        assert_eq!(renamed.slug, "old-name");
        assert!(matches!(
            svc.update_organization(OWNER, &org.id, "   ").await,
            Err(DatabaseError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn delete_cascades_to_members() {
        let svc = test_service().await;
        let (org, _) = test_org(&svc, "Doomed").await;
        svc.delete_organization(OWNER, &org.id).await.unwrap();

        assert!(svc.get_organization(&org.id).await.unwrap_err().is_not_found());
        assert!(svc.list_members(&org.id).await.unwrap().is_empty());
        assert!(svc.list_organizations_for_user(OWNER).await.unwrap().is_empty());
    }
}
