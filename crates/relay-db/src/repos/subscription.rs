//! Subscription repository.
//!
//! One row per organization. Billing webhooks overwrite the status and keep
//! any Stripe IDs they do not carry.

use chrono::{DateTime, Utc};
use relay_core::entities::Subscription;
use relay_core::enums::{ActivityAction, EntityType, SubscriptionStatus};
use relay_core::ids::PREFIX_SUBSCRIPTION;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_datetime, to_json};
use crate::repos::activity::Activity;
use crate::service::RelayService;
use crate::updates::subscription::SubscriptionUpsert;

const SELECT_COLS: &str = "id, organization_id, stripe_customer_id, stripe_subscription_id, plan, \
     status, current_period_end, created_at, updated_at";

fn row_to_subscription(row: &libsql::Row) -> Result<Subscription, DatabaseError> {
    Ok(Subscription {
        id: row.get::<String>(0)?,
        organization_id: row.get::<String>(1)?,
        stripe_customer_id: get_opt_string(row, 2)?,
        stripe_subscription_id: get_opt_string(row, 3)?,
        plan: get_opt_string(row, 4)?,
        status: parse_enum(&row.get::<String>(5)?)?,
        current_period_end: parse_optional_datetime(get_opt_string(row, 6)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

/// Whether `sub` lets its organization use the boards at `now`.
///
/// Trials stop granting access once their period has ended, even before
/// Stripe reports a new status.
#[must_use]
pub fn grants_access_at(sub: &Subscription, now: DateTime<Utc>) -> bool {
    match sub.status {
        SubscriptionStatus::Trialing => sub.current_period_end.is_none_or(|end| end > now),
        status => status.grants_access(),
    }
}

impl RelayService {
    async fn query_subscription(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<Subscription>, DatabaseError> {
        let mut rows = self.db().conn().query(sql, params).await?;
        rows.next()
            .await?
            .map(|row| row_to_subscription(&row))
            .transpose()
    }

    pub async fn get_subscription(&self, organization_id: &str) -> Result<Subscription, DatabaseError> {
        self.query_subscription(
            &format!("SELECT {SELECT_COLS} FROM subscriptions WHERE organization_id = ?1"),
            [organization_id],
        )
        .await?
        .ok_or(DatabaseError::NoResult)
    }

    /// Subscription of the organization billed under a Stripe customer.
    pub async fn find_subscription_by_customer(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Option<Subscription>, DatabaseError> {
        self.query_subscription(
            &format!("SELECT {SELECT_COLS} FROM subscriptions WHERE stripe_customer_id = ?1"),
            [stripe_customer_id],
        )
        .await
    }

    /// Insert or overwrite an organization's subscription.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if the organization does not exist.
    pub async fn upsert_subscription(
        &self,
        organization_id: &str,
        upsert: &SubscriptionUpsert,
    ) -> Result<Subscription, DatabaseError> {
        self.get_organization(organization_id).await?;
        let now = Utc::now().to_rfc3339();
        let id = self.db().generate_id(PREFIX_SUBSCRIPTION).await?;

        let tx = self.db().begin().await?;
        tx.execute(
            "INSERT INTO subscriptions (id, organization_id, stripe_customer_id, stripe_subscription_id,
                                        plan, status, current_period_end, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(organization_id) DO UPDATE SET
                 stripe_customer_id = COALESCE(excluded.stripe_customer_id, stripe_customer_id),
                 stripe_subscription_id = COALESCE(excluded.stripe_subscription_id, stripe_subscription_id),
                 plan = COALESCE(excluded.plan, plan),
                 status = excluded.status,
                 current_period_end = COALESCE(excluded.current_period_end, current_period_end),
                 updated_at = excluded.updated_at",
            libsql::params![
                id.as_str(),
                organization_id,
                upsert.stripe_customer_id.as_deref(),
                upsert.stripe_subscription_id.as_deref(),
                upsert.plan.as_deref(),
                upsert.status.as_str(),
                upsert.current_period_end.map(|t| t.to_rfc3339()),
                now.as_str()
            ],
        )
        .await
        .map_err(|e| {
            DatabaseError::from(e).unique_as("stripe subscription belongs to another organization")
        })?;
        self.record_activity(
            &tx,
            Activity {
                organization_id: Some(organization_id),
                actor_id: None,
                entity_type: EntityType::Subscription,
                entity_id: organization_id,
                action: ActivityAction::Updated,
                detail: Some(to_json(upsert)?),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(org = %organization_id, status = %upsert.status, "subscription updated");
        self.get_subscription(organization_id).await
    }

    /// Whether the organization may use the boards right now.
    pub async fn has_active_subscription(&self, organization_id: &str) -> Result<bool, DatabaseError> {
        match self.get_subscription(organization_id).await {
            Ok(sub) => Ok(grants_access_at(&sub, Utc::now())),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
