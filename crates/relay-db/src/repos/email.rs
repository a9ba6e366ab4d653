//! Email queue repository.
//!
//! Jobs start `pending` with `next_attempt_at = now`. Each failed delivery
//! bumps `attempts` and reschedules the job; once `attempts` reaches
//! `max_attempts` the job is `failed` for good. Queue bookkeeping is not
//! written to the activity log.

use chrono::{DateTime, Utc};
use relay_core::entities::EmailJob;
use relay_core::enums::EmailStatus;
use relay_core::ids::PREFIX_EMAIL_JOB;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum};
use crate::service::RelayService;

const SELECT_COLS: &str = "id, recipient, subject, body, status, attempts, max_attempts, \
     next_attempt_at, last_error, created_at, updated_at";

fn get_u32(row: &libsql::Row, idx: i32) -> Result<u32, DatabaseError> {
    let n = row.get::<i64>(idx)?;
    u32::try_from(n).map_err(|_| DatabaseError::Query(format!("counter out of range: {n}")))
}

fn row_to_email(row: &libsql::Row) -> Result<EmailJob, DatabaseError> {
    Ok(EmailJob {
        id: row.get::<String>(0)?,
        recipient: row.get::<String>(1)?,
        subject: row.get::<String>(2)?,
        body: row.get::<String>(3)?,
        status: parse_enum(&row.get::<String>(4)?)?,
        attempts: get_u32(row, 5)?,
        max_attempts: get_u32(row, 6)?,
        next_attempt_at: parse_datetime(&row.get::<String>(7)?)?,
        last_error: get_opt_string(row, 8)?,
        created_at: parse_datetime(&row.get::<String>(9)?)?,
        updated_at: parse_datetime(&row.get::<String>(10)?)?,
    })
}

impl RelayService {
    async fn query_emails(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<EmailJob>, DatabaseError> {
        let mut rows = self.db().conn().query(sql, params).await?;
        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await? {
            jobs.push(row_to_email(&row)?);
        }
        Ok(jobs)
    }

    /// Queue an email for immediate delivery.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for an empty recipient.
    pub async fn enqueue_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<EmailJob, DatabaseError> {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(DatabaseError::Validation("email recipient must not be empty".into()));
        }
        let now = Utc::now();
        let job = EmailJob {
            id: self.db().generate_id(PREFIX_EMAIL_JOB).await?,
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            status: EmailStatus::Pending,
            attempts: 0,
            max_attempts: self.settings().email_max_attempts.max(1),
            next_attempt_at: now,
            last_error: None,
            created_at: now,
            updated_at: now,
        };

        let tx = self.db().begin().await?;
        tx.execute(
            &format!(
                "INSERT INTO email_jobs ({SELECT_COLS})
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, NULL, ?7, ?7)"
            ),
            libsql::params![
                job.id.as_str(),
                job.recipient.as_str(),
                job.subject.as_str(),
                job.body.as_str(),
                job.status.as_str(),
                i64::from(job.max_attempts),
                now.to_rfc3339()
            ],
        )
        .await?;
        tx.commit().await?;

        tracing::debug!(id = %job.id, recipient = %job.recipient, "email queued");
        Ok(job)
    }

    pub async fn get_email(&self, id: &str) -> Result<EmailJob, DatabaseError> {
        self.query_emails(&format!("SELECT {SELECT_COLS} FROM email_jobs WHERE id = ?1"), [id])
            .await?
            .pop()
            .ok_or(DatabaseError::NoResult)
    }

    /// Pending jobs whose next attempt is due at `now`, oldest first.
    pub async fn due_emails(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<EmailJob>, DatabaseError> {
        self.query_emails(
            &format!(
                "SELECT {SELECT_COLS} FROM email_jobs
                 WHERE status = 'pending' AND next_attempt_at <= ?1
                 ORDER BY next_attempt_at, rowid LIMIT ?2"
            ),
            libsql::params![now.to_rfc3339(), i64::from(limit)],
        )
        .await
    }

    pub async fn mark_email_sent(&self, id: &str) -> Result<EmailJob, DatabaseError> {
        let tx = self.db().begin().await?;
        let affected = tx
            .execute(
                "UPDATE email_jobs SET status = 'sent', attempts = attempts + 1,
                        last_error = NULL, updated_at = ?1
                 WHERE id = ?2 AND status = 'pending'",
                libsql::params![Utc::now().to_rfc3339(), id],
            )
            .await?;
        if affected == 0 {
            return Err(self.email_not_pending(id).await);
        }
        tx.commit().await?;
        self.get_email(id).await
    }

    /// Record a failed delivery. The job is retried at `next_attempt_at`
    /// unless this was its last attempt.
    pub async fn mark_email_failed(
        &self,
        id: &str,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<EmailJob, DatabaseError> {
        let tx = self.db().begin().await?;
        let affected = tx
            .execute(
                "UPDATE email_jobs SET
                     attempts = attempts + 1,
                     status = CASE WHEN attempts + 1 >= max_attempts THEN 'failed' ELSE 'pending' END,
                     last_error = ?1,
                     next_attempt_at = ?2,
                     updated_at = ?3
                 WHERE id = ?4 AND status = 'pending'",
                libsql::params![
                    error,
                    next_attempt_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    id
                ],
            )
            .await?;
        if affected == 0 {
            return Err(self.email_not_pending(id).await);
        }
        tx.commit().await?;

        let job = self.get_email(id).await?;
        if job.status == EmailStatus::Failed {
            tracing::warn!(id = %job.id, attempts = job.attempts, error, "email delivery gave up");
        }
        Ok(job)
    }

    async fn email_not_pending(&self, id: &str) -> DatabaseError {
        match self.get_email(id).await {
            Ok(job) => DatabaseError::InvalidState(format!("email {id} is already {}", job.status)),
            Err(e) => e,
        }
    }

    /// Jobs, newest first, optionally filtered by status.
    pub async fn list_emails(
        &self,
        status: Option<EmailStatus>,
        limit: Option<u32>,
    ) -> Result<Vec<EmailJob>, DatabaseError> {
        let limit = self.clamp_limit(limit);
        match status {
            Some(status) => {
                self.query_emails(
                    &format!(
                        "SELECT {SELECT_COLS} FROM email_jobs WHERE status = ?1
                         ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
                    ),
                    [status.as_str()],
                )
                .await
            }
            None => {
                self.query_emails(
                    &format!(
                        "SELECT {SELECT_COLS} FROM email_jobs
                         ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
                    ),
                    (),
                )
                .await
            }
        }
    }
}
