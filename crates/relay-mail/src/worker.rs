//! Background delivery of queued email jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use relay_config::EmailConfig;
use relay_core::entities::EmailJob;
use relay_core::enums::EmailStatus;
use relay_db::service::RelayService;
use tokio::sync::watch;

use crate::backoff::backoff_delay;
use crate::error::MailError;
use crate::transport::{EmailMessage, EmailTransport};

/// Jobs claimed per poll.
pub const DEFAULT_BATCH: u32 = 20;

/// Outcome counts of one [`EmailWorker::run_once`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub sent: u32,
    /// Failed but rescheduled.
    pub retried: u32,
    /// Failed on the last attempt.
    pub failed: u32,
}

pub struct EmailWorker {
    service: Arc<RelayService>,
    transport: Arc<dyn EmailTransport>,
    base_delay: Duration,
    max_delay: Duration,
    poll_interval: Duration,
    batch: u32,
}

impl EmailWorker {
    #[must_use]
    pub fn new(
        service: Arc<RelayService>,
        transport: Arc<dyn EmailTransport>,
        config: &EmailConfig,
    ) -> Self {
        Self {
            service,
            transport,
            base_delay: Duration::from_secs(config.base_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            batch: DEFAULT_BATCH,
        }
    }

    /// Send every job due at `now`.
    ///
    /// A delivery failure never aborts the pass; it is recorded on the job.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Database` if the queue cannot be read or updated.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<WorkerStats, MailError> {
        let mut stats = WorkerStats::default();
        for job in self.service.due_emails(now, self.batch).await? {
            match self.transport.send(&message_for(&job)).await {
                Ok(()) => {
                    self.service.mark_email_sent(&job.id).await?;
                    tracing::debug!(id = %job.id, transport = self.transport.name(), "email sent");
                    stats.sent += 1;
                }
                Err(e) => {
                    let delay = backoff_delay(job.attempts + 1, self.base_delay, self.max_delay);
                    let retry_at = now
                        + chrono::Duration::from_std(delay)
                            .unwrap_or_else(|_| chrono::Duration::days(1));
                    let updated = self
                        .service
                        .mark_email_failed(&job.id, &e.to_string(), retry_at)
                        .await?;
                    if updated.status == EmailStatus::Failed {
                        stats.failed += 1;
                    } else {
                        tracing::info!(id = %job.id, attempt = updated.attempts, %retry_at, error = %e, "email delivery failed, retrying");
                        stats.retried += 1;
                    }
                }
            }
        }
        Ok(stats)
    }

    /// Poll until `shutdown` turns true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            transport = self.transport.name(),
            interval_secs = self.poll_interval.as_secs(),
            "email worker started"
        );
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once(Utc::now()).await {
                        Ok(stats) if stats != WorkerStats::default() => {
                            tracing::debug!(?stats, "email pass finished");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "email pass failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("email worker stopped");
    }
}

fn message_for(job: &EmailJob) -> EmailMessage {
    EmailMessage {
        to: job.recipient.clone(),
        subject: job.subject.clone(),
        body: job.body.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use relay_db::events::BoardFeed;
    use relay_db::service::ServiceSettings;
    use std::sync::Mutex;

    /// Records deliveries; refuses recipients containing "bounce".
    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailTransport for FakeTransport {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            if message.to.contains("bounce") {
                return Err(MailError::Rejected {
                    status: 422,
                    body: "invalid recipient".into(),
                });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    async fn setup(max_attempts: u32) -> (Arc<RelayService>, Arc<FakeTransport>, EmailWorker) {
        let settings = ServiceSettings {
            email_max_attempts: max_attempts,
            ..ServiceSettings::default()
        };
        let svc = Arc::new(
            RelayService::new_local(":memory:", BoardFeed::disabled(), settings)
                .await
                .unwrap(),
        );
        let transport = Arc::new(FakeTransport::default());
        let worker = EmailWorker::new(svc.clone(), transport.clone(), &EmailConfig::default());
        (svc, transport, worker)
    }

    #[tokio::test]
    async fn sends_due_jobs() {
        let (svc, transport, worker) = setup(5).await;
        let message = EmailMessage {
            to: "a@example.com".into(),
            subject: "Hello".into(),
            body: "Body".into(),
        };
        let job = crate::enqueue(&svc, &message).await.unwrap();

        let stats = worker.run_once(Utc::now()).await.unwrap();

        assert_eq!(stats, WorkerStats { sent: 1, retried: 0, failed: 0 });
        assert_eq!(transport.sent.lock().unwrap().as_slice(), &[message]);
        assert_eq!(svc.get_email(&job.id).await.unwrap().status, EmailStatus::Sent);
        let again = worker.run_once(Utc::now()).await.unwrap();
        assert_eq!(again, WorkerStats::default());
    }

    #[tokio::test]
    async fn failures_back_off_then_give_up() {
        let (svc, _transport, worker) = setup(2).await;
        let job = svc.enqueue_email("bounce@example.com", "s", "b").await.unwrap();
        let now = Utc::now();

        let first = worker.run_once(now).await.unwrap();
        assert_eq!(first.retried, 1);
        let pending = svc.get_email(&job.id).await.unwrap();
        assert_eq!(pending.status, EmailStatus::Pending);
        assert_eq!(pending.attempts, 1);
        assert_eq!(pending.next_attempt_at.timestamp(), (now + chrono::Duration::seconds(30)).timestamp());
        assert!(pending.last_error.unwrap().contains("422"));

        // Not due yet.
        assert_eq!(worker.run_once(now).await.unwrap(), WorkerStats::default());

        let later = now + chrono::Duration::seconds(31);
        let second = worker.run_once(later).await.unwrap();
        assert_eq!(second.failed, 1);
        assert_eq!(svc.get_email(&job.id).await.unwrap().status, EmailStatus::Failed);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (_svc, _transport, worker) = setup(5).await;
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
