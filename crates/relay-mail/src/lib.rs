//! # relay-mail
//!
//! Transactional email for Relay.
//!
//! Mutations never talk to the provider directly: they render a template and
//! queue it with [`enqueue`]. The [`worker::EmailWorker`] drains the queue,
//! sending through an [`transport::EmailTransport`] and rescheduling failures
//! with [`backoff::backoff_delay`].

pub mod backoff;
pub mod error;
pub mod templates;
pub mod transport;
pub mod worker;

pub use error::MailError;
pub use transport::{EmailMessage, EmailTransport};

use relay_core::entities::EmailJob;
use relay_db::service::RelayService;

/// Queue a rendered message for delivery.
///
/// # Errors
///
/// Returns `MailError::Database` if the job cannot be stored.
pub async fn enqueue(service: &RelayService, message: &EmailMessage) -> Result<EmailJob, MailError> {
    Ok(service
        .enqueue_email(&message.to, &message.subject, &message.body)
        .await?)
}
