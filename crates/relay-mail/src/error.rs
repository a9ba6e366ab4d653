use relay_db::error::DatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    /// The provider could not be reached.
    #[error("email transport failed: {0}")]
    Transport(String),

    /// The provider answered with a non-2xx status.
    #[error("email provider rejected the message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
