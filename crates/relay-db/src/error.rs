//! Database error types for relay-db.

use relay_core::errors::CoreError;
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or a column could not be decoded.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// The operation is not allowed in the entity's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Input values were rejected (unknown field, wrong type, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The caller may not perform the operation on this entity.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<CoreError> for DatabaseError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { .. } => Self::NoResult,
            CoreError::InvalidTransition { .. } => Self::InvalidState(err.to_string()),
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::Other(e) => Self::Other(e),
        }
    }
}

impl DatabaseError {
    /// Whether the error means "the row does not exist".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NoResult)
    }

    /// Whether a UNIQUE constraint rejected the statement.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::LibSql(e) if e.to_string().contains("UNIQUE constraint failed"))
    }

    /// Turn a UNIQUE violation into `InvalidState(msg)`, pass anything else through.
    #[must_use]
    pub fn unique_as(self, msg: &str) -> Self {
        if self.is_unique_violation() {
            Self::InvalidState(msg.to_string())
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relay_core::enums::{EntityType, TicketStatus};

    #[test]
    fn core_errors_map_onto_database_errors() {
        assert!(DatabaseError::from(CoreError::not_found(EntityType::Lead, "led-1")).is_not_found());

        let err: DatabaseError = TicketStatus::Closed
            .check_transition("tkt-1", TicketStatus::Open)
            .unwrap_err()
            .into();
        match err {
            DatabaseError::InvalidState(msg) => {
                assert_eq!(msg, "ticket tkt-1 cannot move from closed to open");
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            DatabaseError::from(CoreError::Validation("bad".into())),
            DatabaseError::Validation(m) if m == "bad"
        ));
    }
}
