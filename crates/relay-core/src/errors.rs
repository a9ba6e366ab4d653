//! Errors raised by core domain rules.
//!
//! Storage and transport errors live in their own crates; they convert from
//! [`CoreError`] where a rule check feeds into them.

use thiserror::Error;

use crate::enums::EntityType;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: EntityType, id: String },

    /// A status change not present in the entity's transition table.
    #[error("{entity_type} {id} cannot move from {from} to {to}")]
    InvalidTransition {
        entity_type: EntityType,
        id: String,
        from: String,
        to: String,
    },

    /// A value does not fit its declared type.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    #[must_use]
    pub fn not_found(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::TicketStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_name_the_entity() {
        assert_eq!(
            CoreError::not_found(EntityType::Ticket, "tkt-1").to_string(),
            "ticket tkt-1 not found"
        );
        let err = TicketStatus::Closed
            .check_transition("tkt-1", TicketStatus::Open)
            .unwrap_err();
        assert_eq!(err.to_string(), "ticket tkt-1 cannot move from closed to open");
    }

    #[test]
    fn anyhow_errors_pass_through() {
        let err = CoreError::from(anyhow::anyhow!("disk full"));
        assert!(matches!(err, CoreError::Other(_)));
        assert_eq!(err.to_string(), "disk full");
    }
}
