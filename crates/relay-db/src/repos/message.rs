//! Ticket message repository.

use chrono::Utc;
use relay_core::entities::TicketMessage;
use relay_core::enums::{ActivityAction, EntityType, MessageAuthor, TicketStatus};
use relay_core::ids::PREFIX_MESSAGE;

use crate::error::DatabaseError;
use crate::helpers::{get_bool, parse_datetime, parse_enum};
use crate::repos::activity::Activity;
use crate::repos::ticket::ticket_on;
use crate::service::RelayService;

fn row_to_message(row: &libsql::Row) -> Result<TicketMessage, DatabaseError> {
    Ok(TicketMessage {
        id: row.get::<String>(0)?,
        ticket_id: row.get::<String>(1)?,
        author_id: row.get::<String>(2)?,
        author: parse_enum(&row.get::<String>(3)?)?,
        body: row.get::<String>(4)?,
        internal: get_bool(row, 5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

impl RelayService {
    /// Append a message to a ticket thread.
    ///
    /// Customer messages are never internal. A customer reply to a ticket
    /// waiting on them moves it back to `in_progress`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` for closed tickets and
    /// `DatabaseError::Validation` for a blank body.
    pub async fn post_message(
        &self,
        ticket_id: &str,
        author_id: &str,
        author: MessageAuthor,
        body: &str,
        internal: bool,
    ) -> Result<TicketMessage, DatabaseError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(DatabaseError::Validation("message body must not be empty".into()));
        }
        let internal = internal && author == MessageAuthor::Staff;
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_MESSAGE).await?;

        let tx = self.db().begin().await?;
        let ticket = ticket_on(&tx, ticket_id).await?;
        if ticket.status == TicketStatus::Closed {
            tx.rollback().await?;
            return Err(DatabaseError::InvalidState(format!(
                "ticket {ticket_id} is closed"
            )));
        }
        tx.execute(
            "INSERT INTO support_ticket_messages (id, ticket_id, author_id, author_kind, body, internal, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            libsql::params![
                id.as_str(),
                ticket_id,
                author_id,
                author.as_str(),
                body,
                i64::from(internal),
                now.to_rfc3339()
            ],
        )
        .await?;
        if author == MessageAuthor::Customer && ticket.status == TicketStatus::WaitingOnCustomer {
            self.write_status(
                &tx,
                &ticket,
                TicketStatus::InProgress,
                author_id,
                Some("customer replied"),
            )
            .await?;
        } else {
            tx.execute(
                "UPDATE support_tickets SET updated_at = ?1 WHERE id = ?2",
                libsql::params![now.to_rfc3339(), ticket_id],
            )
            .await?;
        }
        self.record_activity(
            &tx,
            Activity {
                organization_id: ticket.organization_id.as_deref(),
                actor_id: Some(author_id),
                entity_type: EntityType::Message,
                entity_id: &id,
                action: ActivityAction::Created,
                detail: Some(serde_json::json!({ "ticket_id": ticket_id, "internal": internal })),
            },
        )
        .await?;
        tx.commit().await?;

        Ok(TicketMessage {
            id,
            ticket_id: ticket_id.to_string(),
            author_id: author_id.to_string(),
            author,
            body: body.to_string(),
            internal,
            created_at: now,
        })
    }

    /// Messages of a ticket, oldest first.
    pub async fn list_messages(
        &self,
        ticket_id: &str,
        include_internal: bool,
    ) -> Result<Vec<TicketMessage>, DatabaseError> {
        let internal_filter = if include_internal { "" } else { "AND internal = 0" };
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT id, ticket_id, author_id, author_kind, body, internal, created_at
                     FROM support_ticket_messages WHERE ticket_id = ?1 {internal_filter}
                     ORDER BY created_at, rowid"
                ),
                [ticket_id],
            )
            .await?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(row_to_message(&row)?);
        }
        Ok(messages)
    }
}
