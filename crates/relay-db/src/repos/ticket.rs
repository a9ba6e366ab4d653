//! Support ticket repository.
//!
//! Status changes follow [`TicketStatus::allowed_next_states`]. `resolved_at`
//! is set when a ticket is resolved and cleared when it is reopened.

use chrono::Utc;
use relay_core::activity_detail::{AssignedDetail, StatusChangedDetail};
use relay_core::entities::{SupportTicket, TicketMessage};
use relay_core::enums::{
    ActivityAction, EntityType, MessageAuthor, TicketPriority, TicketStatus,
};
use relay_core::errors::CoreError;
use relay_core::ids::{PREFIX_MESSAGE, PREFIX_TICKET};
use relay_core::requests::{AdminTicketUpdateRequest, CreateTicketRequest, TicketQuery};
use relay_core::responses::TicketThread;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_datetime, to_json};
use crate::repos::activity::Activity;
use crate::service::RelayService;

const SELECT_COLS: &str = "id, organization_id, requester_id, requester_email, subject, category, \
     priority, status, assignee_id, created_at, updated_at, resolved_at";

/// Filter criteria for the admin ticket list.
#[derive(Debug, Default, Clone)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assignee_id: Option<String>,
    pub organization_id: Option<String>,
    pub limit: Option<u32>,
}

impl From<TicketQuery> for TicketFilter {
    fn from(q: TicketQuery) -> Self {
        Self {
            status: q.status,
            priority: q.priority,
            assignee_id: q.assignee_id.filter(|s| !s.is_empty()),
            organization_id: q.organization_id.filter(|s| !s.is_empty()),
            limit: q.limit,
        }
    }
}

fn row_to_ticket(row: &libsql::Row) -> Result<SupportTicket, DatabaseError> {
    Ok(SupportTicket {
        id: row.get::<String>(0)?,
        organization_id: get_opt_string(row, 1)?,
        requester_id: row.get::<String>(2)?,
        requester_email: row.get::<String>(3)?,
        subject: row.get::<String>(4)?,
        category: parse_enum(&row.get::<String>(5)?)?,
        priority: parse_enum(&row.get::<String>(6)?)?,
        status: parse_enum(&row.get::<String>(7)?)?,
        assignee_id: get_opt_string(row, 8)?,
        created_at: parse_datetime(&row.get::<String>(9)?)?,
        updated_at: parse_datetime(&row.get::<String>(10)?)?,
        resolved_at: parse_optional_datetime(get_opt_string(row, 11)?.as_deref())?,
    })
}

async fn query_tickets_on(
    conn: &libsql::Connection,
    sql: &str,
    params: impl libsql::params::IntoParams,
) -> Result<Vec<SupportTicket>, DatabaseError> {
    let mut rows = conn.query(sql, params).await?;
    let mut tickets = Vec::new();
    while let Some(row) = rows.next().await? {
        tickets.push(row_to_ticket(&row)?);
    }
    Ok(tickets)
}

/// Load one ticket through `conn`; pass the open transaction to read under
/// the write lock.
pub(crate) async fn ticket_on(
    conn: &libsql::Connection,
    ticket_id: &str,
) -> Result<SupportTicket, DatabaseError> {
    query_tickets_on(
        conn,
        &format!("SELECT {SELECT_COLS} FROM support_tickets WHERE id = ?1"),
        [ticket_id],
    )
    .await?
    .pop()
    .ok_or_else(|| CoreError::not_found(EntityType::Ticket, ticket_id).into())
}

/// Result of [`RelayService::update_ticket`].
#[derive(Debug, Clone, PartialEq)]
pub struct TicketUpdate {
    pub ticket: SupportTicket,
    /// Whether the status moved, i.e. the requester should be told.
    pub status_changed: bool,
}

impl RelayService {
    async fn query_tickets(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<SupportTicket>, DatabaseError> {
        query_tickets_on(self.db().conn(), sql, params).await
    }

    /// Open a ticket together with the requester's first message.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for a blank subject or message.
    pub async fn create_ticket(
        &self,
        requester_id: &str,
        organization_id: Option<&str>,
        req: &CreateTicketRequest,
    ) -> Result<TicketThread, DatabaseError> {
        let subject = req.subject.trim();
        let body = req.message.trim();
        if subject.is_empty() || body.is_empty() {
            return Err(DatabaseError::Validation(
                "subject and message must not be empty".into(),
            ));
        }

        let now = Utc::now();
        let ticket_id = self.db().generate_id(PREFIX_TICKET).await?;
        let message_id = self.db().generate_id(PREFIX_MESSAGE).await?;

        let ticket = SupportTicket {
            id: ticket_id.clone(),
            organization_id: organization_id.map(String::from),
            requester_id: requester_id.to_string(),
            requester_email: req.email.trim().to_string(),
            subject: subject.to_string(),
            category: req.category,
            priority: req.priority,
            status: TicketStatus::Open,
            assignee_id: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        };
        let message = TicketMessage {
            id: message_id.clone(),
            ticket_id: ticket_id.clone(),
            author_id: requester_id.to_string(),
            author: MessageAuthor::Customer,
            body: body.to_string(),
            internal: false,
            created_at: now,
        };

        let tx = self.db().begin().await?;
        tx.execute(
            &format!(
                "INSERT INTO support_tickets ({SELECT_COLS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?10, NULL)"
            ),
            libsql::params![
                ticket_id.as_str(),
                organization_id,
                requester_id,
                ticket.requester_email.as_str(),
                ticket.subject.as_str(),
                ticket.category.as_str(),
                ticket.priority.as_str(),
                ticket.status.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339()
            ],
        )
        .await?;
        tx.execute(
            "INSERT INTO support_ticket_messages (id, ticket_id, author_id, author_kind, body, internal, created_at)
             VALUES (?1, ?2, ?3, 'customer', ?4, 0, ?5)",
            libsql::params![
                message_id.as_str(),
                ticket_id.as_str(),
                requester_id,
                message.body.as_str(),
                now.to_rfc3339()
            ],
        )
        .await?;
        self.record_activity(
            &tx,
            Activity {
                organization_id,
                actor_id: Some(requester_id),
                entity_type: EntityType::Ticket,
                entity_id: &ticket_id,
                action: ActivityAction::Created,
                detail: Some(serde_json::json!({
                    "category": ticket.category,
                    "priority": ticket.priority,
                })),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(ticket = %ticket_id, "support ticket opened");
        Ok(TicketThread {
            ticket,
            messages: vec![message],
            rating: None,
        })
    }

    pub async fn get_ticket(&self, ticket_id: &str) -> Result<SupportTicket, DatabaseError> {
        ticket_on(self.db().conn(), ticket_id).await
    }

    /// A ticket with its messages and rating.
    pub async fn ticket_thread(
        &self,
        ticket_id: &str,
        include_internal: bool,
    ) -> Result<TicketThread, DatabaseError> {
        Ok(TicketThread {
            ticket: self.get_ticket(ticket_id).await?,
            messages: self.list_messages(ticket_id, include_internal).await?,
            rating: self.get_rating(ticket_id).await?,
        })
    }

    /// Tickets opened by one user, newest first.
    pub async fn list_tickets_for_requester(
        &self,
        requester_id: &str,
    ) -> Result<Vec<SupportTicket>, DatabaseError> {
        self.query_tickets(
            &format!(
                "SELECT {SELECT_COLS} FROM support_tickets WHERE requester_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ),
            [requester_id],
        )
        .await
    }

    /// Tickets matching `filter`, most recently updated first.
    pub async fn list_tickets(
        &self,
        filter: &TicketFilter,
    ) -> Result<Vec<SupportTicket>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(status) = filter.status {
            params.push(status.as_str().into());
            conditions.push(format!("status = ?{}", params.len()));
        }
        if let Some(priority) = filter.priority {
            params.push(priority.as_str().into());
            conditions.push(format!("priority = ?{}", params.len()));
        }
        if let Some(ref assignee) = filter.assignee_id {
            params.push(assignee.clone().into());
            conditions.push(format!("assignee_id = ?{}", params.len()));
        }
        if let Some(ref org) = filter.organization_id {
            params.push(org.clone().into());
            conditions.push(format!("organization_id = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit = self.clamp_limit(filter.limit);
        self.query_tickets(
            &format!(
                "SELECT {SELECT_COLS} FROM support_tickets {where_clause}
                 ORDER BY updated_at DESC, rowid DESC LIMIT {limit}"
            ),
            libsql::params_from_iter(params),
        )
        .await
    }

    /// Move a ticket to `to`.
    ///
    /// The current status is read under the write lock, so concurrent
    /// transitions are checked against each other's results.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the transition is not allowed.
    pub async fn transition_ticket(
        &self,
        actor_id: &str,
        ticket_id: &str,
        to: TicketStatus,
        reason: Option<&str>,
    ) -> Result<SupportTicket, DatabaseError> {
        let tx = self.db().begin().await?;
        let current = ticket_on(&tx, ticket_id).await?;
        if let Err(e) = current.status.check_transition(ticket_id, to) {
            tx.rollback().await?;
            return Err(e.into());
        }
        let ticket = self.write_status(&tx, &current, to, actor_id, reason).await?;
        tx.commit().await?;

        tracing::info!(ticket = %ticket_id, from = %current.status, to = %to, "ticket status changed");
        Ok(ticket)
    }

    /// Apply an admin edit (status, priority, assignee) in one transaction.
    ///
    /// Unchanged fields are skipped. Nothing is written if the status change
    /// is rejected.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the status transition is not
    /// allowed.
    pub async fn update_ticket(
        &self,
        actor_id: &str,
        ticket_id: &str,
        req: &AdminTicketUpdateRequest,
    ) -> Result<TicketUpdate, DatabaseError> {
        let tx = self.db().begin().await?;
        let mut ticket = ticket_on(&tx, ticket_id).await?;
        let mut status_changed = false;

        if let Some(status) = req.status.filter(|s| *s != ticket.status) {
            if let Err(e) = ticket.status.check_transition(ticket_id, status) {
                tx.rollback().await?;
                return Err(e.into());
            }
            ticket = self.write_status(&tx, &ticket, status, actor_id, None).await?;
            status_changed = true;
        }
        if let Some(priority) = req.priority.filter(|p| *p != ticket.priority) {
            ticket = self.write_priority(&tx, &ticket, priority, actor_id).await?;
        }
        if let Some(assignee) = req.assignee_id.as_deref() {
            let assignee = Some(assignee).filter(|s| !s.is_empty());
            if assignee != ticket.assignee_id.as_deref() {
                ticket = self.write_assignee(&tx, &ticket, assignee, actor_id).await?;
            }
        }
        tx.commit().await?;

        Ok(TicketUpdate {
            ticket,
            status_changed,
        })
    }

    /// Status UPDATE plus its activity entry, on an open transaction.
    ///
    /// `resolved_at` is stamped on resolve and cleared on reopen.
    pub(crate) async fn write_status(
        &self,
        conn: &libsql::Connection,
        current: &SupportTicket,
        to: TicketStatus,
        actor_id: &str,
        reason: Option<&str>,
    ) -> Result<SupportTicket, DatabaseError> {
        let now = Utc::now();
        let resolved_at = match to {
            TicketStatus::Resolved => Some(now),
            TicketStatus::Open => None,
            _ => current.resolved_at,
        };
        conn.execute(
            "UPDATE support_tickets SET status = ?1, resolved_at = ?2, updated_at = ?3 WHERE id = ?4",
            libsql::params![
                to.as_str(),
                resolved_at.map(|t| t.to_rfc3339()),
                now.to_rfc3339(),
                current.id.as_str()
            ],
        )
        .await?;
        let detail = StatusChangedDetail {
            from: current.status.as_str().to_string(),
            to: to.as_str().to_string(),
            reason: reason.map(String::from),
        };
        self.record_activity(
            conn,
            Activity {
                organization_id: current.organization_id.as_deref(),
                actor_id: Some(actor_id),
                entity_type: EntityType::Ticket,
                entity_id: &current.id,
                action: ActivityAction::StatusChanged,
                detail: Some(to_json(&detail)?),
            },
        )
        .await?;
        Ok(SupportTicket {
            status: to,
            updated_at: now,
            resolved_at,
            ..current.clone()
        })
    }

    async fn write_priority(
        &self,
        conn: &libsql::Connection,
        current: &SupportTicket,
        priority: TicketPriority,
        actor_id: &str,
    ) -> Result<SupportTicket, DatabaseError> {
        let now = Utc::now();
        conn.execute(
            "UPDATE support_tickets SET priority = ?1, updated_at = ?2 WHERE id = ?3",
            libsql::params![priority.as_str(), now.to_rfc3339(), current.id.as_str()],
        )
        .await?;
        self.record_activity(
            conn,
            Activity {
                organization_id: current.organization_id.as_deref(),
                actor_id: Some(actor_id),
                entity_type: EntityType::Ticket,
                entity_id: &current.id,
                action: ActivityAction::Updated,
                detail: Some(serde_json::json!({
                    "priority": { "from": current.priority, "to": priority },
                })),
            },
        )
        .await?;
        Ok(SupportTicket {
            priority,
            updated_at: now,
            ..current.clone()
        })
    }

    async fn write_assignee(
        &self,
        conn: &libsql::Connection,
        current: &SupportTicket,
        assignee_id: Option<&str>,
        actor_id: &str,
    ) -> Result<SupportTicket, DatabaseError> {
        let now = Utc::now();
        let detail = AssignedDetail {
            assignee_id: assignee_id.map(String::from),
        };
        conn.execute(
            "UPDATE support_tickets SET assignee_id = ?1, updated_at = ?2 WHERE id = ?3",
            libsql::params![assignee_id, now.to_rfc3339(), current.id.as_str()],
        )
        .await?;
        self.record_activity(
            conn,
            Activity {
                organization_id: current.organization_id.as_deref(),
                actor_id: Some(actor_id),
                entity_type: EntityType::Ticket,
                entity_id: &current.id,
                action: ActivityAction::Assigned,
                detail: Some(to_json(&detail)?),
            },
        )
        .await?;
        Ok(SupportTicket {
            assignee_id: detail.assignee_id,
            updated_at: now,
            ..current.clone()
        })
    }

    /// Assign a ticket to a platform admin, or unassign with `None`.
    pub async fn assign_ticket(
        &self,
        actor_id: &str,
        ticket_id: &str,
        assignee_id: Option<&str>,
    ) -> Result<SupportTicket, DatabaseError> {
        let tx = self.db().begin().await?;
        let current = ticket_on(&tx, ticket_id).await?;
        let ticket = self.write_assignee(&tx, &current, assignee_id, actor_id).await?;
        tx.commit().await?;
        Ok(ticket)
    }

    pub async fn set_ticket_priority(
        &self,
        actor_id: &str,
        ticket_id: &str,
        priority: TicketPriority,
    ) -> Result<SupportTicket, DatabaseError> {
        let tx = self.db().begin().await?;
        let current = ticket_on(&tx, ticket_id).await?;
        if current.priority == priority {
            tx.rollback().await?;
            return Ok(current);
        }
        let ticket = self.write_priority(&tx, &current, priority, actor_id).await?;
        tx.commit().await?;
        Ok(ticket)
    }
}
