//! Ticket rating repository.

use chrono::Utc;
use relay_core::activity_detail::RatedDetail;
use relay_core::entities::TicketRating;
use relay_core::enums::{ActivityAction, EntityType};
use relay_core::ids::PREFIX_RATING;
use relay_core::requests::RateTicketRequest;
use relay_core::responses::RatingSummary;

use crate::error::DatabaseError;
use crate::helpers::{get_count, get_opt_string, parse_datetime, to_json};
use crate::repos::activity::Activity;
use crate::repos::ticket::ticket_on;
use crate::service::RelayService;

fn row_to_rating(row: &libsql::Row) -> Result<TicketRating, DatabaseError> {
    let rating = row.get::<i64>(2)?;
    Ok(TicketRating {
        id: row.get::<String>(0)?,
        ticket_id: row.get::<String>(1)?,
        rating: u8::try_from(rating)
            .map_err(|_| DatabaseError::Query(format!("rating out of range: {rating}")))?,
        comment: get_opt_string(row, 3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
    })
}

impl RelayService {
    /// Rate a resolved or closed ticket. Only the requester may rate, once.
    ///
    /// # Errors
    ///
    /// - `DatabaseError::Forbidden` if `requester_id` did not open the ticket
    /// - `DatabaseError::InvalidState` if the ticket is still active or was
    ///   already rated
    /// - `DatabaseError::Validation` if the rating is outside 1..=5
    pub async fn rate_ticket(
        &self,
        requester_id: &str,
        ticket_id: &str,
        req: &RateTicketRequest,
    ) -> Result<TicketRating, DatabaseError> {
        if !(1..=5).contains(&req.rating) {
            return Err(DatabaseError::Validation("rating must be between 1 and 5".into()));
        }
        let rating = TicketRating {
            id: self.db().generate_id(PREFIX_RATING).await?,
            ticket_id: ticket_id.to_string(),
            rating: req.rating,
            comment: req
                .comment
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from),
            created_at: Utc::now(),
        };

        let tx = self.db().begin().await?;
        let ticket = ticket_on(&tx, ticket_id).await?;
        if ticket.requester_id != requester_id {
            tx.rollback().await?;
            return Err(DatabaseError::Forbidden(
                "only the requester can rate a ticket".into(),
            ));
        }
        if !ticket.status.is_finished() {
            tx.rollback().await?;
            return Err(DatabaseError::InvalidState(format!(
                "ticket {ticket_id} is {} and cannot be rated yet",
                ticket.status
            )));
        }
        tx.execute(
            "INSERT INTO ticket_ratings (id, ticket_id, rating, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            libsql::params![
                rating.id.as_str(),
                ticket_id,
                i64::from(rating.rating),
                rating.comment.as_deref(),
                rating.created_at.to_rfc3339()
            ],
        )
        .await
        .map_err(|e| DatabaseError::from(e).unique_as("ticket has already been rated"))?;
        self.record_activity(
            &tx,
            Activity {
                organization_id: ticket.organization_id.as_deref(),
                actor_id: Some(requester_id),
                entity_type: EntityType::Rating,
                entity_id: &rating.id,
                action: ActivityAction::Rated,
                detail: Some(to_json(&RatedDetail {
                    rating: rating.rating,
                })?),
            },
        )
        .await?;
        tx.commit().await?;
        Ok(rating)
    }

    pub async fn get_rating(&self, ticket_id: &str) -> Result<Option<TicketRating>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id, ticket_id, rating, comment, created_at FROM ticket_ratings WHERE ticket_id = ?1",
                [ticket_id],
            )
            .await?;
        rows.next().await?.map(|row| row_to_rating(&row)).transpose()
    }

    /// Count, average and star distribution over all ratings.
    pub async fn rating_summary(&self) -> Result<RatingSummary, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT rating, COUNT(*) FROM ticket_ratings GROUP BY rating",
                (),
            )
            .await?;
        let mut distribution = [0_u64; 5];
        while let Some(row) = rows.next().await? {
            let stars = row.get::<i64>(0)?;
            let slot = usize::try_from(stars - 1)
                .ok()
                .and_then(|i| distribution.get_mut(i))
                .ok_or_else(|| DatabaseError::Query(format!("rating out of range: {stars}")))?;
            *slot = get_count(&row, 1)?;
        }

        let count: u64 = distribution.iter().sum();
        let weighted: u64 = (1_u64..).zip(distribution).map(|(stars, n)| stars * n).sum();
        #[allow(clippy::cast_precision_loss)]
        let average = (count > 0).then(|| weighted as f64 / count as f64);
        Ok(RatingSummary {
            count,
            average,
            distribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::ticket::tests::{ADMIN, REQUESTER, open_ticket};
    use crate::test_support::test_service;
    use pretty_assertions::assert_eq;
    use relay_core::enums::TicketStatus;

    fn stars(rating: u8) -> RateTicketRequest {
        RateTicketRequest {
            rating,
            comment: Some("  quick fix ".into()),
        }
    }

    #[tokio::test]
    async fn only_finished_tickets_can_be_rated_once() {
        let svc = test_service().await;
        let ticket = open_ticket(&svc).await;

        let early = svc.rate_ticket(REQUESTER, &ticket.id, &stars(5)).await;
        assert!(matches!(early, Err(DatabaseError::InvalidState(_))));

        svc.transition_ticket(ADMIN, &ticket.id, TicketStatus::Resolved, None)
            .await
            .unwrap();
        let stranger = svc.rate_ticket(ADMIN, &ticket.id, &stars(5)).await;
        assert!(matches!(stranger, Err(DatabaseError::Forbidden(_))));

        let rating = svc.rate_ticket(REQUESTER, &ticket.id, &stars(4)).await.unwrap();
        assert_eq!(rating.comment.as_deref(), Some("quick fix"));
        assert_eq!(svc.get_rating(&ticket.id).await.unwrap(), Some(rating));

        let again = svc.rate_ticket(REQUESTER, &ticket.id, &stars(1)).await;
        assert!(matches!(again, Err(DatabaseError::InvalidState(_))), "{again:?}");
    }

    #[tokio::test]
    async fn rating_waits_for_a_pending_reopen() {
        let svc = test_service().await;
        let ticket = open_ticket(&svc).await;
        svc.transition_ticket(ADMIN, &ticket.id, TicketStatus::Resolved, None)
            .await
            .unwrap();

        let held = svc.db().begin().await.unwrap();
        let reopen = async {
            svc.transition_ticket(REQUESTER, &ticket.id, TicketStatus::Open, None)
                .await
        };
        let release = async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            held.commit().await.unwrap();
        };
        let five = stars(5);
        let (reopened, rated, ()) = tokio::join!(
            reopen,
            svc.rate_ticket(REQUESTER, &ticket.id, &five),
            release,
        );

        reopened.unwrap();
        assert!(matches!(rated, Err(DatabaseError::InvalidState(_))), "{rated:?}");
        assert_eq!(svc.get_rating(&ticket.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn summary_counts_and_averages() {
        let svc = test_service().await;
        let empty = svc.rating_summary().await.unwrap();
        assert_eq!((empty.count, empty.average), (0, None));

        for rating in [5, 4, 4] {
            let ticket = open_ticket(&svc).await;
            svc.transition_ticket(ADMIN, &ticket.id, TicketStatus::Closed, None)
                .await
                .unwrap();
            svc.rate_ticket(REQUESTER, &ticket.id, &stars(rating)).await.unwrap();
        }

        let summary = svc.rating_summary().await.unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.distribution, [0, 0, 0, 2, 1]);
        let average = summary.average.unwrap();
        assert!((average - 13.0 / 3.0).abs() < 1e-9);
    }
}
