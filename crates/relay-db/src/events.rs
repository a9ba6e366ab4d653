//! Board event feed.
//!
//! A tokio broadcast channel carrying row-level board changes to WebSocket
//! subscribers. Publishing never fails a mutation: with no subscribers the
//! event is simply dropped, and slow subscribers observe `Lagged` and resync.

use relay_core::entities::BoardEvent;
use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct BoardFeed {
    sender: Option<broadcast::Sender<BoardEvent>>,
}

impl BoardFeed {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Some(sender),
        }
    }

    /// A feed that drops every event (CLI tools, seeding).
    #[must_use]
    pub const fn disabled() -> Self {
        Self { sender: None }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    pub fn publish(&self, event: BoardEvent) {
        let Some(sender) = &self.sender else {
            return;
        };
        match sender.send(event) {
            Ok(receivers) => tracing::trace!(receivers, "board event published"),
            Err(_) => tracing::trace!("board event dropped: no subscribers"),
        }
    }

    /// Subscribe to all future events. `None` when the feed is disabled.
    #[must_use]
    pub fn subscribe(&self) -> Option<broadcast::Receiver<BoardEvent>> {
        self.sender.as_ref().map(broadcast::Sender::subscribe)
    }
}

impl Default for BoardFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::enums::{BoardAction, BoardKind, BoardTarget};

    fn event(id: &str) -> BoardEvent {
        BoardEvent {
            organization_id: "org-1".into(),
            board: BoardKind::Leads,
            target: BoardTarget::Record,
            action: BoardAction::Created,
            id: id.into(),
            data: None,
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let feed = BoardFeed::default();
        let mut rx = feed.subscribe().unwrap();
        feed.publish(event("led-1"));
        assert_eq!(rx.recv().await.unwrap().id, "led-1");
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let feed = BoardFeed::default();
        feed.publish(event("led-1"));
        BoardFeed::disabled().publish(event("led-2"));
        assert!(BoardFeed::disabled().subscribe().is_none());
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let feed = BoardFeed::new(2);
        let mut rx = feed.subscribe().unwrap();
        for i in 0..5 {
            feed.publish(event(&format!("led-{i}")));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }
}
