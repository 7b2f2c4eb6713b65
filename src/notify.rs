use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{BookingEvent, RoomId};

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for booking outcomes, one channel per room. This is the seam
/// observability collaborators consume; the core emits events here instead of
/// logging from inside its algorithms.
pub struct NotifyHub {
    channels: DashMap<RoomId, broadcast::Sender<BookingEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a room. Creates the channel if needed.
    pub fn subscribe(&self, room: RoomId) -> broadcast::Receiver<BookingEvent> {
        let sender = self
            .channels
            .entry(room)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send an event. No-op if nobody is listening.
    pub fn send(&self, room: RoomId, event: &BookingEvent) {
        if let Some(sender) = self.channels.get(&room) {
            let _ = sender.send(event.clone());
        }
    }

    /// Remove a channel (when the room is deleted).
    pub fn remove(&self, room: &RoomId) {
        self.channels.remove(room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Span;
    use ulid::Ulid;

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let room = Ulid::new();
        let mut rx = hub.subscribe(room);

        let event = BookingEvent::ReservationCreated {
            id: Ulid::new(),
            room,
            span: Span::new(100, 200),
            creator: Ulid::new(),
        };
        hub.send(room, &event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        let room = Ulid::new();
        // No subscriber — should not panic
        hub.send(
            room,
            &BookingEvent::ReservationDeleted {
                id: Ulid::new(),
                room,
            },
        );
    }
}
