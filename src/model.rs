use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. The core never interprets instants beyond ordering them.
pub type Ms = i64;

pub type RoomId = Ulid;
pub type UserId = Ulid;
pub type ReservationId = Ulid;
pub type InvitationId = Ulid;

/// Half-open interval `[start, end)`. Back-to-back reservations share an
/// instant without conflicting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// The one overlap test everything reduces to: identical intervals,
    /// start-inside, end-inside and full covers are all instances of it.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }
}

/// A guest's answer to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InviteStatus {
    Attending,
    NotAttending,
    #[default]
    Undecided,
}

/// One guest slot on a reservation. Owned by the reservation: deleted with it,
/// or when reconciliation drops the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub reservation: ReservationId,
    pub invitee: UserId,
    pub status: InviteStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub title: String,
}

/// What `find_reservations` returns: just enough for the overlap check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationSlot {
    pub id: ReservationId,
    pub span: Span,
}

/// The writable reservation fields, as the store persists them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationFields {
    pub title: String,
    pub room: RoomId,
    pub span: Span,
    pub creator: UserId,
}

/// A stored reservation without its guest list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReservation {
    pub id: ReservationId,
    pub title: String,
    pub room: RoomId,
    pub span: Span,
    pub creator: UserId,
}

/// A reservation as handed back to callers, guests in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationView {
    pub id: ReservationId,
    pub title: String,
    pub room: RoomId,
    pub span: Span,
    pub creator: UserId,
    pub guests: Vec<Invitation>,
}

impl ReservationView {
    pub fn from_parts(stored: StoredReservation, guests: Vec<Invitation>) -> Self {
        Self {
            id: stored.id,
            title: stored.title,
            room: stored.room,
            span: stored.span,
            creator: stored.creator,
            guests,
        }
    }
}

/// Structured outcome events, broadcast per room. Observability consumers
/// subscribe through the `NotifyHub`; the core never logs from inside the
/// admission or reconciliation algorithms themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingEvent {
    ReservationCreated {
        id: ReservationId,
        room: RoomId,
        span: Span,
        creator: UserId,
    },
    ReservationUpdated {
        id: ReservationId,
        room: RoomId,
        span: Span,
    },
    ReservationDeleted {
        id: ReservationId,
        room: RoomId,
    },
    GuestListChanged {
        reservation: ReservationId,
        room: RoomId,
        created: u32,
        updated: u32,
        removed: u32,
    },
    InvitationAnswered {
        id: InvitationId,
        reservation: ReservationId,
        status: InviteStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_overlap_is_half_open() {
        let a = Span::new(100, 200);
        assert!(a.overlaps(&Span::new(150, 250)));
        assert!(a.overlaps(&Span::new(100, 200))); // identical
        assert!(a.overlaps(&Span::new(0, 101))); // one ms of overlap
        assert!(a.overlaps(&Span::new(0, 400))); // covering
        assert!(!a.overlaps(&Span::new(200, 300))); // adjacent after
        assert!(!a.overlaps(&Span::new(0, 100))); // adjacent before
    }

    #[test]
    fn span_duration() {
        assert_eq!(Span::new(100, 250).duration_ms(), 150);
    }

    #[test]
    fn invite_status_defaults_to_undecided() {
        assert_eq!(InviteStatus::default(), InviteStatus::Undecided);
    }

    #[test]
    fn booking_event_json_roundtrip() {
        let event = BookingEvent::GuestListChanged {
            reservation: Ulid::new(),
            room: Ulid::new(),
            created: 2,
            updated: 1,
            removed: 0,
        };
        let json = serde_json::to_string(&event).unwrap();
        let decoded: BookingEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, decoded);
    }
}
