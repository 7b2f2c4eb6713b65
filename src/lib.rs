//! Meeting-room booking core: interval-overlap admission and positional
//! guest-list reconciliation over a pluggable reservation store.

pub mod booking;
pub mod model;
pub mod notify;
pub mod observability;
pub mod store;

pub use booking::{
    BookingError, Engine, GuestOp, NewReservation, ReservationPatch, Submit, admit, reconcile,
};
pub use model::{
    BookingEvent, Invitation, InvitationId, InviteStatus, Ms, ReservationId, ReservationSlot,
    ReservationView, Room, RoomId, Span, UserId,
};
pub use notify::NotifyHub;
pub use store::{MemoryStore, ReservationStore, StoreError};
