use crate::model::{InvitationId, Ms, ReservationId, RoomId, UserId};
use crate::store::StoreError;

/// Rejections surfaced by the booking core. The first three are caller input
/// errors and map straight to user-visible validation failures; `Store` is a
/// propagated persistence failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// `start >= end`.
    InvalidInterval { start: Ms, end: Ms },
    /// The room already holds a reservation overlapping the requested span.
    OverlappingReservation(ReservationId),
    /// The creator listed themselves as a guest.
    CreatorSelfInvited(UserId),
    RoomNotFound(RoomId),
    ReservationNotFound(ReservationId),
    InvitationNotFound(InvitationId),
    Store(StoreError),
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::InvalidInterval { start, end } => {
                write!(f, "start {start} must be before end {end}")
            }
            BookingError::OverlappingReservation(id) => {
                write!(f, "overlaps existing reservation: {id}")
            }
            BookingError::CreatorSelfInvited(user) => {
                write!(f, "creator {user} cannot invite themselves")
            }
            BookingError::RoomNotFound(id) => write!(f, "room not found: {id}"),
            BookingError::ReservationNotFound(id) => write!(f, "reservation not found: {id}"),
            BookingError::InvitationNotFound(id) => write!(f, "invitation not found: {id}"),
            BookingError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for BookingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BookingError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        BookingError::Store(e)
    }
}
