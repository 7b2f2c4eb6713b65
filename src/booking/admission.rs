use crate::model::{Ms, ReservationSlot, Span};

use super::BookingError;

/// Decide whether a proposed interval may be admitted against the other
/// reservations in the room. `existing` is what the store returned for the
/// room with the edited reservation (if any) already excluded, so a
/// reservation never conflicts with itself.
///
/// Pure read-and-decide: no side effects, no logging. The engine calls this
/// while holding the room lock so the decision and the write it gates are one
/// atomic unit.
pub fn admit(existing: &[ReservationSlot], start: Ms, end: Ms) -> Result<Span, BookingError> {
    if start >= end {
        return Err(BookingError::InvalidInterval { start, end });
    }
    let proposed = Span::new(start, end);
    for slot in existing {
        if slot.span.overlaps(&proposed) {
            return Err(BookingError::OverlappingReservation(slot.id));
        }
    }
    Ok(proposed)
}
