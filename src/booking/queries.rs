use crate::model::*;

use super::{BookingError, Engine};

impl Engine {
    /// Full reservation, guests in creation order.
    pub async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<ReservationView, BookingError> {
        self.view(id).await
    }

    /// Reservations the user created or is invited to, ordered by start.
    pub async fn reservations_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<ReservationView>, BookingError> {
        let stored = self.store.list_reservations_for_user(user).await?;
        let mut views = Vec::with_capacity(stored.len());
        for reservation in stored {
            let guests = self.store.list_invitations(reservation.id).await?;
            views.push(ReservationView::from_parts(reservation, guests));
        }
        Ok(views)
    }

    /// Everything booked in a room, ordered by start. Unknown rooms read as
    /// empty rather than erroring, matching the other read paths.
    pub async fn room_schedule(
        &self,
        room: RoomId,
    ) -> Result<Vec<ReservationView>, BookingError> {
        let stored = self.store.room_schedule(room).await?;
        let mut views = Vec::with_capacity(stored.len());
        for reservation in stored {
            let guests = self.store.list_invitations(reservation.id).await?;
            views.push(ReservationView::from_parts(reservation, guests));
        }
        Ok(views)
    }
}
