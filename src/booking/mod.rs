mod admission;
mod error;
mod queries;
mod reconcile;

pub use admission::admit;
pub use error::BookingError;
pub use reconcile::{GuestOp, reconcile};

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::model::*;
use crate::notify::NotifyHub;
use crate::observability;
use crate::store::ReservationStore;

/// A create request: all fields required, guests optional by being empty.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub title: String,
    pub room: RoomId,
    pub start: Ms,
    pub end: Ms,
    pub creator: UserId,
    pub guests: Vec<UserId>,
}

/// A partial update: absent fields fall back to the stored record. An absent
/// (or empty) guest list leaves existing invitations untouched.
#[derive(Debug, Clone, Default)]
pub struct ReservationPatch {
    pub title: Option<String>,
    pub room: Option<RoomId>,
    pub start: Option<Ms>,
    pub end: Option<Ms>,
    pub creator: Option<UserId>,
    pub guests: Option<Vec<UserId>>,
}

/// The single write entry point the request layer submits through.
#[derive(Debug, Clone)]
pub enum Submit {
    Create(NewReservation),
    Update(ReservationId, ReservationPatch),
}

/// Booking engine: admission + guest-list reconciliation over a pluggable
/// store. Writes to one room are serialized by a room-scoped lock held from
/// the overlap check through the last store write, so two concurrent
/// conflicting admissions cannot both win.
pub struct Engine {
    store: Arc<dyn ReservationStore>,
    pub notify: Arc<NotifyHub>,
    /// Per-room write locks. Reads bypass these entirely.
    room_locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl Engine {
    pub fn new(store: Arc<dyn ReservationStore>, notify: Arc<NotifyHub>) -> Self {
        Self {
            store,
            notify,
            room_locks: DashMap::new(),
        }
    }

    fn room_lock(&self, room: RoomId) -> Arc<Mutex<()>> {
        self.room_locks
            .entry(room)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ── Write path ───────────────────────────────────────────

    pub async fn submit_reservation(
        &self,
        submit: Submit,
    ) -> Result<ReservationView, BookingError> {
        let action = match &submit {
            Submit::Create(_) => "create",
            Submit::Update(..) => "update",
        };
        let result = match submit {
            Submit::Create(new) => self.create(new).await,
            Submit::Update(id, patch) => self.update(id, patch).await,
        };
        match &result {
            Ok(view) => {
                metrics::counter!(
                    observability::ADMISSIONS_TOTAL,
                    "action" => action,
                    "status" => "admitted"
                )
                .increment(1);
                info!(reservation = %view.id, room = %view.room, action, "reservation admitted");
            }
            Err(err) => {
                metrics::counter!(
                    observability::ADMISSIONS_TOTAL,
                    "action" => action,
                    "status" => observability::rejection_label(err)
                )
                .increment(1);
                // Caller input errors, not system faults
                debug!(%err, action, "reservation rejected");
            }
        }
        result
    }

    async fn create(&self, new: NewReservation) -> Result<ReservationView, BookingError> {
        check_self_invite(new.creator, &new.guests)?;
        if self.store.get_room(new.room).await?.is_none() {
            return Err(BookingError::RoomNotFound(new.room));
        }

        let lock = self.room_lock(new.room);
        let _guard = lock.lock().await;

        let occupants = self.store.find_reservations(new.room, None).await?;
        let span = admit(&occupants, new.start, new.end)?;

        let id = self
            .store
            .create_reservation(ReservationFields {
                title: new.title,
                room: new.room,
                span,
                creator: new.creator,
            })
            .await?;
        self.notify.send(
            new.room,
            &BookingEvent::ReservationCreated {
                id,
                room: new.room,
                span,
                creator: new.creator,
            },
        );

        self.apply_guest_plan(id, new.room, &[], &new.guests).await?;
        self.view(id).await
    }

    async fn update(
        &self,
        id: ReservationId,
        patch: ReservationPatch,
    ) -> Result<ReservationView, BookingError> {
        let current = self
            .store
            .get_reservation(id)
            .await?
            .ok_or(BookingError::ReservationNotFound(id))?;

        // Effective fields: the patch, falling back to the stored record.
        let room = patch.room.unwrap_or(current.room);
        let start = patch.start.unwrap_or(current.span.start);
        let end = patch.end.unwrap_or(current.span.end);
        let creator = patch.creator.unwrap_or(current.creator);
        let title = patch.title.unwrap_or(current.title);

        // Guard against the true creator field, patched or stored.
        if let Some(guests) = &patch.guests {
            check_self_invite(creator, guests)?;
        }
        if room != current.room && self.store.get_room(room).await?.is_none() {
            return Err(BookingError::RoomNotFound(room));
        }

        // Lock the target room: vacating the old one only frees space.
        let lock = self.room_lock(room);
        let _guard = lock.lock().await;

        let occupants = self.store.find_reservations(room, Some(id)).await?;
        let span = admit(&occupants, start, end)?;

        self.store
            .update_reservation(
                id,
                ReservationFields {
                    title,
                    room,
                    span,
                    creator,
                },
            )
            .await?;
        self.notify
            .send(room, &BookingEvent::ReservationUpdated { id, room, span });

        if let Some(guests) = patch.guests {
            let existing = self.store.list_invitations(id).await?;
            self.apply_guest_plan(id, room, &existing, &guests).await?;
        }
        self.view(id).await
    }

    /// Compute the positional reconciliation plan and apply it in order.
    async fn apply_guest_plan(
        &self,
        reservation: ReservationId,
        room: RoomId,
        existing: &[Invitation],
        requested: &[UserId],
    ) -> Result<(), BookingError> {
        let plan = reconcile(existing, requested);
        if plan.is_empty() {
            return Ok(());
        }

        let (mut created, mut updated, mut removed) = (0u32, 0u32, 0u32);
        for op in &plan {
            metrics::counter!(
                observability::GUEST_OPS_TOTAL,
                "op" => observability::guest_op_label(op)
            )
            .increment(1);
            match *op {
                GuestOp::Keep(_) => {}
                GuestOp::UpdateInvitee { invitation, invitee } => {
                    self.store.update_invitation(invitation, invitee).await?;
                    updated += 1;
                }
                GuestOp::Create { invitee } => {
                    self.store.create_invitation(reservation, invitee).await?;
                    created += 1;
                }
                GuestOp::Delete(invitation) => {
                    self.store.delete_invitation(invitation).await?;
                    removed += 1;
                }
            }
        }
        if created + updated + removed > 0 {
            self.notify.send(
                room,
                &BookingEvent::GuestListChanged {
                    reservation,
                    room,
                    created,
                    updated,
                    removed,
                },
            );
        }
        Ok(())
    }

    pub async fn delete_reservation(&self, id: ReservationId) -> Result<(), BookingError> {
        let current = self
            .store
            .get_reservation(id)
            .await?
            .ok_or(BookingError::ReservationNotFound(id))?;

        let lock = self.room_lock(current.room);
        let _guard = lock.lock().await;

        self.store.delete_reservation(id).await?;
        metrics::counter!(observability::DELETIONS_TOTAL).increment(1);
        info!(reservation = %id, room = %current.room, "reservation deleted");
        self.notify.send(
            current.room,
            &BookingEvent::ReservationDeleted {
                id,
                room: current.room,
            },
        );
        Ok(())
    }

    /// Record a guest's answer. Status only; admission is not involved.
    pub async fn answer_invitation(
        &self,
        id: InvitationId,
        status: InviteStatus,
    ) -> Result<(), BookingError> {
        let invitation = self
            .store
            .get_invitation(id)
            .await?
            .ok_or(BookingError::InvitationNotFound(id))?;
        self.store.set_invitation_status(id, status).await?;

        if let Some(reservation) = self
            .store
            .get_reservation(invitation.reservation)
            .await?
        {
            self.notify.send(
                reservation.room,
                &BookingEvent::InvitationAnswered {
                    id,
                    reservation: invitation.reservation,
                    status,
                },
            );
        }
        Ok(())
    }

    // ── Room glue ────────────────────────────────────────────

    pub async fn create_room(&self, title: &str) -> Result<Room, BookingError> {
        let id = self.store.create_room(title).await?;
        metrics::gauge!(observability::ROOMS_ACTIVE).increment(1.0);
        info!(room = %id, title, "room created");
        Ok(Room {
            id,
            title: title.into(),
        })
    }

    pub async fn rename_room(&self, id: RoomId, title: &str) -> Result<(), BookingError> {
        if self.store.get_room(id).await?.is_none() {
            return Err(BookingError::RoomNotFound(id));
        }
        self.store.rename_room(id, title).await?;
        Ok(())
    }

    /// Deletes the room and everything booked in it.
    pub async fn delete_room(&self, id: RoomId) -> Result<(), BookingError> {
        if self.store.get_room(id).await?.is_none() {
            return Err(BookingError::RoomNotFound(id));
        }
        let lock = self.room_lock(id);
        let _guard = lock.lock().await;
        self.store.delete_room(id).await?;
        metrics::gauge!(observability::ROOMS_ACTIVE).decrement(1.0);
        info!(room = %id, "room deleted");
        drop(_guard);
        self.room_locks.remove(&id);
        self.notify.remove(&id);
        Ok(())
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>, BookingError> {
        Ok(self.store.list_rooms().await?)
    }

    // ── Shared helpers ───────────────────────────────────────

    async fn view(&self, id: ReservationId) -> Result<ReservationView, BookingError> {
        let stored = self
            .store
            .get_reservation(id)
            .await?
            .ok_or(BookingError::ReservationNotFound(id))?;
        let guests = self.store.list_invitations(id).await?;
        Ok(ReservationView::from_parts(stored, guests))
    }
}

/// Reject the whole write when the creator appears in the requested guests.
fn check_self_invite(creator: UserId, guests: &[UserId]) -> Result<(), BookingError> {
    if guests.contains(&creator) {
        return Err(BookingError::CreatorSelfInvited(creator));
    }
    Ok(())
}
