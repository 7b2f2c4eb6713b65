use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

/// Persistence-layer failure. The booking core never interprets these; they
/// propagate unchanged to the caller, which owns retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Missing { entity: &'static str, id: Ulid },
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Missing { entity, id } => write!(f, "{entity} not found in store: {id}"),
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// The persistence contract the booking core writes through.
///
/// Implementations must apply the calls the engine issues for one write
/// request as a single transaction; the engine serializes writes per room,
/// so a conforming in-process store only needs per-room isolation.
/// `list_invitations` ordering is creation order and must be stable across
/// calls within one request.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn create_room(&self, title: &str) -> Result<RoomId, StoreError>;
    async fn rename_room(&self, id: RoomId, title: &str) -> Result<(), StoreError>;
    /// Deletes the room and cascades to its reservations and invitations.
    async fn delete_room(&self, id: RoomId) -> Result<(), StoreError>;
    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, StoreError>;
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;

    /// All reservations in `room`, minus `exclude` (the one being edited).
    async fn find_reservations(
        &self,
        room: RoomId,
        exclude: Option<ReservationId>,
    ) -> Result<Vec<ReservationSlot>, StoreError>;
    async fn create_reservation(&self, fields: ReservationFields)
        -> Result<ReservationId, StoreError>;
    /// Full-field update; `fields.room` may differ from the current room.
    async fn update_reservation(
        &self,
        id: ReservationId,
        fields: ReservationFields,
    ) -> Result<(), StoreError>;
    /// Deletes the reservation and cascades to its invitations.
    async fn delete_reservation(&self, id: ReservationId) -> Result<(), StoreError>;
    async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<StoredReservation>, StoreError>;
    /// Reservations the user created or is invited to, ordered by start.
    async fn list_reservations_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<StoredReservation>, StoreError>;
    /// All reservations in a room, ordered by start.
    async fn room_schedule(&self, room: RoomId) -> Result<Vec<StoredReservation>, StoreError>;

    async fn create_invitation(
        &self,
        reservation: ReservationId,
        invitee: UserId,
    ) -> Result<InvitationId, StoreError>;
    /// Reassigns the invitee, keeping the surrogate id and the status.
    async fn update_invitation(&self, id: InvitationId, invitee: UserId)
        -> Result<(), StoreError>;
    async fn set_invitation_status(
        &self,
        id: InvitationId,
        status: InviteStatus,
    ) -> Result<(), StoreError>;
    async fn delete_invitation(&self, id: InvitationId) -> Result<(), StoreError>;
    async fn get_invitation(&self, id: InvitationId) -> Result<Option<Invitation>, StoreError>;
    /// Creation order, stable across calls.
    async fn list_invitations(
        &self,
        reservation: ReservationId,
    ) -> Result<Vec<Invitation>, StoreError>;
}

// ── In-memory reference store ────────────────────────────────────

type SharedRoomState = Arc<RwLock<RoomState>>;

#[derive(Debug, Clone)]
struct ReservationRecord {
    id: ReservationId,
    title: String,
    span: Span,
    creator: UserId,
    /// Creation order.
    invitations: Vec<Invitation>,
}

impl ReservationRecord {
    fn stored(&self, room: RoomId) -> StoredReservation {
        StoredReservation {
            id: self.id,
            title: self.title.clone(),
            room,
            span: self.span,
            creator: self.creator,
        }
    }
}

struct RoomState {
    id: RoomId,
    title: String,
    /// Sorted by `span.start`.
    reservations: Vec<ReservationRecord>,
}

impl RoomState {
    fn new(id: RoomId, title: String) -> Self {
        Self {
            id,
            title,
            reservations: Vec::new(),
        }
    }

    /// Insert keeping sort order by span.start.
    fn insert_record(&mut self, record: ReservationRecord) {
        let pos = self
            .reservations
            .binary_search_by_key(&record.span.start, |r| r.span.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, record);
    }

    fn remove_record(&mut self, id: ReservationId) -> Option<ReservationRecord> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }

    fn get(&self, id: ReservationId) -> Option<&ReservationRecord> {
        self.reservations.iter().find(|r| r.id == id)
    }

    fn get_mut(&mut self, id: ReservationId) -> Option<&mut ReservationRecord> {
        self.reservations.iter_mut().find(|r| r.id == id)
    }
}

/// Reference implementation backed by per-room state. Each trait call is one
/// uncontended in-process mutation; the engine's room lock makes the
/// check-then-write sequence atomic, so there is no observable torn state.
pub struct MemoryStore {
    rooms: DashMap<RoomId, SharedRoomState>,
    /// Reverse lookup: reservation id → room id.
    reservation_to_room: DashMap<ReservationId, RoomId>,
    /// Reverse lookup: invitation id → reservation id.
    invitation_to_reservation: DashMap<InvitationId, ReservationId>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            reservation_to_room: DashMap::new(),
            invitation_to_reservation: DashMap::new(),
        }
    }

    fn room_state(&self, id: RoomId) -> Option<SharedRoomState> {
        self.rooms.get(&id).map(|e| e.value().clone())
    }

    fn room_of_reservation(&self, id: ReservationId) -> Result<RoomId, StoreError> {
        self.reservation_to_room
            .get(&id)
            .map(|e| *e.value())
            .ok_or(StoreError::Missing {
                entity: "reservation",
                id,
            })
    }

    fn reservation_of_invitation(&self, id: InvitationId) -> Result<ReservationId, StoreError> {
        self.invitation_to_reservation
            .get(&id)
            .map(|e| *e.value())
            .ok_or(StoreError::Missing {
                entity: "invitation",
                id,
            })
    }

    /// Run `f` on the record owning invitation `id`.
    async fn with_invitation<T>(
        &self,
        id: InvitationId,
        f: impl FnOnce(&mut ReservationRecord) -> Option<T> + Send,
    ) -> Result<T, StoreError> {
        let reservation = self.reservation_of_invitation(id)?;
        let room = self.room_of_reservation(reservation)?;
        let state = self.room_state(room).ok_or(StoreError::Missing {
            entity: "room",
            id: room,
        })?;
        let mut guard = state.write().await;
        guard
            .get_mut(reservation)
            .and_then(f)
            .ok_or(StoreError::Missing {
                entity: "invitation",
                id,
            })
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn create_room(&self, title: &str) -> Result<RoomId, StoreError> {
        let id = Ulid::new();
        self.rooms
            .insert(id, Arc::new(RwLock::new(RoomState::new(id, title.into()))));
        Ok(id)
    }

    async fn rename_room(&self, id: RoomId, title: &str) -> Result<(), StoreError> {
        let state = self.room_state(id).ok_or(StoreError::Missing {
            entity: "room",
            id,
        })?;
        state.write().await.title = title.into();
        Ok(())
    }

    async fn delete_room(&self, id: RoomId) -> Result<(), StoreError> {
        let (_, state) = self.rooms.remove(&id).ok_or(StoreError::Missing {
            entity: "room",
            id,
        })?;
        let guard = state.read().await;
        for record in &guard.reservations {
            self.reservation_to_room.remove(&record.id);
            for invitation in &record.invitations {
                self.invitation_to_reservation.remove(&invitation.id);
            }
        }
        Ok(())
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        match self.room_state(id) {
            Some(state) => {
                let guard = state.read().await;
                Ok(Some(Room {
                    id: guard.id,
                    title: guard.title.clone(),
                }))
            }
            None => Ok(None),
        }
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let states: Vec<SharedRoomState> =
            self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut rooms = Vec::with_capacity(states.len());
        for state in states {
            let guard = state.read().await;
            rooms.push(Room {
                id: guard.id,
                title: guard.title.clone(),
            });
        }
        rooms.sort_by_key(|r| r.id);
        Ok(rooms)
    }

    async fn find_reservations(
        &self,
        room: RoomId,
        exclude: Option<ReservationId>,
    ) -> Result<Vec<ReservationSlot>, StoreError> {
        let Some(state) = self.room_state(room) else {
            return Ok(Vec::new());
        };
        let guard = state.read().await;
        Ok(guard
            .reservations
            .iter()
            .filter(|r| exclude != Some(r.id))
            .map(|r| ReservationSlot {
                id: r.id,
                span: r.span,
            })
            .collect())
    }

    async fn create_reservation(
        &self,
        fields: ReservationFields,
    ) -> Result<ReservationId, StoreError> {
        let state = self.room_state(fields.room).ok_or(StoreError::Missing {
            entity: "room",
            id: fields.room,
        })?;
        let id = Ulid::new();
        let mut guard = state.write().await;
        guard.insert_record(ReservationRecord {
            id,
            title: fields.title,
            span: fields.span,
            creator: fields.creator,
            invitations: Vec::new(),
        });
        self.reservation_to_room.insert(id, fields.room);
        Ok(id)
    }

    async fn update_reservation(
        &self,
        id: ReservationId,
        fields: ReservationFields,
    ) -> Result<(), StoreError> {
        let current_room = self.room_of_reservation(id)?;

        let rewrite = |record: &mut ReservationRecord| {
            record.title = fields.title.clone();
            record.span = fields.span;
            record.creator = fields.creator;
        };

        if current_room == fields.room {
            let state = self.room_state(current_room).ok_or(StoreError::Missing {
                entity: "room",
                id: current_room,
            })?;
            let mut guard = state.write().await;
            // Remove and reinsert: the span may have changed position.
            let mut record = guard.remove_record(id).ok_or(StoreError::Missing {
                entity: "reservation",
                id,
            })?;
            rewrite(&mut record);
            guard.insert_record(record);
            return Ok(());
        }

        // Room move: lock both states in sorted id order to avoid deadlocks.
        let old_state = self.room_state(current_room).ok_or(StoreError::Missing {
            entity: "room",
            id: current_room,
        })?;
        let new_state = self.room_state(fields.room).ok_or(StoreError::Missing {
            entity: "room",
            id: fields.room,
        })?;
        let (mut old_guard, mut new_guard) = if current_room < fields.room {
            let a = old_state.write().await;
            let b = new_state.write().await;
            (a, b)
        } else {
            let b = new_state.write().await;
            let a = old_state.write().await;
            (a, b)
        };
        let mut record = old_guard.remove_record(id).ok_or(StoreError::Missing {
            entity: "reservation",
            id,
        })?;
        rewrite(&mut record);
        new_guard.insert_record(record);
        self.reservation_to_room.insert(id, fields.room);
        Ok(())
    }

    async fn delete_reservation(&self, id: ReservationId) -> Result<(), StoreError> {
        let room = self.room_of_reservation(id)?;
        let state = self.room_state(room).ok_or(StoreError::Missing {
            entity: "room",
            id: room,
        })?;
        let mut guard = state.write().await;
        let record = guard.remove_record(id).ok_or(StoreError::Missing {
            entity: "reservation",
            id,
        })?;
        self.reservation_to_room.remove(&id);
        for invitation in &record.invitations {
            self.invitation_to_reservation.remove(&invitation.id);
        }
        Ok(())
    }

    async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<StoredReservation>, StoreError> {
        let Ok(room) = self.room_of_reservation(id) else {
            return Ok(None);
        };
        let Some(state) = self.room_state(room) else {
            return Ok(None);
        };
        let guard = state.read().await;
        Ok(guard.get(id).map(|r| r.stored(room)))
    }

    async fn list_reservations_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<StoredReservation>, StoreError> {
        let states: Vec<SharedRoomState> =
            self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut matches = Vec::new();
        for state in states {
            let guard = state.read().await;
            for record in &guard.reservations {
                let invited = record.invitations.iter().any(|i| i.invitee == user);
                if record.creator == user || invited {
                    matches.push(record.stored(guard.id));
                }
            }
        }
        matches.sort_by_key(|r| (r.span.start, r.id));
        Ok(matches)
    }

    async fn room_schedule(&self, room: RoomId) -> Result<Vec<StoredReservation>, StoreError> {
        let Some(state) = self.room_state(room) else {
            return Ok(Vec::new());
        };
        let guard = state.read().await;
        Ok(guard
            .reservations
            .iter()
            .map(|r| r.stored(room))
            .collect())
    }

    async fn create_invitation(
        &self,
        reservation: ReservationId,
        invitee: UserId,
    ) -> Result<InvitationId, StoreError> {
        let id = Ulid::new();
        let room = self.room_of_reservation(reservation)?;
        let state = self.room_state(room).ok_or(StoreError::Missing {
            entity: "room",
            id: room,
        })?;
        let mut guard = state.write().await;
        let record = guard
            .get_mut(reservation)
            .ok_or(StoreError::Missing {
                entity: "reservation",
                id: reservation,
            })?;
        record.invitations.push(Invitation {
            id,
            reservation,
            invitee,
            status: InviteStatus::default(),
        });
        self.invitation_to_reservation.insert(id, reservation);
        Ok(id)
    }

    async fn update_invitation(
        &self,
        id: InvitationId,
        invitee: UserId,
    ) -> Result<(), StoreError> {
        self.with_invitation(id, |record| {
            let slot = record.invitations.iter_mut().find(|i| i.id == id)?;
            slot.invitee = invitee;
            Some(())
        })
        .await
    }

    async fn set_invitation_status(
        &self,
        id: InvitationId,
        status: InviteStatus,
    ) -> Result<(), StoreError> {
        self.with_invitation(id, |record| {
            let slot = record.invitations.iter_mut().find(|i| i.id == id)?;
            slot.status = status;
            Some(())
        })
        .await
    }

    async fn delete_invitation(&self, id: InvitationId) -> Result<(), StoreError> {
        self.with_invitation(id, |record| {
            let pos = record.invitations.iter().position(|i| i.id == id)?;
            record.invitations.remove(pos);
            Some(())
        })
        .await?;
        self.invitation_to_reservation.remove(&id);
        Ok(())
    }

    async fn get_invitation(&self, id: InvitationId) -> Result<Option<Invitation>, StoreError> {
        let Ok(reservation) = self.reservation_of_invitation(id) else {
            return Ok(None);
        };
        let Ok(room) = self.room_of_reservation(reservation) else {
            return Ok(None);
        };
        let Some(state) = self.room_state(room) else {
            return Ok(None);
        };
        let guard = state.read().await;
        Ok(guard
            .get(reservation)
            .and_then(|r| r.invitations.iter().find(|i| i.id == id))
            .copied())
    }

    async fn list_invitations(
        &self,
        reservation: ReservationId,
    ) -> Result<Vec<Invitation>, StoreError> {
        let room = self.room_of_reservation(reservation)?;
        let state = self.room_state(room).ok_or(StoreError::Missing {
            entity: "room",
            id: room,
        })?;
        let guard = state.read().await;
        let record = guard.get(reservation).ok_or(StoreError::Missing {
            entity: "reservation",
            id: reservation,
        })?;
        Ok(record.invitations.clone())
    }
}
