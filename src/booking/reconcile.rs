use crate::model::{Invitation, InvitationId, UserId};

/// One step of converging a stored guest list to a requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestOp {
    /// Position unchanged, nothing to write.
    Keep(InvitationId),
    /// Reassign the slot to a new invitee; the surrogate id and the
    /// invitee's recorded answer survive.
    UpdateInvitee {
        invitation: InvitationId,
        invitee: UserId,
    },
    /// New slot at the tail, status starts undecided.
    Create { invitee: UserId },
    /// Slot no longer requested.
    Delete(InvitationId),
}

/// Positional reconciliation of a reservation's guest list.
///
/// Slots are matched by index, never by invitee identity: shuffling the same
/// invitees produces `UpdateInvitee` ops but the same final membership, and
/// surrogate invitation ids stay stable under reassignment. An empty
/// `requested` list means the request did not touch the guest field —
/// existing invitations are left alone (explicit-empty and omission are
/// equivalent here).
///
/// Never rejects; business-rule validation happens before this is called.
pub fn reconcile(existing: &[Invitation], requested: &[UserId]) -> Vec<GuestOp> {
    if requested.is_empty() {
        return Vec::new();
    }

    let mut ops = Vec::with_capacity(existing.len().max(requested.len()));

    // Shared prefix: reassign in place.
    for (slot, &invitee) in existing.iter().zip(requested) {
        if slot.invitee == invitee {
            ops.push(GuestOp::Keep(slot.id));
        } else {
            ops.push(GuestOp::UpdateInvitee {
                invitation: slot.id,
                invitee,
            });
        }
    }
    // More requested than stored: grow at the tail.
    for &invitee in requested.iter().skip(existing.len()) {
        ops.push(GuestOp::Create { invitee });
    }
    // Fewer requested than stored: trim the tail.
    for slot in existing.iter().skip(requested.len()) {
        ops.push(GuestOp::Delete(slot.id));
    }

    ops
}
