use std::net::SocketAddr;

use crate::booking::{BookingError, GuestOp};

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: admission decisions. Labels: action, status.
pub const ADMISSIONS_TOTAL: &str = "huddle_admissions_total";

/// Counter: guest-list reconciliation operations applied. Labels: op.
pub const GUEST_OPS_TOTAL: &str = "huddle_guest_ops_total";

/// Counter: reservation deletions.
pub const DELETIONS_TOTAL: &str = "huddle_deletions_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: rooms known to the store.
pub const ROOMS_ACTIVE: &str = "huddle_rooms_active";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a rejection to a short status label for metrics.
pub fn rejection_label(err: &BookingError) -> &'static str {
    match err {
        BookingError::InvalidInterval { .. } => "invalid_interval",
        BookingError::OverlappingReservation(_) => "overlap",
        BookingError::CreatorSelfInvited(_) => "self_invited",
        BookingError::RoomNotFound(_) => "room_not_found",
        BookingError::ReservationNotFound(_) => "reservation_not_found",
        BookingError::InvitationNotFound(_) => "invitation_not_found",
        BookingError::Store(_) => "store_error",
    }
}

/// Map a guest operation to a label for metrics.
pub fn guest_op_label(op: &GuestOp) -> &'static str {
    match op {
        GuestOp::Keep(_) => "keep",
        GuestOp::UpdateInvitee { .. } => "update_invitee",
        GuestOp::Create { .. } => "create",
        GuestOp::Delete(_) => "delete",
    }
}
