use crate::model::{Booking, RoomState, StayRange};

// ── Availability check ───────────────────────────────────────────
//
// A room is free for a stay iff no non-cancelled booking overlaps it under
// the half-open interval test. Cancelled bookings stay in the room's history
// but never block; pending and confirmed both do, paid or not.

/// First blocking booking that overlaps `stay`, if any.
pub fn find_conflict<'a>(room: &'a RoomState, stay: &StayRange) -> Option<&'a Booking> {
    room.overlapping(stay).find(|b| b.status.blocks_room())
}

pub fn is_free(room: &RoomState, stay: &StayRange) -> bool {
    find_conflict(room, stay).is_none()
}
