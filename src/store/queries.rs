use ulid::Ulid;

use crate::model::*;

use super::{availability, SharedRoomState, Store, StoreError};

impl Store {
    /// True iff no non-cancelled booking on the room overlaps the stay.
    /// Read-only; repeated calls with no intervening writes agree.
    pub async fn check_availability(
        &self,
        room_id: Ulid,
        stay: StayRange,
    ) -> Result<bool, StoreError> {
        if stay.nights() <= 0 {
            return Err(StoreError::InvalidRange);
        }
        let rs = self.get_room(&room_id).ok_or(StoreError::NotFound(room_id))?;
        let guard = rs.read().await;
        Ok(availability::is_free(&guard, &stay))
    }

    /// All bookings of one user, newest first, room and hotel resolved.
    pub async fn user_bookings(&self, user_id: &str) -> Vec<BookingDetails> {
        let ids = self
            .bookings_by_user
            .get(user_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(room_id) = self.room_for_booking(&id) else { continue };
            let Some(rs) = self.get_room(&room_id) else { continue };
            let guard = rs.read().await;
            if let Some(b) = guard.booking(&id)
                && let Some(details) = self.booking_details(b, &guard, false) {
                    out.push(details);
                }
        }
        sort_newest_first(&mut out);
        out
    }

    /// Owner dashboard: every booking across the owner's hotel, newest first,
    /// with guest details, plus count and revenue. Revenue sums all listed
    /// non-cancelled bookings, paid or not.
    pub async fn hotel_dashboard(&self, owner: &str) -> Result<Dashboard, StoreError> {
        let hotel_id = self.hotel_for_owner(owner).ok_or(StoreError::NoHotel)?;
        let room_ids = self
            .rooms_by_hotel
            .get(&hotel_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();

        let mut bookings = Vec::new();
        for room_id in room_ids {
            let Some(rs) = self.get_room(&room_id) else { continue };
            let guard = rs.read().await;
            for b in &guard.bookings {
                if let Some(details) = self.booking_details(b, &guard, true) {
                    bookings.push(details);
                }
            }
        }
        sort_newest_first(&mut bookings);

        let total_revenue = bookings
            .iter()
            .filter(|b| b.status != BookingStatus::Cancelled)
            .map(|b| b.total_price)
            .sum();

        Ok(Dashboard {
            total_bookings: bookings.len(),
            total_revenue,
            bookings,
        })
    }

    pub fn list_hotels(&self) -> Vec<HotelInfo> {
        let mut hotels: Vec<HotelInfo> =
            self.hotels.iter().map(|e| HotelInfo::from(e.value())).collect();
        hotels.sort_by_key(|h| h.id);
        hotels
    }

    pub fn my_hotel(&self, owner: &str) -> Result<HotelInfo, StoreError> {
        let hotel_id = self.hotel_for_owner(owner).ok_or(StoreError::NoHotel)?;
        self.get_hotel(&hotel_id)
            .map(|h| HotelInfo::from(&h))
            .ok_or(StoreError::NoHotel)
    }

    /// Public browse listing: rooms currently flagged available, each with
    /// its hotel resolved.
    pub async fn available_rooms(&self) -> Vec<RoomListing> {
        let states: Vec<SharedRoomState> =
            self.rooms.iter().map(|e| e.value().clone()).collect();

        let mut out = Vec::new();
        for rs in states {
            let guard = rs.read().await;
            if !guard.is_available {
                continue;
            }
            if let Some(hotel) = self.get_hotel(&guard.hotel_id) {
                out.push(RoomListing {
                    room: RoomInfo::from(&*guard),
                    hotel: HotelInfo::from(&hotel),
                });
            }
        }
        out.sort_by_key(|l| l.room.id);
        out
    }

    /// Every room of the owner's hotel, unavailable ones included.
    pub async fn owner_rooms(&self, owner: &str) -> Result<Vec<RoomInfo>, StoreError> {
        let hotel_id = self.hotel_for_owner(owner).ok_or(StoreError::NoHotel)?;
        let room_ids = self
            .rooms_by_hotel
            .get(&hotel_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();

        let mut out = Vec::with_capacity(room_ids.len());
        for room_id in room_ids {
            if let Some(rs) = self.get_room(&room_id) {
                let guard = rs.read().await;
                out.push(RoomInfo::from(&*guard));
            }
        }
        out.sort_by_key(|r| r.id);
        Ok(out)
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.hotel_by_owner.contains_key(user_id)
    }

    /// Resolve one booking's display context. `None` only if the hotel
    /// vanished from under it, which replay never produces.
    fn booking_details(
        &self,
        b: &Booking,
        room: &RoomState,
        with_user: bool,
    ) -> Option<BookingDetails> {
        let hotel = self.get_hotel(&b.hotel_id)?;
        let user = if with_user {
            self.get_user(&b.user_id).map(|u| UserInfo {
                id: u.id,
                username: u.username,
                email: u.email,
            })
        } else {
            None
        };
        Some(BookingDetails {
            id: b.id,
            check_in_date: b.stay.check_in,
            check_out_date: b.stay.check_out,
            guests: b.guests,
            total_price: b.total_price,
            paid: b.paid,
            status: b.status,
            created_at: b.created_at,
            room: RoomInfo::from(room),
            hotel: HotelInfo::from(&hotel),
            user,
        })
    }
}

fn sort_newest_first(bookings: &mut [BookingDetails]) {
    bookings.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}
