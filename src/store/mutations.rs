use std::sync::Arc;

use tokio::sync::{oneshot, RwLock};
use ulid::Ulid;

use crate::auth::AuthUser;
use crate::limits::*;
use crate::mailer::Confirmation;
use crate::model::*;

use super::{availability, now_ms, pricing, today, Store, StoreError, WalCommand};

fn check_name(field: &str, name: &'static str) -> Result<(), StoreError> {
    if field.trim().is_empty() {
        return Err(StoreError::Validation(name));
    }
    if field.len() > MAX_NAME_LEN {
        return Err(StoreError::LimitExceeded("field too long"));
    }
    Ok(())
}

impl Store {
    /// Mirror the identity provider's view of a user. No-op when nothing
    /// changed, so the per-request call from the auth layer stays cheap.
    pub async fn upsert_user(&self, user: &AuthUser) -> Result<(), StoreError> {
        check_name(&user.id, "user id is required")?;
        check_name(&user.username, "username is required")?;
        check_name(&user.email, "email is required")?;

        if let Some(existing) = self.users.get(&user.id)
            && existing.username == user.username
            && existing.email == user.email {
                return Ok(());
            }

        let ts = now_ms();
        let event = Event::UserUpserted {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: ts,
        };
        self.wal_append(&event).await?;
        self.apply_user_upsert(&user.id, &user.username, &user.email, ts);
        Ok(())
    }

    /// Remember a searched city on the user's profile, oldest evicted first.
    pub async fn record_search(&self, user_id: &str, city: &str) -> Result<(), StoreError> {
        check_name(city, "city is required")?;
        if !self.users.contains_key(user_id) {
            return Err(StoreError::Validation("unknown user"));
        }

        let event = Event::SearchRecorded {
            user_id: user_id.to_string(),
            city: city.to_string(),
        };
        self.wal_append(&event).await?;
        if let Some(mut user) = self.users.get_mut(user_id) {
            user.push_recent_city(city.to_string(), MAX_RECENT_CITIES);
        }
        Ok(())
    }

    /// Register the caller's hotel. One hotel per owner; the check and the
    /// insert run under the registration lock so two racing requests cannot
    /// both pass.
    pub async fn register_hotel(
        &self,
        user: &AuthUser,
        name: String,
        address: String,
        city: String,
        contact: String,
    ) -> Result<Hotel, StoreError> {
        check_name(&name, "hotel name is required")?;
        check_name(&address, "address is required")?;
        check_name(&city, "city is required")?;
        check_name(&contact, "contact is required")?;

        let _guard = self.registration.lock().await;
        if self.hotels.len() >= MAX_HOTELS {
            return Err(StoreError::LimitExceeded("too many hotels"));
        }
        if let Some(existing) = self.hotel_by_owner.get(&user.id) {
            return Err(StoreError::AlreadyExists(*existing.value()));
        }

        let hotel = Hotel {
            id: Ulid::new(),
            owner: user.id.clone(),
            name,
            address,
            city,
            contact,
            created_at: now_ms(),
        };
        let event = Event::HotelRegistered {
            id: hotel.id,
            owner: hotel.owner.clone(),
            name: hotel.name.clone(),
            address: hotel.address.clone(),
            city: hotel.city.clone(),
            contact: hotel.contact.clone(),
            created_at: hotel.created_at,
        };
        self.wal_append(&event).await?;
        self.apply_hotel_registered(hotel.clone());
        Ok(hotel)
    }

    /// Add a room under the caller's hotel.
    pub async fn add_room(
        &self,
        owner: &str,
        room_type: String,
        price_per_night: Money,
        amenities: Vec<String>,
    ) -> Result<RoomInfo, StoreError> {
        check_name(&room_type, "room type is required")?;
        if price_per_night <= 0 {
            return Err(StoreError::Validation("price per night must be positive"));
        }
        if price_per_night > MAX_PRICE_PER_NIGHT {
            return Err(StoreError::LimitExceeded("price per night too high"));
        }
        if amenities.len() > MAX_AMENITIES {
            return Err(StoreError::LimitExceeded("too many amenities"));
        }
        if amenities.iter().any(|a| a.is_empty() || a.len() > MAX_AMENITY_LEN) {
            return Err(StoreError::Validation("amenity names must be 1-64 characters"));
        }

        let hotel_id = self.hotel_for_owner(owner).ok_or(StoreError::NoHotel)?;
        if self.rooms_by_hotel.get(&hotel_id).is_some_and(|r| r.len() >= MAX_ROOMS_PER_HOTEL) {
            return Err(StoreError::LimitExceeded("too many rooms on hotel"));
        }

        let room = RoomState::new(Ulid::new(), hotel_id, room_type, price_per_night, amenities);
        let event = Event::RoomAdded {
            id: room.id,
            hotel_id,
            room_type: room.room_type.clone(),
            price_per_night,
            amenities: room.amenities.clone(),
        };
        self.wal_append(&event).await?;
        let info = RoomInfo::from(&room);
        self.apply_room_added(room);
        Ok(info)
    }

    /// Flip a room's availability flag. Only the room's hotel owner may;
    /// anyone else sees the room as absent. Returns the new flag.
    pub async fn toggle_room_availability(
        &self,
        owner: &str,
        room_id: Ulid,
    ) -> Result<bool, StoreError> {
        let rs = self.get_room(&room_id).ok_or(StoreError::NotFound(room_id))?;
        let mut guard = rs.write().await;
        let owns = self
            .hotel_for_owner(owner)
            .is_some_and(|h| h == guard.hotel_id);
        if !owns {
            return Err(StoreError::NotFound(room_id));
        }

        let event = Event::RoomAvailabilitySet {
            id: room_id,
            available: !guard.is_available,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(guard.is_available)
    }

    /// Create a booking for the authenticated caller.
    ///
    /// Check order is contractual, first failure wins: guest count → room
    /// exists → room flagged available → no overlapping non-cancelled booking
    /// → positive nights. The room's write guard is held from the conflict
    /// check through the WAL append and the insert.
    pub async fn create_booking(
        &self,
        user: &AuthUser,
        room_id: Ulid,
        stay: StayRange,
        guests: u32,
    ) -> Result<Ulid, StoreError> {
        if guests == 0 {
            return Err(StoreError::Validation("at least one guest is required"));
        }
        if guests > MAX_GUESTS {
            return Err(StoreError::LimitExceeded("too many guests"));
        }

        let rs = self.get_room(&room_id).ok_or(StoreError::NotFound(room_id))?;
        let mut guard = rs.write().await;
        if guard.bookings.len() >= MAX_BOOKINGS_PER_ROOM {
            return Err(StoreError::LimitExceeded("too many bookings on room"));
        }
        if !guard.is_available {
            return Err(StoreError::RoomUnavailable(room_id));
        }
        if let Some(existing) = availability::find_conflict(&guard, &stay) {
            metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            return Err(StoreError::DateConflict(existing.id));
        }
        let total_price = pricing::quote_total(guard.price_per_night, &stay)?;

        let id = Ulid::new();
        let event = Event::BookingCreated {
            id,
            room_id,
            hotel_id: guard.hotel_id,
            user_id: user.id.clone(),
            stay,
            guests,
            total_price,
            created_at: now_ms(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        metrics::counter!(crate::observability::BOOKINGS_CREATED_TOTAL).increment(1);

        // Best-effort confirmation. A full queue or a dead mail transport
        // must never fail the booking that was just committed.
        let hotel_name = self
            .get_hotel(&guard.hotel_id)
            .map(|h| h.name)
            .unwrap_or_default();
        self.mailer.send(Confirmation {
            to: user.email.clone(),
            guest: user.username.clone(),
            hotel: hotel_name,
            room_type: guard.room_type.clone(),
            stay,
            guests,
            total_price,
            booking_id: id,
        });

        Ok(id)
    }

    /// Cancel the caller's booking. Only the booking's user may cancel, and
    /// only strictly before check-in. The record stays, status `cancelled`,
    /// and stops blocking the room.
    pub async fn cancel_booking(&self, user_id: &str, booking_id: Ulid) -> Result<(), StoreError> {
        let room_id = self
            .room_for_booking(&booking_id)
            .ok_or(StoreError::NotFound(booking_id))?;
        let rs = self.get_room(&room_id).ok_or(StoreError::NotFound(room_id))?;
        let mut guard = rs.write().await;

        let booking = guard.booking(&booking_id).ok_or(StoreError::NotFound(booking_id))?;
        if booking.user_id != user_id {
            // Someone else's booking looks like no booking at all
            return Err(StoreError::NotFound(booking_id));
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(StoreError::Validation("booking is already cancelled"));
        }
        if booking.stay.check_in <= today() {
            return Err(StoreError::Validation(
                "cannot cancel on or after the check-in date",
            ));
        }

        let event = Event::BookingCancelled { id: booking_id };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Record a completed payment: `pending` → `confirmed`, paid. Driven by
    /// the external payment collaborator, not by any HTTP route here.
    pub async fn mark_paid(&self, booking_id: Ulid) -> Result<(), StoreError> {
        let room_id = self
            .room_for_booking(&booking_id)
            .ok_or(StoreError::NotFound(booking_id))?;
        let rs = self.get_room(&room_id).ok_or(StoreError::NotFound(room_id))?;
        let mut guard = rs.write().await;

        let booking = guard.booking(&booking_id).ok_or(StoreError::NotFound(booking_id))?;
        if booking.status == BookingStatus::Cancelled {
            return Err(StoreError::Validation("cannot pay a cancelled booking"));
        }
        if booking.paid {
            return Ok(()); // payment webhooks retry; second delivery is a no-op
        }

        let event = Event::BookingPaid { id: booking_id };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Rewrite the WAL with the minimal event sequence recreating current
    /// state: profiles and their search history, hotels, rooms (with
    /// availability), bookings (with status).
    pub async fn compact_wal(&self) -> Result<(), StoreError> {
        let mut events = Vec::new();

        for user in self.users.iter() {
            events.push(Event::UserUpserted {
                id: user.id.clone(),
                username: user.username.clone(),
                email: user.email.clone(),
                created_at: user.created_at,
            });
            for city in &user.recent_cities {
                events.push(Event::SearchRecorded {
                    user_id: user.id.clone(),
                    city: city.clone(),
                });
            }
        }

        for hotel in self.hotels.iter() {
            events.push(Event::HotelRegistered {
                id: hotel.id,
                owner: hotel.owner.clone(),
                name: hotel.name.clone(),
                address: hotel.address.clone(),
                city: hotel.city.clone(),
                contact: hotel.contact.clone(),
                created_at: hotel.created_at,
            });
        }

        let room_states: Vec<Arc<RwLock<RoomState>>> =
            self.rooms.iter().map(|e| e.value().clone()).collect();
        for rs in room_states {
            let guard = rs.read().await;
            events.push(Event::RoomAdded {
                id: guard.id,
                hotel_id: guard.hotel_id,
                room_type: guard.room_type.clone(),
                price_per_night: guard.price_per_night,
                amenities: guard.amenities.clone(),
            });
            if !guard.is_available {
                events.push(Event::RoomAvailabilitySet {
                    id: guard.id,
                    available: false,
                });
            }
            for b in &guard.bookings {
                events.push(Event::BookingCreated {
                    id: b.id,
                    room_id: b.room_id,
                    hotel_id: b.hotel_id,
                    user_id: b.user_id.clone(),
                    stay: b.stay,
                    guests: b.guests,
                    total_price: b.total_price,
                    created_at: b.created_at,
                });
                match b.status {
                    BookingStatus::Cancelled => {
                        events.push(Event::BookingCancelled { id: b.id })
                    }
                    BookingStatus::Confirmed => events.push(Event::BookingPaid { id: b.id }),
                    BookingStatus::Pending => {}
                }
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| StoreError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
