mod availability;
mod error;
mod mutations;
mod pricing;
mod queries;

pub use availability::{find_conflict, is_free};
pub use error::StoreError;
pub use pricing::quote_total;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use ulid::Ulid;

use crate::mailer::Mailer;
use crate::model::*;
use crate::wal::Wal;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

pub(crate) fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            flush_and_respond(&mut wal, &mut batch);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut wal, &mut batch);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());

    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// The booking store: all hotels, rooms, users, and bookings, held in memory
/// and made durable through the WAL. Each room's bookings sit behind one
/// `RwLock`; holding its write guard across the conflict check and the insert
/// makes booking creation a single critical section per room — two racing
/// requests for overlapping stays serialize here, and the loser sees the
/// winner's booking.
pub struct Store {
    rooms: DashMap<Ulid, SharedRoomState>,
    hotels: DashMap<Ulid, Hotel>,
    users: DashMap<UserId, UserProfile>,
    /// Owner → hotel (one hotel per owner).
    hotel_by_owner: DashMap<UserId, Ulid>,
    /// Hotel → room ids.
    rooms_by_hotel: DashMap<Ulid, Vec<Ulid>>,
    /// Booking id → room id reverse lookup.
    booking_to_room: DashMap<Ulid, Ulid>,
    /// User → booking ids, in creation order.
    bookings_by_user: DashMap<UserId, Vec<Ulid>>,
    wal_tx: mpsc::Sender<WalCommand>,
    mailer: Mailer,
    /// Serializes hotel registration so one-hotel-per-owner stays atomic.
    registration: Mutex<()>,
}

impl Store {
    pub fn open(wal_path: PathBuf, mailer: Mailer) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let store = Self {
            rooms: DashMap::new(),
            hotels: DashMap::new(),
            users: DashMap::new(),
            hotel_by_owner: DashMap::new(),
            rooms_by_hotel: DashMap::new(),
            booking_to_room: DashMap::new(),
            bookings_by_user: DashMap::new(),
            wal_tx,
            mailer,
            registration: Mutex::new(()),
        };

        // Replay — we're the sole owner of the room Arcs, so try_write always
        // succeeds instantly. Never block here: open may run inside an async
        // context.
        for event in &events {
            store.apply_replay(event);
        }

        Ok(store)
    }

    fn apply_replay(&self, event: &Event) {
        match event {
            Event::UserUpserted { id, username, email, created_at } => {
                self.apply_user_upsert(id, username, email, *created_at);
            }
            Event::SearchRecorded { user_id, city } => {
                if let Some(mut user) = self.users.get_mut(user_id) {
                    user.push_recent_city(city.clone(), crate::limits::MAX_RECENT_CITIES);
                }
            }
            Event::HotelRegistered { id, owner, name, address, city, contact, created_at } => {
                self.apply_hotel_registered(Hotel {
                    id: *id,
                    owner: owner.clone(),
                    name: name.clone(),
                    address: address.clone(),
                    city: city.clone(),
                    contact: contact.clone(),
                    created_at: *created_at,
                });
            }
            Event::RoomAdded { id, hotel_id, room_type, price_per_night, amenities } => {
                self.apply_room_added(RoomState::new(
                    *id,
                    *hotel_id,
                    room_type.clone(),
                    *price_per_night,
                    amenities.clone(),
                ));
            }
            other => {
                if let Some(room_id) = self.event_room_id(other)
                    && let Some(entry) = self.rooms.get(&room_id) {
                        let rs = entry.value().clone();
                        drop(entry);
                        let mut guard = rs.try_write().expect("replay: uncontended write");
                        self.apply_to_room(&mut guard, other);
                    }
            }
        }
    }

    fn apply_user_upsert(&self, id: &str, username: &str, email: &str, created_at: Ms) {
        self.users
            .entry(id.to_string())
            .and_modify(|u| {
                u.username = username.to_string();
                u.email = email.to_string();
            })
            .or_insert_with(|| UserProfile {
                id: id.to_string(),
                username: username.to_string(),
                email: email.to_string(),
                recent_cities: Vec::new(),
                created_at,
            });
    }

    fn apply_hotel_registered(&self, hotel: Hotel) {
        self.hotel_by_owner.insert(hotel.owner.clone(), hotel.id);
        self.rooms_by_hotel.entry(hotel.id).or_default();
        self.hotels.insert(hotel.id, hotel);
    }

    fn apply_room_added(&self, room: RoomState) {
        self.rooms_by_hotel.entry(room.hotel_id).or_default().push(room.id);
        self.rooms.insert(room.id, Arc::new(RwLock::new(room)));
    }

    /// Apply a room-scoped event to a RoomState (no locking — caller holds
    /// the write guard).
    fn apply_to_room(&self, rs: &mut RoomState, event: &Event) {
        match event {
            Event::RoomAvailabilitySet { available, .. } => {
                rs.is_available = *available;
            }
            Event::BookingCreated {
                id,
                room_id,
                hotel_id,
                user_id,
                stay,
                guests,
                total_price,
                created_at,
            } => {
                rs.insert_booking(Booking {
                    id: *id,
                    room_id: *room_id,
                    hotel_id: *hotel_id,
                    user_id: user_id.clone(),
                    stay: *stay,
                    guests: *guests,
                    total_price: *total_price,
                    paid: false,
                    status: BookingStatus::Pending,
                    created_at: *created_at,
                });
                self.booking_to_room.insert(*id, *room_id);
                self.bookings_by_user
                    .entry(user_id.clone())
                    .or_default()
                    .push(*id);
            }
            Event::BookingCancelled { id } => {
                if let Some(b) = rs.booking_mut(id) {
                    b.status = BookingStatus::Cancelled;
                }
            }
            Event::BookingPaid { id } => {
                if let Some(b) = rs.booking_mut(id) {
                    b.paid = true;
                    b.status = BookingStatus::Confirmed;
                }
            }
            // Handled at the map level, never room-scoped
            Event::UserUpserted { .. }
            | Event::SearchRecorded { .. }
            | Event::HotelRegistered { .. }
            | Event::RoomAdded { .. } => {}
        }
    }

    /// Room an event applies to, for room-scoped events.
    fn event_room_id(&self, event: &Event) -> Option<Ulid> {
        match event {
            Event::RoomAvailabilitySet { id, .. } => Some(*id),
            Event::BookingCreated { room_id, .. } => Some(*room_id),
            Event::BookingCancelled { id } | Event::BookingPaid { id } => {
                self.room_for_booking(id)
            }
            _ => None,
        }
    }

    /// Write an event to the WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| StoreError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::WalError(e.to_string()))
    }

    /// WAL-append + apply in one call, under the caller's room write guard.
    pub(super) async fn persist_and_apply(
        &self,
        rs: &mut RoomState,
        event: &Event,
    ) -> Result<(), StoreError> {
        self.wal_append(event).await?;
        self.apply_to_room(rs, event);
        Ok(())
    }

    pub fn get_room(&self, id: &Ulid) -> Option<SharedRoomState> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn get_hotel(&self, id: &Ulid) -> Option<Hotel> {
        self.hotels.get(id).map(|e| e.value().clone())
    }

    pub fn get_user(&self, id: &str) -> Option<UserProfile> {
        self.users.get(id).map(|e| e.value().clone())
    }

    pub fn room_for_booking(&self, booking_id: &Ulid) -> Option<Ulid> {
        self.booking_to_room.get(booking_id).map(|e| *e.value())
    }

    pub fn hotel_for_owner(&self, owner: &str) -> Option<Ulid> {
        self.hotel_by_owner.get(owner).map(|e| *e.value())
    }
}
