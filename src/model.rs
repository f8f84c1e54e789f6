use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only wall-clock type.
pub type Ms = i64;

/// Money in minor currency units (cents). Nightly rates and totals are exact
/// integers; there is no sub-cent precision anywhere in the domain.
pub type Money = i64;

/// Opaque user id issued by the external identity provider.
pub type UserId = String;

/// Half-open stay `[check_in, check_out)` at day granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self { check_in, check_out }
    }

    /// Whole nights between check-in and check-out. Zero or negative for
    /// same-day and inverted ranges — callers must reject those.
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Half-open overlap: back-to-back stays (one ending the day the other
    /// starts) do not conflict.
    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Any non-cancelled booking blocks the room for its stay, paid or not.
    pub fn blocks_room(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

/// One reservation. Stay and room never change after creation; only status
/// and the paid flag do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub room_id: Ulid,
    pub hotel_id: Ulid,
    pub user_id: UserId,
    pub stay: StayRange,
    pub guests: u32,
    pub total_price: Money,
    pub paid: bool,
    pub status: BookingStatus,
    pub created_at: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: Ulid,
    pub owner: UserId,
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact: String,
    pub created_at: Ms,
}

/// Runtime state of one room: its listing fields plus every booking ever
/// taken on it (cancelled ones included), sorted by `stay.check_in`.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub id: Ulid,
    pub hotel_id: Ulid,
    pub room_type: String,
    pub price_per_night: Money,
    pub amenities: Vec<String>,
    pub is_available: bool,
    pub bookings: Vec<Booking>,
}

impl RoomState {
    pub fn new(
        id: Ulid,
        hotel_id: Ulid,
        room_type: String,
        price_per_night: Money,
        amenities: Vec<String>,
    ) -> Self {
        Self {
            id,
            hotel_id,
            room_type,
            price_per_night,
            amenities,
            is_available: true,
            bookings: Vec::new(),
        }
    }

    /// Insert a booking maintaining sort order by check-in date.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.stay.check_in, |b| b.stay.check_in)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn booking(&self, id: &Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == *id)
    }

    pub fn booking_mut(&mut self, id: &Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == *id)
    }

    /// Bookings whose stay overlaps the query window, cancelled or not.
    /// Binary search skips bookings checking in at or after `query.check_out`.
    pub fn overlapping(&self, query: &StayRange) -> impl Iterator<Item = &Booking> {
        let right_bound = self
            .bookings
            .partition_point(|b| b.stay.check_in < query.check_out);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.stay.check_out > query.check_in)
    }
}

/// Profile mirrored from the identity provider, plus app-local search history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub recent_cities: Vec<String>,
    pub created_at: Ms,
}

impl UserProfile {
    /// Append a searched city, evicting the oldest beyond the cap.
    pub fn push_recent_city(&mut self, city: String, cap: usize) {
        if self.recent_cities.len() >= cap {
            self.recent_cities.remove(0);
        }
        self.recent_cities.push(city);
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    UserUpserted {
        id: UserId,
        username: String,
        email: String,
        created_at: Ms,
    },
    SearchRecorded {
        user_id: UserId,
        city: String,
    },
    HotelRegistered {
        id: Ulid,
        owner: UserId,
        name: String,
        address: String,
        city: String,
        contact: String,
        created_at: Ms,
    },
    RoomAdded {
        id: Ulid,
        hotel_id: Ulid,
        room_type: String,
        price_per_night: Money,
        amenities: Vec<String>,
    },
    RoomAvailabilitySet {
        id: Ulid,
        available: bool,
    },
    BookingCreated {
        id: Ulid,
        room_id: Ulid,
        hotel_id: Ulid,
        user_id: UserId,
        stay: StayRange,
        guests: u32,
        total_price: Money,
        created_at: Ms,
    },
    BookingCancelled {
        id: Ulid,
    },
    BookingPaid {
        id: Ulid,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelInfo {
    pub id: Ulid,
    pub owner: UserId,
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact: String,
}

impl From<&Hotel> for HotelInfo {
    fn from(h: &Hotel) -> Self {
        Self {
            id: h.id,
            owner: h.owner.clone(),
            name: h.name.clone(),
            address: h.address.clone(),
            city: h.city.clone(),
            contact: h.contact.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: Ulid,
    pub hotel_id: Ulid,
    pub room_type: String,
    pub price_per_night: Money,
    pub amenities: Vec<String>,
    pub is_available: bool,
}

impl From<&RoomState> for RoomInfo {
    fn from(rs: &RoomState) -> Self {
        Self {
            id: rs.id,
            hotel_id: rs.hotel_id,
            room_type: rs.room_type.clone(),
            price_per_night: rs.price_per_night,
            amenities: rs.amenities.clone(),
            is_available: rs.is_available,
        }
    }
}

/// Public room listing: the room with its hotel resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomListing {
    #[serde(flatten)]
    pub room: RoomInfo,
    pub hotel: HotelInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// One booking with its display context resolved. `user` is populated only
/// for the hotel-owner view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub id: Ulid,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub guests: u32,
    pub total_price: Money,
    pub paid: bool,
    pub status: BookingStatus,
    pub created_at: Ms,
    pub room: RoomInfo,
    pub hotel: HotelInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

/// Hotel-owner dashboard: every booking on the hotel plus aggregates.
/// `total_revenue` excludes cancelled bookings; `total_bookings` counts all.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_bookings: usize,
    pub total_revenue: Money,
    pub bookings: Vec<BookingDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn stay(a: NaiveDate, b: NaiveDate) -> StayRange {
        StayRange::new(a, b)
    }

    fn booking_on(check_in: NaiveDate, check_out: NaiveDate) -> Booking {
        Booking {
            id: Ulid::new(),
            room_id: Ulid::new(),
            hotel_id: Ulid::new(),
            user_id: "user_1".into(),
            stay: stay(check_in, check_out),
            guests: 2,
            total_price: 10_000,
            paid: false,
            status: BookingStatus::Pending,
            created_at: 0,
        }
    }

    #[test]
    fn nights_counts_whole_days() {
        let s = stay(d(2025, 5, 1), d(2025, 5, 4));
        assert_eq!(s.nights(), 3);
        assert_eq!(stay(d(2025, 5, 1), d(2025, 5, 1)).nights(), 0);
        assert_eq!(stay(d(2025, 5, 4), d(2025, 5, 1)).nights(), -3);
    }

    #[test]
    fn overlap_half_open() {
        let a = stay(d(2025, 5, 1), d(2025, 5, 3));
        let b = stay(d(2025, 5, 2), d(2025, 5, 4));
        let back_to_back = stay(d(2025, 5, 3), d(2025, 5, 5));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&back_to_back));
        assert!(!back_to_back.overlaps(&a));
    }

    #[test]
    fn overlap_containment() {
        let outer = stay(d(2025, 6, 1), d(2025, 6, 30));
        let inner = stay(d(2025, 6, 10), d(2025, 6, 12));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn empty_range_overlaps_nothing() {
        let empty = stay(d(2025, 6, 10), d(2025, 6, 10));
        let full = stay(d(2025, 6, 1), d(2025, 6, 30));
        assert!(!empty.overlaps(&full));
        assert!(!full.overlaps(&empty));
    }

    #[test]
    fn booking_ordering() {
        let mut rs = RoomState::new(Ulid::new(), Ulid::new(), "Double".into(), 10_000, vec![]);
        rs.insert_booking(booking_on(d(2025, 5, 20), d(2025, 5, 22)));
        rs.insert_booking(booking_on(d(2025, 5, 1), d(2025, 5, 3)));
        rs.insert_booking(booking_on(d(2025, 5, 10), d(2025, 5, 12)));
        let starts: Vec<_> = rs.bookings.iter().map(|b| b.stay.check_in).collect();
        assert_eq!(starts, vec![d(2025, 5, 1), d(2025, 5, 10), d(2025, 5, 20)]);
    }

    #[test]
    fn overlapping_skips_outside_window() {
        let mut rs = RoomState::new(Ulid::new(), Ulid::new(), "Suite".into(), 10_000, vec![]);
        rs.insert_booking(booking_on(d(2025, 5, 1), d(2025, 5, 3)));
        rs.insert_booking(booking_on(d(2025, 5, 10), d(2025, 5, 15)));
        rs.insert_booking(booking_on(d(2025, 6, 1), d(2025, 6, 5)));

        let query = stay(d(2025, 5, 12), d(2025, 5, 20));
        let hits: Vec<_> = rs.overlapping(&query).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].stay.check_in, d(2025, 5, 10));
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        let mut rs = RoomState::new(Ulid::new(), Ulid::new(), "Single".into(), 5_000, vec![]);
        rs.insert_booking(booking_on(d(2025, 5, 1), d(2025, 5, 3)));
        let query = stay(d(2025, 5, 3), d(2025, 5, 5));
        assert_eq!(rs.overlapping(&query).count(), 0);
    }

    #[test]
    fn status_blocking() {
        assert!(BookingStatus::Pending.blocks_room());
        assert!(BookingStatus::Confirmed.blocks_room());
        assert!(!BookingStatus::Cancelled.blocks_room());
    }

    #[test]
    fn recent_cities_capped_fifo() {
        let mut user = UserProfile {
            id: "user_1".into(),
            username: "Ada".into(),
            email: "ada@example.com".into(),
            recent_cities: Vec::new(),
            created_at: 0,
        };
        for city in ["Lisbon", "Porto", "Faro", "Braga"] {
            user.push_recent_city(city.to_string(), 3);
        }
        assert_eq!(user.recent_cities, vec!["Porto", "Faro", "Braga"]);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::BookingCreated {
            id: Ulid::new(),
            room_id: Ulid::new(),
            hotel_id: Ulid::new(),
            user_id: "user_42".into(),
            stay: stay(d(2025, 5, 1), d(2025, 5, 3)),
            guests: 2,
            total_price: 20_000,
            created_at: 1_700_000_000_000,
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
