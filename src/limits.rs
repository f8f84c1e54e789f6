//! Hard caps on inputs and state. All checked by mutations before any WAL
//! write; exceeding one answers `LimitExceeded`.

/// Max hotels in the store.
pub const MAX_HOTELS: usize = 10_000;

/// Max rooms under one hotel.
pub const MAX_ROOMS_PER_HOTEL: usize = 500;

/// Max bookings kept per room (cancelled ones included).
pub const MAX_BOOKINGS_PER_ROOM: usize = 10_000;

/// Max length of names, addresses, cities, contacts, room types.
pub const MAX_NAME_LEN: usize = 200;

/// Max amenities on one room, and max length of each.
pub const MAX_AMENITIES: usize = 32;
pub const MAX_AMENITY_LEN: usize = 64;

/// Max guests on one booking.
pub const MAX_GUESTS: u32 = 20;

/// Longest bookable stay.
pub const MAX_STAY_NIGHTS: i64 = 365;

/// Nightly rate ceiling in minor units (one million in major units).
pub const MAX_PRICE_PER_NIGHT: i64 = 100_000_000;

/// Recent searched cities kept per user.
pub const MAX_RECENT_CITIES: usize = 3;

/// Verified-token cache entries before the cache is flushed.
pub const MAX_TOKEN_CACHE: usize = 10_000;

/// Pending confirmation emails before new ones are dropped.
pub const MAIL_QUEUE_CAPACITY: usize = 256;
