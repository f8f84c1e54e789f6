use ulid::Ulid;

#[derive(Debug)]
pub enum StoreError {
    /// Malformed or missing input, detected before any state is touched.
    Validation(&'static str),
    /// No hotel, room, or booking with this id visible to the caller.
    NotFound(Ulid),
    /// The caller owns no hotel.
    NoHotel,
    /// The owner already has a hotel; carries the existing hotel's id.
    AlreadyExists(Ulid),
    /// The room's availability flag is off.
    RoomUnavailable(Ulid),
    /// A non-cancelled booking overlaps the requested stay; carries its id.
    DateConflict(Ulid),
    /// Zero or negative nights between check-in and check-out.
    InvalidRange,
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Validation(msg) => write!(f, "invalid input: {msg}"),
            StoreError::NotFound(id) => write!(f, "not found: {id}"),
            StoreError::NoHotel => write!(f, "no hotel registered for this user"),
            StoreError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            StoreError::RoomUnavailable(id) => {
                write!(f, "room {id} is not available for booking")
            }
            StoreError::DateConflict(id) => {
                write!(f, "dates conflict with existing booking: {id}")
            }
            StoreError::InvalidRange => {
                write!(f, "check-out date must be after check-in date")
            }
            StoreError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            StoreError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}
