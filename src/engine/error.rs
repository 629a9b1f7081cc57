use crate::model::BookingId;

#[derive(Debug)]
pub enum EngineError {
    SpaceNotFound(String),
    SpaceAlreadyExists(String),
    /// The requested range conflicts with an existing booking or is invalid.
    SpaceNotAvailable(String),
    /// Also returned when the booking exists but belongs to someone else.
    BookingNotFound(BookingId),
    LimitExceeded(&'static str),
    /// Underlying persistence failure, surfaced unchanged.
    Storage(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::SpaceNotFound(name) => write!(f, "space not found: {name}"),
            EngineError::SpaceAlreadyExists(name) => write!(f, "space already exists: {name}"),
            EngineError::SpaceNotAvailable(name) => {
                write!(f, "space not available for the requested range: {name}")
            }
            EngineError::BookingNotFound(id) => write!(f, "booking not found: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
