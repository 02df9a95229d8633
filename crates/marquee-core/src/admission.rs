/// Why an inbound event was refused. The wire stays silent on every one of
/// these; the typed reason exists for logging and for tests, and leaves room
/// for an explicit error event later without touching the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("event addressed to a different room")]
    RoomMismatch,
    #[error("connection has not joined the room")]
    NotJoined,
    #[error("room is locked")]
    Locked,
    #[error("sender exhausted its rate budget")]
    RateLimited,
    #[error("key does not match")]
    BadKey,
}

impl Rejection {
    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RoomMismatch => "room_mismatch",
            Self::NotJoined => "not_joined",
            Self::Locked => "locked",
            Self::RateLimited => "rate_limited",
            Self::BadKey => "bad_key",
        }
    }
}
