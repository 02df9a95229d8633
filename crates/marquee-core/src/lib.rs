pub mod admission;
pub mod config;
pub mod events;
pub mod ids;
pub mod ratelimit;
pub mod rooms;

pub use admission::Rejection;
pub use config::Config;
pub use events::{ClientEvent, Role, RoomRef, ServerEvent};
pub use ids::ClientId;
pub use ratelimit::RateLimiter;
pub use rooms::{RoomStore, ThemeState};
