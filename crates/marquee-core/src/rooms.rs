use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::events::now_ms;

/// Last accepted theme for a room, stamped with epoch milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThemeState {
    pub theme: String,
    pub at: i64,
}

#[derive(Debug, Default)]
struct RoomEntry {
    theme: Option<ThemeState>,
    locked: bool,
}

/// Owns the per-room theme and lock flag. Plain mapping reads and writes;
/// authorization and rate limiting happen upstream in the connection
/// manager. Each operation is a single read-modify-write on one entry.
#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: DashMap<String, RoomEntry>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a room with a default theme. A theme that is already set wins;
    /// seeding never overwrites.
    pub fn seed(&self, room: &str, default_theme: &str) {
        let mut entry = self.rooms.entry(room.to_string()).or_default();
        if entry.theme.is_none() {
            entry.theme = Some(ThemeState {
                theme: default_theme.to_string(),
                at: now_ms(),
            });
        }
    }

    pub fn theme(&self, room: &str) -> Option<ThemeState> {
        self.rooms.get(room).and_then(|entry| entry.theme.clone())
    }

    /// Record a new theme, stamped now. Returns the stored state.
    pub fn set_theme(&self, room: &str, theme: &str) -> ThemeState {
        let state = ThemeState {
            theme: theme.to_string(),
            at: now_ms(),
        };
        self.rooms.entry(room.to_string()).or_default().theme = Some(state.clone());
        state
    }

    pub fn locked(&self, room: &str) -> bool {
        self.rooms.get(room).map(|entry| entry.locked).unwrap_or(false)
    }

    pub fn set_lock(&self, room: &str, locked: bool) {
        self.rooms.entry(room.to_string()).or_default().locked = locked;
    }
}
