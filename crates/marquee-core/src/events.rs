use serde::{Deserialize, Serialize};

/// Epoch-millisecond stamp carried in wire payloads.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Role a connection joins a room with. `display` is passive and
/// unauthenticated; `control` requires the shared key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Display,
    Control,
}

/// Payload of `theme:get`. Clients send either a bare room string or a
/// `{room}` object; both address the same query.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoomRef {
    Bare(String),
    Scoped { room: String },
}

impl RoomRef {
    pub fn room(&self) -> &str {
        match self {
            Self::Bare(room) => room,
            Self::Scoped { room } => room,
        }
    }
}

/// Events a client may send. Wire envelope is `{"event": ..., "data": ...}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "join")]
    Join {
        room: String,
        role: Role,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },

    #[serde(rename = "theme:get")]
    ThemeGet(RoomRef),

    #[serde(rename = "theme:set")]
    ThemeSet { room: String, theme: String },

    #[serde(rename = "host:lock")]
    HostLock { key: String, locked: bool },

    #[serde(rename = "ping")]
    Ping,
}

/// Events the server emits, same envelope as [`ClientEvent`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Snapshot or update of the room's theme.
    #[serde(rename = "theme:current")]
    ThemeCurrent { theme: String, at: i64 },

    /// Confirms the sender's own accepted write.
    #[serde(rename = "theme:ack")]
    ThemeAck { theme: String, at: i64 },

    /// Lock flag plus an advisory cooldown hint. The hint is presentation
    /// only; the server never enforces it.
    #[serde(rename = "state")]
    State {
        locked: bool,
        #[serde(rename = "cooldownMs")]
        cooldown_ms: u64,
    },

    #[serde(rename = "pong")]
    Pong { at: i64 },
}

impl ServerEvent {
    /// Serialize for the wire. Infallible for these shapes in practice;
    /// returns None rather than panicking if serialization ever fails.
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}
