//! Inbound event handlers: admission, state mutation, fan-out.

use std::sync::Arc;

use marquee_core::admission::Rejection;
use marquee_core::config::Config;
use marquee_core::events::{now_ms, ClientEvent, Role, RoomRef, ServerEvent};
use marquee_core::ids::ClientId;
use marquee_core::ratelimit::RateLimiter;
use marquee_core::rooms::RoomStore;

use crate::client::ClientRegistry;

/// Cooldown hint broadcast with lock changes. Advisory only; the server
/// never enforces it.
const LOCK_COOLDOWN_HINT_MS: u64 = 2000;

/// Shared state injected into every handler. Owns the room store and rate
/// limiter so tests get clean instances per construction.
pub struct HandlerState {
    pub config: Config,
    pub rooms: RoomStore,
    pub limiter: RateLimiter,
}

impl HandlerState {
    /// Build the handler state and seed the configured room, so a joiner
    /// always receives a usable theme snapshot.
    pub fn new(config: Config) -> Self {
        let rooms = RoomStore::new();
        rooms.seed(&config.room, &config.default_theme);
        Self {
            config,
            rooms,
            limiter: RateLimiter::default(),
        }
    }
}

/// Route one inbound event to its handler. Every rejection path is a
/// silent drop on the wire; the typed reason is logged at debug.
pub async fn dispatch(
    state: &Arc<HandlerState>,
    registry: &ClientRegistry,
    client_id: &ClientId,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Join { room, role, key } => {
            join(state, registry, client_id, room, role, key).await
        }
        ClientEvent::ThemeGet(query) => theme_get(state, registry, client_id, query).await,
        ClientEvent::ThemeSet { room, theme } => {
            theme_set(state, registry, client_id, room, theme).await
        }
        ClientEvent::HostLock { key, locked } => {
            host_lock(state, registry, client_id, key, locked).await
        }
        ClientEvent::Ping => ping(registry, client_id).await,
    }
}

/// Transport-detected disconnect: release the session and its rate bucket.
/// No broadcast.
pub fn disconnect(state: &Arc<HandlerState>, registry: &ClientRegistry, client_id: &ClientId) {
    registry.unregister(client_id);
    state.limiter.forget(client_id);
    tracing::info!(client_id = %client_id, "client disconnected");
}

// ── join ──

async fn join(
    state: &Arc<HandlerState>,
    registry: &ClientRegistry,
    client_id: &ClientId,
    room: String,
    role: Role,
    key: Option<String>,
) {
    if let Err(rejection) = admit_join(state, &room, role, key.as_deref()) {
        // The sole authorization gate for the privileged role: a refused
        // join terminates the connection outright.
        tracing::debug!(
            client_id = %client_id,
            reason = rejection.kind(),
            "join refused, disconnecting"
        );
        registry.unregister(client_id);
        return;
    }

    registry.join(client_id, &room, role).await;

    // Initial snapshot, synchronously and in order: theme, then lock state.
    if let Some(current) = state.rooms.theme(&room) {
        send(
            registry,
            client_id,
            &ServerEvent::ThemeCurrent {
                theme: current.theme,
                at: current.at,
            },
        )
        .await;
    }
    send(
        registry,
        client_id,
        &ServerEvent::State {
            locked: state.rooms.locked(&room),
            cooldown_ms: 0,
        },
    )
    .await;

    tracing::info!(client_id = %client_id, room = %room, role = ?role, "client joined");
}

fn admit_join(
    state: &Arc<HandlerState>,
    room: &str,
    role: Role,
    key: Option<&str>,
) -> Result<(), Rejection> {
    if room != state.config.room {
        return Err(Rejection::RoomMismatch);
    }
    if role == Role::Control && key != Some(state.config.party_key.as_str()) {
        return Err(Rejection::BadKey);
    }
    Ok(())
}

// ── theme:get ──

async fn theme_get(
    state: &Arc<HandlerState>,
    registry: &ClientRegistry,
    client_id: &ClientId,
    query: RoomRef,
) {
    // Read-only and unauthenticated by design: no join requirement.
    if query.room() != state.config.room {
        tracing::debug!(
            client_id = %client_id,
            reason = Rejection::RoomMismatch.kind(),
            "theme:get dropped"
        );
        return;
    }

    if let Some(current) = state.rooms.theme(query.room()) {
        send(
            registry,
            client_id,
            &ServerEvent::ThemeCurrent {
                theme: current.theme,
                at: current.at,
            },
        )
        .await;
    }
}

// ── theme:set ──

async fn theme_set(
    state: &Arc<HandlerState>,
    registry: &ClientRegistry,
    client_id: &ClientId,
    room: String,
    theme: String,
) {
    if let Err(rejection) = admit_theme_set(state, registry, client_id, &room).await {
        tracing::debug!(
            client_id = %client_id,
            reason = rejection.kind(),
            "theme:set dropped"
        );
        return;
    }

    let stored = state.rooms.set_theme(&room, &theme);

    // Room-wide update first, then the sender's ack, then the (unchanged)
    // lock state. Consumers may rely on this enqueue order.
    broadcast(
        registry,
        &room,
        &ServerEvent::ThemeCurrent {
            theme: stored.theme.clone(),
            at: stored.at,
        },
    );
    send(
        registry,
        client_id,
        &ServerEvent::ThemeAck {
            theme: stored.theme.clone(),
            at: stored.at,
        },
    )
    .await;
    broadcast(
        registry,
        &room,
        &ServerEvent::State {
            locked: state.rooms.locked(&room),
            cooldown_ms: 0,
        },
    );

    tracing::info!(client_id = %client_id, room = %room, theme = %stored.theme, "theme set");
}

/// Write admission: joined, addressed to the configured room, unlocked,
/// within the sender's rate budget. The rate check runs last so tokens are
/// only consumed by otherwise-acceptable writes.
async fn admit_theme_set(
    state: &Arc<HandlerState>,
    registry: &ClientRegistry,
    client_id: &ClientId,
    room: &str,
) -> Result<(), Rejection> {
    if registry.membership(client_id).await.is_none() {
        return Err(Rejection::NotJoined);
    }
    if room != state.config.room {
        return Err(Rejection::RoomMismatch);
    }
    if state.rooms.locked(room) {
        return Err(Rejection::Locked);
    }
    if !state.limiter.allow(client_id) {
        return Err(Rejection::RateLimited);
    }
    Ok(())
}

// ── host:lock ──

async fn host_lock(
    state: &Arc<HandlerState>,
    registry: &ClientRegistry,
    client_id: &ClientId,
    key: String,
    locked: bool,
) {
    // Secret-gated, not role-gated: any connection presenting the correct
    // key may flip the lock, joined or not.
    if key != state.config.party_key {
        tracing::debug!(
            client_id = %client_id,
            reason = Rejection::BadKey.kind(),
            "host:lock dropped"
        );
        return;
    }

    let room = state.config.room.clone();
    state.rooms.set_lock(&room, locked);
    broadcast(
        registry,
        &room,
        &ServerEvent::State {
            locked,
            cooldown_ms: LOCK_COOLDOWN_HINT_MS,
        },
    );

    tracing::info!(client_id = %client_id, room = %room, locked, "lock state changed");
}

// ── ping ──

async fn ping(registry: &ClientRegistry, client_id: &ClientId) {
    send(registry, client_id, &ServerEvent::Pong { at: now_ms() }).await;
}

// ── delivery helpers ──

async fn send(registry: &ClientRegistry, client_id: &ClientId, event: &ServerEvent) {
    if let Some(json) = event.to_json() {
        registry.send_to(client_id, json).await;
    }
}

fn broadcast(registry: &ClientRegistry, room: &str, event: &ServerEvent) {
    if let Some(json) = event.to_json() {
        registry.broadcast_to_room(room, &json);
    }
}
