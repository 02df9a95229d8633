use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use marquee_core::events::Role;
use marquee_core::ids::ClientId;
use tokio::sync::{mpsc, Mutex};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// A connected WebSocket client and its join state.
pub struct Client {
    pub id: ClientId,
    /// Room this connection has joined, None until a valid `join`.
    pub room: Option<String>,
    pub role: Option<Role>,
    pub tx: mpsc::Sender<String>,
    pub connected: AtomicBool,
    pub last_pong: AtomicU64,
}

impl Client {
    fn new(id: ClientId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            room: None,
            role: None,
            tx,
            connected: AtomicBool::new(true),
            last_pong: AtomicU64::new(now_secs()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn join(&mut self, room: String, role: Role) {
        self.room = Some(room);
        self.role = Some(role);
    }

    pub fn record_pong(&self) {
        self.last_pong.store(now_secs(), Ordering::Relaxed);
    }

    pub fn is_alive(&self) -> bool {
        let last = self.last_pong.load(Ordering::Relaxed);
        now_secs().saturating_sub(last) < CLIENT_TIMEOUT.as_secs()
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Registry of all connected clients. Owns every session; room membership
/// is the set of registered clients whose `room` matches.
pub struct ClientRegistry {
    clients: DashMap<ClientId, Arc<Mutex<Client>>>,
    max_send_queue: usize,
}

impl ClientRegistry {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            clients: DashMap::new(),
            max_send_queue,
        }
    }

    /// Register a new connection and return its ID + outbound receiver.
    pub fn register(&self) -> (ClientId, mpsc::Receiver<String>) {
        let id = ClientId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        let client = Arc::new(Mutex::new(Client::new(id.clone(), tx)));
        self.clients.insert(id.clone(), client);
        (id, rx)
    }

    /// Remove a client. Dropping its sender ends the write pump, which
    /// tears the socket down; this is also the forced-disconnect path.
    pub fn unregister(&self, id: &ClientId) {
        if let Some((_, client)) = self.clients.remove(id) {
            if let Ok(c) = client.try_lock() {
                c.connected.store(false, Ordering::Relaxed);
            }
        }
    }

    /// Mark a client as joined into a room.
    pub async fn join(&self, id: &ClientId, room: &str, role: Role) {
        if let Some(client) = self.clients.get(id) {
            client.lock().await.join(room.to_string(), role);
        }
    }

    /// Room a client has joined, None if not joined (or unknown).
    pub async fn membership(&self, id: &ClientId) -> Option<String> {
        let client = self.clients.get(id)?;
        let client = client.lock().await;
        client.room.clone()
    }

    /// Send a message to one client. Fire and forget: a full outbound queue
    /// drops the message with a warning instead of blocking the handler.
    pub async fn send_to(&self, id: &ClientId, message: String) -> bool {
        if let Some(client) = self.clients.get(id) {
            let tx = client.lock().await.tx.clone();
            match tx.try_send(message) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(msg)) => {
                    tracing::warn!(
                        client_id = %id,
                        msg_len = msg.len(),
                        "send queue full, dropping message"
                    );
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        } else {
            false
        }
    }

    /// Deliver a message to every joined member of a room, sender included.
    /// Best effort: slow or dead members simply miss the message.
    pub fn broadcast_to_room(&self, room: &str, message: &str) {
        for entry in self.clients.iter() {
            if let Ok(client) = entry.value().try_lock() {
                if client.room.as_deref() == Some(room) && client.is_connected() {
                    let _ = client.tx.try_send(message.to_string());
                }
            }
        }
    }

    /// Number of connected clients.
    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// Remove clients that haven't answered a ping within the timeout.
    /// Returns the reaped IDs so the caller can release per-identity state.
    pub fn cleanup_dead_clients(&self) -> Vec<ClientId> {
        let dead: Vec<ClientId> = self
            .clients
            .iter()
            .filter_map(|entry| {
                if let Ok(client) = entry.value().try_lock() {
                    if !client.is_alive() {
                        return Some(client.id.clone());
                    }
                }
                None
            })
            .collect();

        for id in &dead {
            self.unregister(id);
            tracing::info!(client_id = %id, "cleaned up dead client");
        }
        dead
    }
}

/// Handle a WebSocket connection: split into read/write pumps, manage
/// lifecycle with a heartbeat. Returns when the connection is gone.
pub async fn handle_ws_connection(
    socket: WebSocket,
    client_id: ClientId,
    mut rx: mpsc::Receiver<String>,
    registry: Arc<ClientRegistry>,
    on_message: mpsc::Sender<(ClientId, String)>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Write pump: forward outbound messages + periodic ping.
    let writer_cid = client_id.clone();
    let writer_registry = Arc::clone(&registry);
    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        ping_interval.tick().await; // consume first immediate tick

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        // Sender dropped: unregistered, tear the socket down.
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(WsMessage::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                    tracing::trace!(client_id = %writer_cid, "sent ping");
                }
            }
        }

        let _ = ws_tx.send(WsMessage::Close(None)).await;

        if let Some(client) = writer_registry.clients.get(&writer_cid) {
            if let Ok(c) = client.try_lock() {
                c.connected.store(false, Ordering::Relaxed);
            }
        }
    });

    // Read pump: funnel inbound events to the dispatcher, track pongs.
    let reader_cid = client_id.clone();
    let reader_registry = Arc::clone(&registry);
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => {
                    let _ = on_message.send((reader_cid.clone(), text.to_string())).await;
                }
                WsMessage::Pong(_) => {
                    if let Some(client) = reader_registry.clients.get(&reader_cid) {
                        if let Ok(c) = client.try_lock() {
                            c.record_pong();
                        }
                    }
                }
                WsMessage::Close(_) => break,
                WsMessage::Ping(_) => {} // axum answers pongs automatically
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = writer => {},
        _ = reader => {},
    }

    registry.unregister(&client_id);
}
