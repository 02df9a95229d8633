use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use marquee_core::config::Config;
use marquee_core::events::ClientEvent;
use marquee_core::ids::ClientId;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::client::{self, ClientRegistry};
use crate::handlers::{self, HandlerState};

/// Outbound queue depth per client; a consumer further behind than this
/// starts losing messages.
const MAX_SEND_QUEUE: usize = 256;
const EVENT_QUEUE: usize = 1024;
const REAPER_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler_state: Arc<HandlerState>,
    pub registry: Arc<ClientRegistry>,
    pub event_tx: mpsc::Sender<(ClientId, String)>,
}

/// Build the Axum router with all routes. The friendly paths `/display`
/// and `/control` map onto their html files so bare paths work too.
pub fn build_router(state: AppState, public_dir: &Path) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route_service("/display", ServeFile::new(public_dir.join("display.html")))
        .route_service("/control", ServeFile::new(public_dir.join("control.html")))
        .fallback_service(ServeDir::new(public_dir))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle keeping its tasks alive.
pub async fn start(config: Config) -> Result<ServerHandle, std::io::Error> {
    let registry = Arc::new(ClientRegistry::new(MAX_SEND_QUEUE));
    let handler_state = Arc::new(HandlerState::new(config.clone()));

    // One funnel for all inbound socket messages: events are handled to
    // completion, in arrival order, by a single dispatch loop.
    let (event_tx, event_rx) = mpsc::channel::<(ClientId, String)>(EVENT_QUEUE);
    let dispatch_handle = tokio::spawn(process_client_events(
        event_rx,
        Arc::clone(&handler_state),
        Arc::clone(&registry),
    ));

    let reaper_handle = start_reaper_task(
        Arc::clone(&registry),
        Arc::clone(&handler_state),
        REAPER_INTERVAL,
    );

    let app_state = AppState {
        handler_state,
        registry,
        event_tx,
    };
    let router = build_router(app_state, &config.public_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), room = %config.room, "marquee server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
        _dispatch: dispatch_handle,
        _reaper: reaper_handle,
    })
}

/// Handle returned by `start()`; keeps background tasks alive.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
    _dispatch: tokio::task::JoinHandle<()>,
    _reaper: tokio::task::JoinHandle<()>,
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a new WebSocket connection until it disconnects.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (client_id, rx) = state.registry.register();
    tracing::info!(client_id = %client_id, "websocket client connected");

    client::handle_ws_connection(
        socket,
        client_id.clone(),
        rx,
        Arc::clone(&state.registry),
        state.event_tx.clone(),
    )
    .await;

    handlers::disconnect(&state.handler_state, &state.registry, &client_id);
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "clients": state.registry.count(),
        "room": state.handler_state.config.room,
    }))
}

/// Drain the inbound funnel: parse each raw message and dispatch it.
/// Each event is handled to completion before the next one starts.
async fn process_client_events(
    mut rx: mpsc::Receiver<(ClientId, String)>,
    state: Arc<HandlerState>,
    registry: Arc<ClientRegistry>,
) {
    while let Some((client_id, raw)) = rx.recv().await {
        let event: ClientEvent = match serde_json::from_str(&raw) {
            Ok(event) => event,
            Err(error) => {
                // Malformed payloads and unknown event names are dropped,
                // matching the transport's handling of unregistered events.
                tracing::debug!(client_id = %client_id, %error, "undispatchable message dropped");
                continue;
            }
        };
        handlers::dispatch(&state, &registry, &client_id, event).await;
    }
}

/// Periodically reap clients that stopped answering pings, releasing their
/// sessions and rate buckets.
fn start_reaper_task(
    registry: Arc<ClientRegistry>,
    state: Arc<HandlerState>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let dead = registry.cleanup_dead_clients();
            for id in &dead {
                state.limiter.forget(id);
            }
            if !dead.is_empty() {
                tracing::info!(removed = dead.len(), "dead client cleanup");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            port: 0, // random port
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn server_starts_and_serves_health() {
        let handle = start(test_config()).await.unwrap();
        assert!(handle.port > 0);

        let url = format!("http://127.0.0.1:{}/health", handle.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["clients"], 0);
        assert_eq!(body["room"], "HALLOWEEN");
    }

    #[test]
    fn build_router_creates_routes() {
        let handler_state = Arc::new(HandlerState::new(Config::default()));
        let registry = Arc::new(ClientRegistry::new(32));
        let (event_tx, _event_rx) = mpsc::channel(32);

        let state = AppState {
            handler_state,
            registry,
            event_tx,
        };

        let _router = build_router(state, Path::new("public"));
        // If this doesn't panic, the router was built successfully
    }
}
