//! Connection handlers for the banter server.
//!
//! The transport shell: accepts WebSocket upgrades, binds each connection
//! to the room named in the request path, and pumps text frames between
//! the socket and the connection's session. All chat semantics live in
//! `banter-core`; this module only moves frames and applies shell policy
//! (limits, protocol-error handling, teardown).

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use banter_core::{Registry, Session};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Shared server state.
pub struct AppState {
    /// The room registry, shared by every connection.
    pub registry: Registry,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            registry: Registry::new(),
            config,
        }
    }
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone()));

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    // Build router; the room name is the trailing path segment.
    let chat_route = format!("{}/:room", config.transport.chat_path.trim_end_matches('/'));
    let app = Router::new()
        .route(&chat_route, get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    // Bind and serve
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;

    info!("banter server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}{}", addr, chat_route);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, room, state))
}

/// Handle a WebSocket connection for its whole lifetime.
async fn handle_websocket(socket: WebSocket, room_name: String, state: Arc<AppState>) {
    // Record connection metrics
    let _metrics_guard = ConnectionMetricsGuard::new();

    // Resolve the room once and wire the session to its outbox. The
    // session delivers by pushing encoded frames into the channel; this
    // task drains it into the socket.
    let room = state.registry.get_or_create(&room_name);
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<String>();
    let session = Session::new(room, outbox_tx);

    metrics::set_active_rooms(state.registry.stats().room_count);
    debug!(session = %session.id(), room = %room_name, "WebSocket connected");

    // Split the WebSocket
    let (mut sender, mut receiver) = socket.split();

    // Frame pumping loop
    loop {
        tokio::select! {
            biased;

            // Frames routed to this session (broadcasts, command replies)
            Some(frame) = outbox_rx.recv() => {
                metrics::record_message(frame.len(), "outbound");
                if sender.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }

            // Receive from WebSocket
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > state.config.limits.max_frame_size {
                            warn!(
                                session = %session.id(),
                                size = text.len(),
                                "Frame exceeds size limit, closing"
                            );
                            break;
                        }

                        metrics::record_message(text.len(), "inbound");
                        let start = Instant::now();

                        if let Err(e) = session.handle_incoming(&text) {
                            // Shell policy: a protocol error drops the connection.
                            warn!(session = %session.id(), error = %e, "Protocol error, closing");
                            metrics::record_protocol_error();
                            break;
                        }

                        metrics::record_latency(start.elapsed().as_secs_f64());
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!(session = %session.id(), "Ignoring binary frame on text protocol");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Ignore pongs
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(session = %session.id(), "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(session = %session.id(), error = %e, "WebSocket error");
                        break;
                    }
                    None => {
                        debug!(session = %session.id(), "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    // Teardown: leave the room and announce departure.
    session.handle_close();

    debug!(session = %session.id(), "WebSocket disconnected");
}
