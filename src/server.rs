//! Relay server.
//!
//! Accepts WebSocket clients and runs one relay exchange per inbound text
//! frame. Also serves a small health endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use futures_util::StreamExt;
use serde::Serialize;
use tokio::task::{JoinHandle, JoinSet};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters::WsFrameSink;
use crate::relay::{OutboundFrame, RelaySession};
use crate::traits::FrameSink;

/// Shared state for the relay server.
#[derive(Clone)]
pub struct RelayState {
    pub session: Arc<RelaySession>,
}

impl RelayState {
    pub fn new(session: RelaySession) -> Self {
        Self {
            session: Arc::new(session),
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    conversations: usize,
}

/// Build the relay router.
pub fn router(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(websocket_handler))
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the relay server on a specific address.
///
/// Port `0` picks a free port; the bound address is returned alongside the
/// server task handle.
pub async fn start_relay_server_on(
    addr: SocketAddr,
    state: RelayState,
) -> color_eyre::Result<(JoinHandle<()>, SocketAddr)> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Relay server listening on ws://{}", actual_addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Relay server error: {}", e);
        }
    });

    Ok((handle, actual_addr))
}

/// Handler for WebSocket upgrades.
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<RelayState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let span = info_span!("connection", id = %Uuid::new_v4());
        handle_websocket(socket, state).instrument(span)
    })
}

/// Handle one client connection until it closes.
///
/// Every text frame becomes its own exchange task; closing the socket
/// aborts the ones still running, so they never commit.
async fn handle_websocket(socket: WebSocket, state: RelayState) {
    info!("Client connected");

    let (sender, mut receiver) = socket.split();
    let sink = WsFrameSink::new(sender);
    let mut exchanges = JoinSet::new();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let session = Arc::clone(&state.session);
                        let sink = sink.clone();
                        exchanges.spawn(
                            async move {
                                let _ = session.handle_frame(&text, &sink).await;
                            }
                            .in_current_span(),
                        );
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Rejecting binary frame");
                        let frame = OutboundFrame::error("binary frames are not supported, send JSON text");
                        let _ = sink.send_frame(frame).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Ping/pong is answered by axum
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            Some(joined) = exchanges.join_next(), if !exchanges.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!("Exchange task panicked: {}", e);
                    }
                }
            }
        }
    }

    let in_flight = exchanges.len();
    exchanges.abort_all();
    info!("Client disconnected ({} exchanges cancelled)", in_flight);
}

/// Handler for the health endpoint.
async fn health_handler(State(state): State<RelayState>) -> impl IntoResponse {
    let conversations = state.session.store().conversation_count().await;
    Json(HealthResponse {
        status: "ok",
        conversations,
    })
}
