//! WebSocket upgrade and observer connection handling
//!
//! Connect: `ws://localhost:4999/inspection`
//!
//! A new observer receives one `full_update` with the current document, then
//! every broadcast until it disconnects. Inbound text frames are handed to
//! `sync::dispatch`.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::{Request, Response, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::routes::error_response;
use crate::server::http::AppState;
use crate::sync::{self, ServerMessage};

/// WebSocket type after upgrade
type HyperWebSocket = hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>;

/// Handle WebSocket upgrade for the push channel
pub fn handle_inspection_upgrade<B>(
    state: Arc<AppState>,
    req: Request<B>,
    peer: SocketAddr,
) -> Response<Full<Bytes>> {
    let (response, websocket) = match hyper_tungstenite::upgrade(req, None) {
        Ok(upgrade) => upgrade,
        Err(e) => {
            warn!(error = %e, "Failed to upgrade to WebSocket");
            return error_response(StatusCode::BAD_REQUEST, "WebSocket upgrade failed");
        }
    };

    tokio::spawn(async move {
        match websocket.await {
            Ok(ws) => {
                if let Err(e) = handle_observer_connection(ws, state, peer).await {
                    warn!(%peer, "Observer WebSocket error: {}", e);
                }
            }
            Err(e) => {
                error!(%peer, "WebSocket connection failed: {}", e);
            }
        }
    });

    response.map(|_| Full::new(Bytes::new()))
}

/// Serve one observer until it disconnects
async fn handle_observer_connection(
    ws: HyperWebSocket,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (mut sender, mut receiver) = ws.split();

    // Subscribe before taking the snapshot so no update falls in between
    let mut rx = state.hub.subscribe();
    info!(%peer, observers = state.hub.observer_count(), "Observer connected");

    let initial = ServerMessage::FullUpdate(state.document.snapshot().await);
    sender.send(WsMessage::Text(initial.to_json()?)).await?;

    loop {
        tokio::select! {
            // Broadcast from the hub
            msg = rx.recv() => {
                match msg {
                    Ok(update) => {
                        let json = update.to_json()?;
                        if sender.send(WsMessage::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    // Every update is a full document; the next one catches up
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(%peer, skipped, "Observer lagged behind broadcasts");
                        continue;
                    }
                }
            }

            // Message from the observer
            msg = receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        debug!(%peer, "Received channel message: {}", text);
                        sync::dispatch(&state.document, &text).await;
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = sender.send(WsMessage::Pong(data)).await;
                    }
                    Some(Ok(WsMessage::Close(_))) => break,
                    Some(Err(e)) => {
                        warn!(%peer, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
        }
    }

    drop(rx);
    info!(%peer, observers = state.hub.observer_count(), "Observer disconnected");
    Ok(())
}
