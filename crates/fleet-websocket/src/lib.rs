//! # Fleet WebSocket Server
//!
//! Streams fleet events to operator dashboards and accepts operator intents.
//!
//! ## Protocol
//!
//! Messages are JSON-encoded using the types from `fleet_core::events`:
//! - Server → Client: `ServerMessage` (`InitialState` on connect, then `Event`s)
//! - Client → Server: `ClientMessage` (`RequestState`, `Intent`, `Pong`)

pub mod error;
pub mod hub;

pub use error::{WsError, WsResult};
pub use hub::WebSocketHub;

use fleet_core::{ClientMessage, ServerMessage};

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Interval between server heartbeats
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Bind and serve forever
pub async fn start_server(hub: Arc<WebSocketHub>, port: u16) -> WsResult<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("🔌 WebSocket server listening on ws://{}", addr);
    serve(hub, listener).await
}

/// Accept connections on an already bound listener
pub async fn serve(hub: Arc<WebSocketHub>, listener: TcpListener) -> WsResult<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let hub = hub.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(hub, stream, addr).await {
                        error!("WebSocket connection error from {}: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept WebSocket connection: {}", e);
            }
        }
    }
}

async fn handle_connection(
    hub: Arc<WebSocketHub>,
    stream: TcpStream,
    addr: SocketAddr,
) -> WsResult<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let client_id = Uuid::new_v4();
    info!("🔗 WebSocket client {} connected from {}", client_id, addr);

    let mut events = hub.register_client(client_id);

    if let Some(initial) = initial_state(&hub) {
        ws_sender
            .send(Message::Text(serde_json::to_string(&initial)?.into()))
            .await?;
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    let result = loop {
        tokio::select! {
            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        hub.record_received(client_id);
                        match handle_client_message(&hub, client_id, &text) {
                            Ok(Some(reply)) => {
                                let json = serde_json::to_string(&reply)?;
                                if let Err(e) = ws_sender.send(Message::Text(json.into())).await {
                                    break Err(e.into());
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                warn!("Error handling client message: {}", e);
                                let reply = ServerMessage::Error {
                                    code: "bad_message".into(),
                                    message: e.to_string(),
                                };
                                let json = serde_json::to_string(&reply)?;
                                if let Err(e) = ws_sender.send(Message::Text(json.into())).await {
                                    break Err(e.into());
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client {} closed the connection", client_id);
                        break Ok(());
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!("Received unexpected binary message from {}", client_id);
                    }
                    // Ping replies are handled by tungstenite
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e.into()),
                }
            }
            received = events.recv() => {
                match received {
                    Ok(event) => {
                        let json = serde_json::to_string(&ServerMessage::Event(event))?;
                        if let Err(e) = ws_sender.send(Message::Text(json.into())).await {
                            break Err(e.into());
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client {} lagged by {} messages", client_id, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Broadcast channel closed");
                        break Ok(());
                    }
                }
            }
            _ = heartbeat.tick() => {
                let ping = ServerMessage::Ping { timestamp: chrono::Utc::now().timestamp_millis() };
                if let Err(e) = ws_sender.send(Message::Text(serde_json::to_string(&ping)?.into())).await {
                    break Err(e.into());
                }
            }
        }
    };

    hub.unregister_client(client_id);
    info!("🔌 WebSocket client {} disconnected", client_id);

    result
}

fn initial_state(hub: &WebSocketHub) -> Option<ServerMessage> {
    hub.snapshot()
        .map(|snapshot| ServerMessage::InitialState(Box::new(snapshot)))
}

/// Apply one client message; returns the direct reply, if any
fn handle_client_message(
    hub: &WebSocketHub,
    client_id: Uuid,
    text: &str,
) -> WsResult<Option<ServerMessage>> {
    let msg: ClientMessage = serde_json::from_str(text)?;

    let reply = match msg {
        ClientMessage::RequestState => {
            debug!("Client {} requesting state", client_id);
            initial_state(hub)
        }
        ClientMessage::Intent(intent) => {
            info!("Client {} intent: {:?}", client_id, intent);
            if !hub.handle_intent(intent) {
                debug!("Client {} intent ignored", client_id);
            }
            None
        }
        ClientMessage::Pong { timestamp } => {
            debug!("Client {} pong: {}", client_id, timestamp);
            None
        }
    };

    Ok(reply)
}

// ============================================================================
// TESTS
// ============================================================================
