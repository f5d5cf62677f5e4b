//! WebSocket subscription endpoint.
//!
//! Bridges one hub subscription onto one socket. The first frame is the
//! active-alert snapshot; every later hub message follows as its own frame.
//! Client text frames are acknowledged and otherwise ignored. Every socket
//! write is bounded by the hub's send timeout, so a peer that stops reading
//! is disconnected rather than left parked.

use super::state::AppState;
use crate::hub::{BroadcastHub, Subscription};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use futures::{Sink, SinkExt, StreamExt};
use serde_json::json;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub async fn subscribe(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| serve_socket(socket, hub))
}

/// Write one frame, giving up after `timeout`. Returns false when the socket
/// should be closed.
async fn send_frame<S>(sink: &mut S, msg: Message, timeout: Duration) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    match tokio::time::timeout(timeout, sink.send(msg)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!(error = %e, "socket send failed");
            false
        }
        Err(_) => {
            debug!(?timeout, "socket send timed out");
            false
        }
    }
}

async fn serve_socket(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let Subscription { id, mut rx } = hub.subscribe().await;
    let timeout = hub.send_timeout();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(msg) = outbound else {
                    debug!(subscriber = %id, "dropped by hub");
                    break;
                };
                let text = match serde_json::to_string(&msg) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(subscriber = %id, error = %e, "failed to encode hub message");
                        continue;
                    }
                };
                if !send_frame(&mut sink, Message::Text(text.into()), timeout).await {
                    break;
                }
            }
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(_))) => {
                    let ack = json!({
                        "type": "acknowledgment",
                        "message": "received",
                        "timestamp": Utc::now().to_rfc3339()
                    });
                    if !send_frame(&mut sink, Message::Text(ack.to_string().into()), timeout).await {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(subscriber = %id, error = %e, "socket receive error");
                    break;
                }
                Some(Ok(_)) => {}
            }
        }
    }

    hub.unsubscribe(id).await;
}
