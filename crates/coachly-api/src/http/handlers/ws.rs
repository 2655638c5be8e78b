//! WebSocket push of new messages in a session.
//!
//! `GET /api/v1/sessions/{id}/ws` upgrades to a WebSocket. Every message
//! stored in the session afterwards (user messages, coach replies, messages
//! written by other clients) is pushed as a JSON text frame:
//!
//! ```json
//! {"type":"message","message":{ ... }}
//! ```
//!
//! Clients may send `{"type":"ping"}` and get `{"type":"pong"}` back. The
//! log up to the moment of connecting is available from the messages
//! endpoint; clients merge pushed frames by message id.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use coachly_core::feed::MessageSubscription;
use coachly_types::message::Message;

use super::session::owned_session;
use crate::http::error::AppError;
use crate::http::extractors::caller::Caller;
use crate::state::AppState;

/// Incoming frame from a WebSocket client.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Ping,
}

/// Outgoing frame to a WebSocket client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame<'a> {
    Message { message: &'a Message },
    Pong,
}

/// GET /api/v1/sessions/{id}/ws
pub async fn session_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let conversation = owned_session(&state, &caller, &id).await?;
    // Subscribe before the upgrade completes so no insert is missed.
    let subscription = state.feed.subscribe(conversation.id);
    Ok(ws.on_upgrade(move |socket| handle_connection(socket, subscription)))
}

async fn handle_connection(socket: WebSocket, mut subscription: MessageSubscription) {
    let conversation_id = subscription.conversation_id();
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!(%conversation_id, "session websocket opened");

    loop {
        tokio::select! {
            pushed = subscription.recv() => {
                let Some(message) = pushed else {
                    // Feed closed; server shutting down.
                    break;
                };
                match serde_json::to_string(&ServerFrame::Message { message: &message }) {
                    Ok(json) => {
                        if sender.send(WsMessage::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(message_id = %message.id, "failed to serialize pushed message: {err}");
                    }
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        if !answer_frame(&text, &mut sender).await {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!("websocket receive error: {err}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!(%conversation_id, "session websocket closed");
}

/// Handle one client frame. Returns `false` once the client is gone.
async fn answer_frame(
    text: &str,
    sender: &mut (impl SinkExt<WsMessage, Error = axum::Error> + Unpin),
) -> bool {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Ping) => {
            let pong = serde_json::to_string(&ServerFrame::Pong).unwrap_or_default();
            sender.send(WsMessage::Text(pong.into())).await.is_ok()
        }
        Err(err) => {
            tracing::warn!(raw = %text, error = %err, "ignoring malformed websocket frame");
            true
        }
    }
}
