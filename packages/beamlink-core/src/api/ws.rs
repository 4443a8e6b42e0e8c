//! WebSocket handler for real-time client communication.
//!
//! A connection receives every [`BroadcastEvent`] and may issue commands as
//! `{"type":"COMMAND","id":1,"method":"discoverDevices","args":{...}}`.
//! Commands run concurrently; replies carry the request id and may arrive
//! in any order.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::{SplitSink, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

use crate::api::AppState;
use crate::command::{CastCommand, CommandReply};
use crate::error::CastError;
use crate::events::BroadcastEvent;
use crate::session::SessionSnapshot;

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Message Types
// ─────────────────────────────────────────────────────────────────────────────

/// Incoming WebSocket message envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum WsIncoming {
    Command {
        id: u64,
        method: String,
        #[serde(default)]
        args: Value,
    },
    Heartbeat,
}

/// Outgoing WebSocket message envelope.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum WsOutgoing {
    InitialState {
        session: SessionSnapshot,
    },
    Event {
        event: BroadcastEvent,
    },
    Result {
        id: u64,
        result: CommandReply,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        code: &'static str,
        message: String,
    },
    HeartbeatAck,
}

impl WsOutgoing {
    fn error(id: Option<u64>, error: &CastError) -> Self {
        let payload = error.to_payload();
        WsOutgoing::Error {
            id,
            code: payload.code,
            message: payload.message,
        }
    }

    fn to_message(&self) -> Option<Message> {
        serde_json::to_string(self)
            .ok()
            .map(|s| Message::Text(s.into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection Loop
// ─────────────────────────────────────────────────────────────────────────────

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.event_bridge.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<WsOutgoing>();

    log::info!("[WS] New connection established");

    // Initial state first, so clients can render without issuing a command.
    if let Ok(CommandReply::Session(session)) =
        state.dispatcher.execute(CastCommand::GetSessionState).await
    {
        if !deliver(&mut sender, WsOutgoing::InitialState { session }).await {
            log::warn!("[WS] Failed to send initial state, client disconnected");
            return;
        }
    }

    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<WsIncoming>(&text) {
                        Ok(WsIncoming::Command { id, method, args }) => {
                            let dispatcher = state.dispatcher.clone();
                            let tx = reply_tx.clone();
                            tokio::spawn(async move {
                                let out = match dispatcher.dispatch(&method, &args).await {
                                    Ok(result) => WsOutgoing::Result { id, result },
                                    Err(e) => WsOutgoing::error(Some(id), &e),
                                };
                                let _ = tx.send(out);
                            });
                        }
                        Ok(WsIncoming::Heartbeat) => {
                            if !deliver(&mut sender, WsOutgoing::HeartbeatAck).await {
                                break;
                            }
                        }
                        Err(e) => {
                            log::debug!("[WS] Unparseable message: {}", e);
                            let err =
                                CastError::InvalidArgument(format!("malformed message: {}", e));
                            if !deliver(&mut sender, WsOutgoing::error(None, &err)).await {
                                break;
                            }
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
            Some(out) = reply_rx.recv() => {
                if !deliver(&mut sender, out).await {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if !deliver(&mut sender, WsOutgoing::Event { event }).await {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("[WS] Client lagging, skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    log::info!("[WS] Connection closed");
}

/// Sends one message. Returns `false` once the client is gone.
async fn deliver(sender: &mut SplitSink<WebSocket, Message>, out: WsOutgoing) -> bool {
    match out.to_message() {
        Some(msg) => sender.send(msg).await.is_ok(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_envelope_parses_with_and_without_args() {
        let parsed: WsIncoming = serde_json::from_value(json!({
            "type": "COMMAND",
            "id": 4,
            "method": "discoverDevices",
            "args": { "durationMs": 1000 }
        }))
        .unwrap();
        match parsed {
            WsIncoming::Command { id, method, args } => {
                assert_eq!(id, 4);
                assert_eq!(method, "discoverDevices");
                assert_eq!(args["durationMs"], 1000);
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let parsed: WsIncoming =
            serde_json::from_value(json!({ "type": "COMMAND", "id": 5, "method": "disconnect" }))
                .unwrap();
        assert!(matches!(parsed, WsIncoming::Command { args: Value::Null, .. }));
    }

    #[test]
    fn error_reply_carries_code_and_request_id() {
        let out = WsOutgoing::error(Some(9), &CastError::NoActiveSession);
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["id"], 9);
        assert_eq!(value["code"], "no_active_session");
    }

    #[test]
    fn result_reply_inlines_command_reply() {
        let out = WsOutgoing::Result {
            id: 1,
            result: CommandReply::Bool(true),
        };
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({ "type": "RESULT", "id": 1, "result": true })
        );
    }
}
