//! One DevTools WebSocket connection to one page.
//!
//! A background task owns the socket.  Callers talk to it over a command
//! channel and get each reply on its own oneshot; protocol events are fanned
//! out on a broadcast channel.  When the socket closes the task exits, every
//! pending reply resolves to [`CdpError::Closed`], and subscribers see the
//! broadcast channel close.

use std::collections::HashMap;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingTx = oneshot::Sender<Result<Value, CdpError>>;

/// Buffered events per subscriber before it starts lagging.
const EVENT_BUFFER: usize = 64;

/// Errors from a single DevTools exchange.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CdpError {
    /// The socket is gone; no further command can succeed.
    #[error("devtools connection closed")]
    Closed,

    /// The browser answered with a protocol error.
    #[error("{method} failed: {message}")]
    Protocol { method: String, message: String },

    /// The browser's reply did not have the expected shape.
    #[error("unexpected {method} reply: {detail}")]
    Decode { method: String, detail: String },

    /// The WebSocket handshake failed.
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
}

/// A protocol event (a message with `method` and no `id`).
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

struct CdpCommand {
    method: String,
    params: Value,
    reply: PendingTx,
}

/// Client half of a DevTools connection.
pub struct CdpSession {
    cmd_tx: mpsc::Sender<CdpCommand>,
    events: broadcast::Receiver<CdpEvent>,
    handler: JoinHandle<()>,
}

impl CdpSession {
    /// Opens the WebSocket at `ws_url` and starts the handler task.
    pub async fn connect(ws_url: &str) -> Result<Self, CdpError> {
        let (ws, _) = connect_async(ws_url)
            .await
            .map_err(|e| CdpError::Handshake(e.to_string()))?;
        debug!(url = ws_url, "devtools websocket open");
        Ok(Self::from_stream(ws))
    }

    fn from_stream(ws: WsStream) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, events) = broadcast::channel(EVENT_BUFFER);
        let handler = tokio::spawn(handler_loop(ws, cmd_rx, event_tx));
        Self {
            cmd_tx,
            events,
            handler,
        }
    }

    /// Sends one command and waits for its reply's `result` object.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value, CdpError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(CdpCommand {
                method: method.to_string(),
                params,
                reply,
            })
            .await
            .map_err(|_| CdpError::Closed)?;
        rx.await.map_err(|_| CdpError::Closed)?
    }

    /// Receiver for events arriving after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.resubscribe()
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Waits for the next event named `method`.
pub async fn wait_for_event(
    events: &mut broadcast::Receiver<CdpEvent>,
    method: &str,
) -> Result<CdpEvent, CdpError> {
    loop {
        match events.recv().await {
            Ok(event) if event.method == method => return Ok(event),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "devtools event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return Err(CdpError::Closed),
        }
    }
}

// ── Handler task ──────────────────────────────────────────────────────────────

async fn handler_loop(
    ws: WsStream,
    mut cmd_rx: mpsc::Receiver<CdpCommand>,
    event_tx: broadcast::Sender<CdpEvent>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pending: HashMap<u64, (String, PendingTx)> = HashMap::new();
    let mut next_id: u64 = 1;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                let id = next_id;
                next_id += 1;
                let frame = json!({ "id": id, "method": cmd.method, "params": cmd.params });
                trace!(id, method = %cmd.method, "devtools command");
                if ws_tx.send(WsMessage::Text(frame.to_string())).await.is_err() {
                    let _ = cmd.reply.send(Err(CdpError::Closed));
                    break;
                }
                pending.insert(id, (cmd.method, cmd.reply));
            }
            msg = ws_rx.next() => {
                let text = match msg {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!(error = %e, "devtools websocket error");
                        break;
                    }
                };
                let Ok(value) = serde_json::from_str::<Value>(&text) else {
                    warn!("ignoring non-JSON devtools frame");
                    continue;
                };
                route(value, &mut pending, &event_tx);
            }
        }
    }

    debug!(pending = pending.len(), "devtools handler exiting");
    for (_, (_, reply)) in pending.drain() {
        let _ = reply.send(Err(CdpError::Closed));
    }
}

fn route(
    value: Value,
    pending: &mut HashMap<u64, (String, PendingTx)>,
    event_tx: &broadcast::Sender<CdpEvent>,
) {
    if let Some(id) = value.get("id").and_then(Value::as_u64) {
        let Some((method, reply)) = pending.remove(&id) else {
            return;
        };
        let outcome = match value.get("error") {
            Some(err) => Err(CdpError::Protocol {
                method,
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
            None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
        let _ = reply.send(outcome);
    } else if let Some(method) = value.get("method").and_then(Value::as_str) {
        // No subscribers is fine.
        let _ = event_tx.send(CdpEvent {
            method: method.to_string(),
            params: value.get("params").cloned().unwrap_or(Value::Null),
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
