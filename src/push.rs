//! # push
//!
//! **Push Subscription** — listens for "schedules changed" notifications from
//! the backend's Socket.IO server over a plain WebSocket.
//!
//! ## Wire format (Engine.IO v4 + Socket.IO v5, text frames only)
//!
//! ```text
//! server ─▶ 0{"sid":..,"pingInterval":..}   open        → client sends 40
//! server ─▶ 40{"sid":..}                    connected   → PushEvent::Connected
//! server ─▶ 2                               ping        → client sends 3
//! server ─▶ 42["tradeScheduleUpdated",..]   event       → PushEvent::SchedulesChanged
//! server ─▶ 42["tradeSchedulesData",{..}]   event       → PushEvent::SchedulesData
//! server ─▶ 41 / 1                          disconnect  → task ends
//! ```
//!
//! The subscription is owned by whoever shows the live list and is torn down
//! with [`PushSubscription::close`] (or by dropping it).

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::AdminError;

/// Inbound event that means "re-fetch the list".
pub const SCHEDULE_UPDATED_EVENT: &str = "tradeScheduleUpdated";
/// Informational broadcast of the server's current schedules.
pub const SCHEDULES_DATA_EVENT: &str = "tradeSchedulesData";

const PONG: &str = "3";
const CONNECT: &str = "40";
const DISCONNECT: &str = "41";

// ─── Events ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Namespace connect acknowledged by the server.
    Connected,
    /// `tradeScheduleUpdated`: the list must be refreshed.
    SchedulesChanged,
    /// `tradeSchedulesData`: payload is only logged.
    SchedulesData(Value),
    /// The connection ended (server close, network loss, or `close()`).
    Disconnected,
}

impl PushEvent {
    fn from_event(name: &str, mut data: Vec<Value>) -> Option<Self> {
        match name {
            SCHEDULE_UPDATED_EVENT => Some(PushEvent::SchedulesChanged),
            SCHEDULES_DATA_EVENT => Some(PushEvent::SchedulesData(if data.is_empty() {
                Value::Null
            } else {
                data.swap_remove(0)
            })),
            _ => None,
        }
    }
}

// ─── Frame Codec ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Engine.IO handshake.
    Open(Value),
    /// Engine.IO close.
    Close,
    Ping,
    Pong,
    /// Socket.IO namespace connected.
    Connected,
    /// Socket.IO namespace disconnected.
    Disconnected,
    Event { name: String, data: Vec<Value> },
    ConnectError(Value),
    /// Noop, upgrade, acks and binary packets; none of them matter here.
    Ignored,
}

fn frame_error(text: &str, reason: &str) -> AdminError {
    AdminError::Push(format!("{reason}: {text:?}"))
}

/// Decodes one text frame.
pub fn decode_frame(text: &str) -> Result<Frame, AdminError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or_else(|| frame_error(text, "empty frame"))?;
    let rest = chars.as_str();

    match kind {
        '0' => {
            let handshake = serde_json::from_str(rest).map_err(|_| frame_error(text, "bad handshake"))?;
            Ok(Frame::Open(handshake))
        }
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => decode_socket_packet(rest, text),
        '5' | '6' => Ok(Frame::Ignored),
        _ => Err(frame_error(text, "unknown engine packet")),
    }
}

fn decode_socket_packet(packet: &str, frame: &str) -> Result<Frame, AdminError> {
    let mut chars = packet.chars();
    let kind = chars.next().ok_or_else(|| frame_error(frame, "empty socket packet"))?;
    let mut body = chars.as_str();

    // Optional "/namespace," prefix.
    if body.starts_with('/') {
        body = match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        };
    }
    // Optional ack id.
    let body = body.trim_start_matches(|c: char| c.is_ascii_digit());

    match kind {
        '0' => Ok(Frame::Connected),
        '1' => Ok(Frame::Disconnected),
        '2' => {
            let payload: Vec<Value> =
                serde_json::from_str(body).map_err(|_| frame_error(frame, "bad event payload"))?;
            let mut items = payload.into_iter();
            let name = match items.next() {
                Some(Value::String(name)) => name,
                _ => return Err(frame_error(frame, "event without a name")),
            };
            Ok(Frame::Event { name, data: items.collect() })
        }
        '4' => Ok(Frame::ConnectError(serde_json::from_str(body).unwrap_or(Value::Null))),
        '3' | '5' | '6' => Ok(Frame::Ignored),
        _ => Err(frame_error(frame, "unknown socket packet")),
    }
}

/// `http://host:5000` → `ws://host:5000/socket.io/?EIO=4&transport=websocket`
pub fn socket_io_url(base: &str) -> Result<Url, AdminError> {
    let mut url = Url::parse(base).map_err(|e| AdminError::Push(format!("invalid push URL {base:?}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(AdminError::Push(format!("unsupported push URL scheme {other:?}"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| AdminError::Push(format!("cannot switch {base:?} to {scheme}")))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

// ─── Subscription ─────────────────────────────────────────────────────────────

/// A live push connection plus the queue of events it produced.
pub struct PushSubscription {
    events: mpsc::Receiver<PushEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PushSubscription {
    /// Connects and starts the reader task.
    pub async fn open(base_url: &str) -> Result<Self, AdminError> {
        let url = socket_io_url(base_url)?;
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| AdminError::Push(format!("connect to {url} failed: {e}")))?;

        info!(url = %url, "🔌 Push channel connected");

        let (tx, events) = mpsc::channel(32);
        let (shutdown, stop) = oneshot::channel();
        let handle = tokio::spawn(run_channel(socket, tx, stop));

        Ok(Self {
            events,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// A subscription fed by an in-process source instead of a socket.
    pub fn detached(events: mpsc::Receiver<PushEvent>) -> Self {
        Self { events, shutdown: None, handle: None }
    }

    /// Next event; `None` once the channel is gone and drained.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    /// Sends a namespace disconnect, closes the socket, and waits for the
    /// reader task to finish.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        // A reader parked on a full queue wakes up with a send error.
        self.events.close();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn run_channel(socket: Socket, tx: mpsc::Sender<PushEvent>, mut stop: oneshot::Receiver<()>) {
    let (mut sink, mut stream) = socket.split();

    let requested = loop {
        tokio::select! {
            _ = &mut stop => break true,

            msg = stream.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break false,
                    Some(Ok(_)) => continue, // binary / ws-level ping handled by tungstenite
                    Some(Err(e)) => {
                        warn!(error = %e, "push channel read failed");
                        break false;
                    }
                };

                let (reply, event) = match decode_frame(&text) {
                    Ok(Frame::Open(handshake)) => {
                        debug!(%handshake, "engine.io handshake");
                        (Some(CONNECT), None)
                    }
                    Ok(Frame::Ping) => (Some(PONG), None),
                    Ok(Frame::Connected) => (None, Some(PushEvent::Connected)),
                    Ok(Frame::Event { name, data }) => {
                        let event = PushEvent::from_event(&name, data);
                        match event {
                            Some(_) => debug!(event = %name, "push event"),
                            None => debug!(event = %name, "ignoring push event"),
                        }
                        (None, event)
                    }
                    Ok(Frame::ConnectError(detail)) => {
                        warn!(%detail, "push namespace connect refused");
                        break false;
                    }
                    Ok(Frame::Disconnected) | Ok(Frame::Close) => break false,
                    Ok(Frame::Pong) | Ok(Frame::Ignored) => (None, None),
                    Err(e) => {
                        warn!(error = %e, "undecodable push frame");
                        (None, None)
                    }
                };

                if let Some(event) = event {
                    // A full queue must not hide a shutdown request.
                    tokio::select! {
                        sent = tx.send(event) => {
                            if sent.is_err() {
                                // close() fires `stop` before it drops the queue.
                                break stop.try_recv().is_ok();
                            }
                        }
                        _ = &mut stop => break true,
                    }
                }

                if let Some(reply) = reply {
                    if let Err(e) = sink.send(Message::Text(reply.into())).await {
                        warn!(error = %e, "push channel write failed");
                        break false;
                    }
                }
            }
        }
    };

    if requested {
        let _ = sink.send(Message::Text(DISCONNECT.into())).await;
        let _ = sink.close().await;
    }

    // Nobody may be draining the queue any more (close() is waiting on us).
    let _ = tx.try_send(PushEvent::Disconnected);
    info!("🔌 Push channel disconnected");
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_packets() {
        assert_eq!(
            decode_frame(r#"0{"sid":"abc","pingInterval":25000}"#).unwrap(),
            Frame::Open(json!({"sid": "abc", "pingInterval": 25000}))
        );
        assert_eq!(decode_frame("2").unwrap(), Frame::Ping);
        assert_eq!(decode_frame("3").unwrap(), Frame::Pong);
        assert_eq!(decode_frame("1").unwrap(), Frame::Close);
        assert_eq!(decode_frame("6").unwrap(), Frame::Ignored);
    }

    #[test]
    fn test_socket_packets() {
        assert_eq!(decode_frame(r#"40{"sid":"xyz"}"#).unwrap(), Frame::Connected);
        assert_eq!(decode_frame("41").unwrap(), Frame::Disconnected);
        assert_eq!(
            decode_frame(r#"42["tradeScheduleUpdated"]"#).unwrap(),
            Frame::Event { name: "tradeScheduleUpdated".into(), data: vec![] }
        );
    }

    #[test]
    fn test_event_with_namespace_and_ack_id() {
        assert_eq!(
            decode_frame(r#"42/admin,17["tradeSchedulesData",{"count":2}]"#).unwrap(),
            Frame::Event { name: "tradeSchedulesData".into(), data: vec![json!({"count": 2})] }
        );
    }

    #[test]
    fn test_bad_frames() {
        assert!(decode_frame("").is_err());
        assert!(decode_frame("9").is_err());
        assert!(decode_frame("42{not-an-array}").is_err());
        assert!(decode_frame("42[1,2]").is_err());
    }

    #[test]
    fn test_event_mapping() {
        assert_eq!(
            PushEvent::from_event(SCHEDULE_UPDATED_EVENT, vec![]),
            Some(PushEvent::SchedulesChanged)
        );
        assert_eq!(
            PushEvent::from_event(SCHEDULES_DATA_EVENT, vec![json!([1])]),
            Some(PushEvent::SchedulesData(json!([1])))
        );
        assert_eq!(PushEvent::from_event("chat", vec![]), None);
    }

    #[test]
    fn test_socket_io_url() {
        assert_eq!(
            socket_io_url("http://localhost:5000").unwrap().as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_io_url("https://api.example.com/").unwrap().as_str(),
            "wss://api.example.com/socket.io/?EIO=4&transport=websocket"
        );
        assert!(socket_io_url("ftp://example.com").is_err());
        assert!(socket_io_url("not a url").is_err());
    }
}
