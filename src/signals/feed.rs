//! Realtime signal feed
//!
//! The backend pushes signal upserts over socket.io. Only the slice of the
//! protocol the feed needs is spoken here: Engine.IO v4 over a websocket,
//! the namespace connect packet carrying the agent id, heartbeats, and
//! `message` events.

use super::TradingSignal;
use crate::{Error, Result};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

/// Event name the backend uses for signal upserts
pub const SIGNAL_EVENT: &str = "message";

const CHANNEL_CAPACITY: usize = 64;

/// A decoded text frame
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO handshake
    Open(Value),
    Close,
    Ping,
    Pong,
    /// Namespace connect acknowledged
    Connected,
    ConnectError(String),
    Disconnected,
    Event { name: String, payload: Value },
    /// Anything the feed does not act on
    Other,
}

/// Decode one Engine.IO/socket.io text frame
pub fn decode_packet(frame: &str) -> Result<Packet> {
    let mut chars = frame.chars();
    let packet = match chars.next() {
        Some('0') => Packet::Open(serde_json::from_str(chars.as_str()).unwrap_or(Value::Null)),
        Some('1') => Packet::Close,
        Some('2') => Packet::Ping,
        Some('3') => Packet::Pong,
        Some('4') => decode_socket_packet(chars.as_str())?,
        Some(_) | None => Packet::Other,
    };
    Ok(packet)
}

fn decode_socket_packet(body: &str) -> Result<Packet> {
    let mut chars = body.chars();
    let kind = chars.next();
    // optional "/namespace," then optional ack id digits
    let mut rest = chars.as_str();
    if rest.starts_with('/') {
        rest = rest.split_once(',').map_or("", |(_, tail)| tail);
    }
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    match kind {
        Some('0') => Ok(Packet::Connected),
        Some('1') => Ok(Packet::Disconnected),
        Some('2') => {
            let value: Value = serde_json::from_str(rest)
                .map_err(|e| Error::Feed(format!("Bad event payload: {}", e)))?;
            let mut items = match value {
                Value::Array(items) => items.into_iter(),
                other => return Err(Error::Feed(format!("Event is not an array: {}", other))),
            };
            let name = match items.next() {
                Some(Value::String(name)) => name,
                _ => return Err(Error::Feed("Event has no name".to_string())),
            };
            Ok(Packet::Event {
                name,
                payload: items.next().unwrap_or(Value::Null),
            })
        }
        Some('4') => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
                .unwrap_or_else(|| rest.to_string());
            Ok(Packet::ConnectError(message))
        }
        _ => Ok(Packet::Other),
    }
}

/// Namespace connect frame with the handshake auth payload
pub fn connect_frame(agent_id: &str) -> String {
    format!("40{}", json!({ "agentId": agent_id }))
}

/// Websocket endpoint for a socket.io server base URL
pub fn socket_endpoint(base: &str) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| Error::Config(format!("Invalid socket url {}: {}", base, e)))?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::Config(format!("Unsupported socket scheme {}", other)));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| Error::Config(format!("Cannot use scheme {} for {}", scheme, base)))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

/// Live subscription to one agent's signals. Dropping it closes the socket.
pub struct RealtimeFeed {
    receiver: mpsc::Receiver<TradingSignal>,
    task: JoinHandle<()>,
}

impl RealtimeFeed {
    pub async fn connect(socket_url: &str, agent_id: &str) -> Result<Self> {
        let endpoint = socket_endpoint(socket_url)?;
        let (stream, _) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| Error::Feed(format!("Connecting to {} failed: {}", endpoint, e)))?;
        tracing::info!(%endpoint, agent_id, "Connected to signal feed");

        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let connect = connect_frame(agent_id);
        let agent_id = agent_id.to_string();
        let task = tokio::spawn(async move {
            if let Err(e) = pump(stream, connect, sender).await {
                tracing::warn!(agent_id = %agent_id, error = %e, "Signal feed stopped");
            } else {
                tracing::info!(agent_id = %agent_id, "Signal feed closed");
            }
        });

        Ok(Self { receiver, task })
    }

    /// Next signal, or `None` once the feed has closed
    pub async fn next(&mut self) -> Option<TradingSignal> {
        self.receiver.recv().await
    }
}

impl Drop for RealtimeFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn pump<S>(stream: S, connect: String, sender: mpsc::Sender<TradingSignal>) -> Result<()>
where
    S: futures::Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut write, mut read) = stream.split();

    while let Some(frame) = read.next().await {
        let frame = frame.map_err(|e| Error::Feed(e.to_string()))?;
        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let reply = match decode_packet(&text) {
            Ok(Packet::Open(_)) => Some(connect.clone()),
            Ok(Packet::Ping) => Some("3".to_string()),
            Ok(Packet::Event { name, payload }) if name == SIGNAL_EVENT => {
                match serde_json::from_value::<TradingSignal>(payload) {
                    Ok(signal) => {
                        if sender.send(signal).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Dropping malformed pushed signal"),
                }
                None
            }
            Ok(Packet::Connected) => {
                tracing::debug!("Signal namespace connected");
                None
            }
            Ok(Packet::ConnectError(message)) => {
                return Err(Error::Feed(format!("Connect rejected: {}", message)));
            }
            Ok(Packet::Close) | Ok(Packet::Disconnected) => break,
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring undecodable frame");
                None
            }
        };

        if let Some(reply) = reply {
            write
                .send(Message::Text(reply))
                .await
                .map_err(|e| Error::Feed(e.to_string()))?;
        }
    }

    Ok(())
}
