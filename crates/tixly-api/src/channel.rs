//! Notification channel client with auto-reconnect.
//!
//! Connects to the ticketing service's WebSocket endpoint and streams
//! topic-addressed change notifications through a
//! [`tokio::sync::broadcast`] channel. Reconnects with a fixed delay;
//! the subscription registry in `tixly-core` replays registrations after
//! every connect, so the transport itself keeps no subscription state.
//!
//! # Example
//!
//! ```rust,ignore
//! use tixly_api::channel::NotificationChannel;
//! use url::Url;
//!
//! let channel = NotificationChannel::new(Url::parse("ws://localhost:8080/ws")?);
//! let mut rx = channel.connect();
//! channel.subscribe_topic("/topic/tickets");
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//!
//! channel.disconnect();
//! ```

use std::sync::Mutex;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── ChannelEvent ─────────────────────────────────────────────────────

/// An event observed on the notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The underlying connection is established and ready for
    /// subscribe frames.
    Connected,
    /// The connection dropped; a reconnect attempt follows after the
    /// configured delay.
    Disconnected,
    /// A notification published on a subscribed topic.
    Message { topic: String, body: String },
}

// ── ChannelConfig ────────────────────────────────────────────────────

/// Reconnection tuning for the notification channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Fixed delay between reconnection attempts. Default: 5s.
    pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

// ── Wire frames ──────────────────────────────────────────────────────

/// Server→client message frame.
#[derive(Debug, Deserialize)]
struct MessageFrame {
    topic: String,
    #[serde(default)]
    body: String,
}

/// Client→server control commands.
#[derive(Debug)]
enum Command {
    Subscribe(String),
    Unsubscribe(String),
    Publish { topic: String, body: String },
}

fn encode_command(cmd: &Command) -> String {
    match cmd {
        Command::Subscribe(topic) => {
            serde_json::json!({ "action": "SUBSCRIBE", "topic": topic }).to_string()
        }
        Command::Unsubscribe(topic) => {
            serde_json::json!({ "action": "UNSUBSCRIBE", "topic": topic }).to_string()
        }
        Command::Publish { topic, body } => {
            serde_json::json!({ "action": "SEND", "topic": topic, "body": body }).to_string()
        }
    }
}

// ── NotificationChannel ──────────────────────────────────────────────

/// Handle to the notification channel connection.
///
/// One instance is shared process-wide: `connect()` at application
/// start, `disconnect()` at teardown. Consumers observe the connection
/// through the broadcast receiver returned by `connect()`.
pub struct NotificationChannel {
    url: Url,
    config: ChannelConfig,
    events: broadcast::Sender<ChannelEvent>,
    commands: mpsc::UnboundedSender<Command>,
    command_rx: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
    cancel: CancellationToken,
}

impl NotificationChannel {
    /// Create a channel client with default reconnect tuning.
    /// Does not connect -- call [`connect()`](Self::connect).
    pub fn new(url: Url) -> Self {
        Self::with_config(url, ChannelConfig::default())
    }

    pub fn with_config(url: Url, config: ChannelConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (commands, command_rx) = mpsc::unbounded_channel();

        Self {
            url,
            config,
            events,
            commands,
            command_rx: Mutex::new(Some(command_rx)),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the connection loop if it is not running yet and return a
    /// receiver for channel events. Idempotent: later calls only hand
    /// out another receiver.
    pub fn connect(&self) -> broadcast::Receiver<ChannelEvent> {
        let taken = self
            .command_rx
            .lock()
            .expect("channel command receiver lock poisoned")
            .take();

        if let Some(command_rx) = taken {
            let url = self.url.clone();
            let config = self.config.clone();
            let events = self.events.clone();
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                channel_loop(url, config, events, command_rx, cancel).await;
            });
        }

        self.events.subscribe()
    }

    /// Ask the service to start delivering notifications for `topic`.
    pub fn subscribe_topic(&self, topic: &str) {
        let _ = self.commands.send(Command::Subscribe(topic.to_owned()));
    }

    /// Stop delivery for `topic`.
    pub fn unsubscribe_topic(&self, topic: &str) {
        let _ = self.commands.send(Command::Unsubscribe(topic.to_owned()));
    }

    /// Publish a payload to a topic. Unused by the cache itself but part
    /// of the channel contract.
    pub fn publish(&self, topic: &str, body: &str) {
        let _ = self.commands.send(Command::Publish {
            topic: topic.to_owned(),
            body: body.to_owned(),
        });
    }

    /// Tear the connection down. The loop exits and no reconnect is
    /// attempted; a torn-down channel cannot be reused.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read/write → on drop, fixed delay → reconnect.
async fn channel_loop(
    url: Url,
    config: ChannelConfig,
    events: broadcast::Sender<ChannelEvent>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = run_connection(&url, &events, &mut commands, &cancel) => {
                match result {
                    Ok(()) => tracing::info!("channel disconnected cleanly"),
                    Err(e) => tracing::warn!(error = %e, "channel error"),
                }
                let _ = events.send(ChannelEvent::Disconnected);

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(config.reconnect_delay) => {}
                }
            }
        }
    }

    tracing::debug!("channel loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one connection, then shuttle frames until it drops.
async fn run_connection(
    url: &Url,
    events: &broadcast::Sender<ChannelEvent>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to notification channel");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::ChannelConnect(e.to_string()))?;

    tracing::info!("channel connected");

    // Commands queued while offline target a dead connection; the
    // registry replays registrations after every connect event.
    while commands.try_recv().is_ok() {}
    let _ = events.send(ChannelEvent::Connected);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            cmd = commands.recv() => {
                let Some(cmd) = cmd else {
                    // All senders gone -- the channel handle was dropped.
                    cancel.cancel();
                    return Ok(());
                };
                let frame = encode_command(&cmd);
                write
                    .send(tungstenite::Message::Text(frame.into()))
                    .await
                    .map_err(|e| Error::ChannelClosed { reason: e.to_string() })?;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        dispatch_frame(text.as_str(), events);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite replies with pong automatically
                        tracing::trace!("channel ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "channel close frame");
                        } else {
                            tracing::info!("channel close frame (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::ChannelClosed { reason: e.to_string() });
                    }
                    None => {
                        tracing::info!("channel stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Parse a text frame and broadcast the message it carries.
fn dispatch_frame(text: &str, events: &broadcast::Sender<ChannelEvent>) {
    match serde_json::from_str::<MessageFrame>(text) {
        Ok(frame) => {
            // Ignore send errors -- just means no active receivers right now
            let _ = events.send(ChannelEvent::Message {
                topic: frame.topic,
                body: frame.body,
            });
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse channel frame");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_fixed_five_second_delay() {
        let config = ChannelConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn subscribe_command_encoding() {
        let frame = encode_command(&Command::Subscribe("/topic/tickets".into()));
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["action"], "SUBSCRIBE");
        assert_eq!(value["topic"], "/topic/tickets");
    }

    #[test]
    fn publish_command_carries_body() {
        let frame = encode_command(&Command::Publish {
            topic: "/topic/persons".into(),
            body: r#"{"eventType":"CREATED"}"#.into(),
        });
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["action"], "SEND");
        assert_eq!(value["body"], r#"{"eventType":"CREATED"}"#);
    }

    #[test]
    fn dispatch_frame_broadcasts_message() {
        let (tx, mut rx) = broadcast::channel(16);

        let raw = serde_json::json!({
            "topic": "/topic/tickets",
            "body": r#"{"eventType":"DELETED","entityId":3}"#
        });
        dispatch_frame(&raw.to_string(), &tx);

        let event = rx.try_recv().unwrap();
        assert_eq!(
            event,
            ChannelEvent::Message {
                topic: "/topic/tickets".into(),
                body: r#"{"eventType":"DELETED","entityId":3}"#.into(),
            }
        );
    }

    #[test]
    fn dispatch_frame_without_body_defaults_empty() {
        let (tx, mut rx) = broadcast::channel(16);

        dispatch_frame(r#"{"topic":"/topic/venues"}"#, &tx);

        let event = rx.try_recv().unwrap();
        assert_eq!(
            event,
            ChannelEvent::Message {
                topic: "/topic/venues".into(),
                body: String::new(),
            }
        );
    }

    #[test]
    fn dispatch_frame_malformed_json() {
        let (tx, mut rx) = broadcast::channel::<ChannelEvent>(16);

        dispatch_frame("not json at all", &tx);

        // Should not panic, should just log and skip
        assert!(rx.try_recv().is_err());
    }
}
