//! # Channel Sources
//!
//! How a consumer reaches the broadcast channel. A source turns a
//! subscription into a stream of lifecycle events; the agent never sees the
//! transport underneath.
//!
//! - `BroadcastChannel` itself, for consumers living in the same process.
//! - [`RemoteChannel`], which speaks the cable framing over a WebSocket and
//!   re-establishes the transport after a fixed delay.

use std::time::Duration;

use anyhow::{bail, Context};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use crate::core::BroadcastChannel;
use crate::models::{CableCommand, CableFrame, ChannelPayload};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// The channel confirmed the subscription.
    Connected,
    /// A confirmed subscription lost its transport.
    Disconnected,
    Received(ChannelPayload),
}

/// Ends (yields `None`) when the source will never deliver again.
pub type EventReceiver = mpsc::UnboundedReceiver<SubscriptionEvent>;

pub trait ChannelSource: Send + Sync {
    fn open_subscription(&self, channel: &str) -> EventReceiver;
}

impl ChannelSource for BroadcastChannel {
    fn open_subscription(&self, channel: &str) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if channel != self.name() {
            log::warn!("Subscription to unknown channel '{}' rejected.", channel);
            return rx;
        }

        let mut inbound = self.subscribe();
        let _ = tx.send(SubscriptionEvent::Connected);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    received = inbound.recv() => match received {
                        Ok(payload) => {
                            if tx.send(SubscriptionEvent::Received((*payload).clone())).is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            log::warn!("Local subscriber lagged; skipped {} payload(s).", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            let _ = tx.send(SubscriptionEvent::Disconnected);
                            break;
                        }
                    }
                }
            }
        });
        rx
    }
}

/// Cable client for a backend's `/cable` endpoint.
#[derive(Debug, Clone)]
pub struct RemoteChannel {
    cable_url: String,
    reconnect_delay: Duration,
}

enum SessionOutcome {
    NeverConfirmed,
    Confirmed,
    Rejected,
}

impl RemoteChannel {
    pub fn new(cable_url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            cable_url: cable_url.into(),
            reconnect_delay,
        }
    }

    /// Derives `ws(s)://host[:port]/…/cable` from the backend's HTTP base URL.
    pub fn for_backend(backend_url: &str, reconnect_delay: Duration) -> anyhow::Result<Self> {
        let mut url = Url::parse(backend_url)
            .with_context(|| format!("Invalid backend URL: {}", backend_url))?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => bail!("Unsupported backend URL scheme: {}", other),
        };
        if url.set_scheme(scheme).is_err() {
            bail!("Cannot derive a WebSocket URL from {}", backend_url);
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        let cable = url.join("cable")?;
        Ok(Self::new(cable.to_string(), reconnect_delay))
    }

    pub fn cable_url(&self) -> &str {
        &self.cable_url
    }
}

impl ChannelSource for RemoteChannel {
    fn open_subscription(&self, channel: &str) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let url = self.cable_url.clone();
        let channel = channel.to_string();
        let delay = self.reconnect_delay;

        tokio::spawn(async move {
            loop {
                let outcome = tokio::select! {
                    _ = tx.closed() => return,
                    outcome = cable_session(&url, &channel, &tx) => outcome,
                };

                match outcome {
                    SessionOutcome::Rejected => return,
                    SessionOutcome::Confirmed => {
                        if tx.send(SubscriptionEvent::Disconnected).is_err() {
                            return;
                        }
                    }
                    SessionOutcome::NeverConfirmed => {}
                }

                log::debug!("Reconnecting to {} in {}ms", url, delay.as_millis());
                tokio::select! {
                    _ = tx.closed() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        });
        rx
    }
}

async fn cable_session(
    url: &str,
    channel: &str,
    tx: &mpsc::UnboundedSender<SubscriptionEvent>,
) -> SessionOutcome {
    let mut ws = match connect_async(url).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            log::warn!("Failed to reach cable endpoint {}: {}", url, e);
            return SessionOutcome::NeverConfirmed;
        }
    };

    let subscribe = CableCommand::Subscribe {
        channel: channel.to_string(),
    };
    let command = match serde_json::to_string(&subscribe) {
        Ok(text) => text,
        Err(e) => {
            log::error!("Failed to encode subscribe command: {}", e);
            return SessionOutcome::NeverConfirmed;
        }
    };
    if let Err(e) = ws.send(Message::Text(command.into())).await {
        log::warn!("Failed to send subscribe command: {}", e);
        return SessionOutcome::NeverConfirmed;
    }

    let mut outcome = SessionOutcome::NeverConfirmed;
    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<CableFrame>(text.as_str()) {
                Ok(CableFrame::ConfirmSubscription { .. }) => {
                    log::info!("Subscription to '{}' confirmed.", channel);
                    outcome = SessionOutcome::Confirmed;
                    let _ = tx.send(SubscriptionEvent::Connected);
                }
                Ok(CableFrame::RejectSubscription { channel }) => {
                    log::error!("Subscription to '{}' rejected by server.", channel);
                    let _ = ws.close(None).await;
                    return SessionOutcome::Rejected;
                }
                Ok(CableFrame::Message { message, .. }) => {
                    let _ = tx.send(SubscriptionEvent::Received(message));
                }
                Err(e) => log::warn!("Ignoring undecodable cable frame: {}", e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                log::warn!("Cable transport error: {}", e);
                break;
            }
        }
    }
    outcome
}
