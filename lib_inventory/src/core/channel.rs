//! # Broadcast Channel
//!
//! Named fan-out of [`ChannelPayload`]s to every subscriber present at the
//! moment of a broadcast.
//!
//! ## Delivery Model:
//!
//! 1.  **Shared Frames**: each payload is wrapped in an `Arc` once; subscribers
//!     receive clones of the pointer, not of the snapshot.
//! 2.  **No Replay**: a subscriber only sees payloads broadcast after it
//!     subscribed. There is no log to catch up from.
//! 3.  **Fire-and-Forget**: broadcasting never waits on subscribers and keeps
//!     no per-subscriber acknowledgement. A subscriber that falls more than
//!     `capacity` payloads behind skips the ones it missed; since every update
//!     is a full snapshot, the next one it reads supersedes them.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::models::{Alert, ChannelPayload, InventoryData, Snapshot};

/// Name under which the dashboard subscribes.
pub const INVENTORY_CHANNEL: &str = "inventory_channel";

/// Default number of payloads buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

pub type ChannelReceiver = broadcast::Receiver<Arc<ChannelPayload>>;

#[derive(Debug)]
pub struct BroadcastChannel {
    name: String,
    sender: broadcast::Sender<Arc<ChannelPayload>>,
}

impl BroadcastChannel {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            sender,
        }
    }

    /// The `inventory_channel` with the default capacity.
    pub fn inventory() -> Self {
        Self::new(INVENTORY_CHANNEL, DEFAULT_CAPACITY)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self) -> ChannelReceiver {
        self.sender.subscribe()
    }

    /// Delivers a normal update. Returns how many subscribers it reached.
    pub fn broadcast(&self, snapshot: Snapshot, alerts: Vec<Alert>) -> usize {
        self.publish(ChannelPayload::Update(InventoryData::new(snapshot, alerts)))
    }

    /// Delivers the terminal error signal.
    pub fn broadcast_error(&self, message: impl Into<String>) -> usize {
        self.publish(ChannelPayload::Error {
            error: message.into(),
        })
    }

    fn publish(&self, payload: ChannelPayload) -> usize {
        let is_error = payload.is_error();
        match self.sender.send(Arc::new(payload)) {
            Ok(reached) => {
                log::debug!(
                    "Broadcast {} on '{}' to {} subscriber(s)",
                    if is_error { "error" } else { "update" },
                    self.name,
                    reached
                );
                reached
            }
            Err(_) => {
                log::trace!("No subscribers on '{}'; payload dropped.", self.name);
                0
            }
        }
    }
}
