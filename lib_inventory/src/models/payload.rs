//! # Channel Payload
//!
//! What a subscriber of `inventory_channel` receives. On the wire the two
//! variants are distinguished by shape alone, exactly as the dashboard expects:
//!
//! - `{"inventory": [...], "alerts": [...]}` for a normal update,
//! - `{"error": "..."}` once the ingestion client gives up reconnecting.
//!
//! In Rust they are an enum, so consumers `match` instead of probing fields.

use serde::{Deserialize, Serialize};

use crate::models::{Alert, Snapshot};

/// Body of a normal update and of `GET /api/inventory`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryData {
    pub inventory: Snapshot,
    pub alerts: Vec<Alert>,
}

impl InventoryData {
    pub fn new(inventory: Snapshot, alerts: Vec<Alert>) -> Self {
        Self { inventory, alerts }
    }

    /// The substitute used when a pull fails.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelPayload {
    // Listed first so a payload carrying `error` always decodes as an error.
    Error { error: String },
    Update(InventoryData),
}

impl ChannelPayload {
    pub fn is_error(&self) -> bool {
        matches!(self, ChannelPayload::Error { .. })
    }
}
