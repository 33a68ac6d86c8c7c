//! # Core Engine Module
//!
//! The producer side of the synchronization pipeline.
//!
//! ## Core Components:
//!
//! - **`store`**: the `InventoryStore` seam over external storage, plus an
//!   in-memory implementation that keeps first-seen order.
//!
//! - **`alerts`**: the pure alert engine (`generate`).
//!
//! - **`channel`**: the named `BroadcastChannel` fanning payloads out to
//!   subscribers without replay.
//!
//! - **`pipeline`**: `SyncPipeline`, which chains the three for every reading
//!   and serves the pull endpoint from the same code path.

/// Storage seam and in-memory aggregation store.
pub mod store;
/// Pure low-inventory alert derivation.
pub mod alerts;
/// Named fan-out channel.
pub mod channel;
/// Upsert → aggregate → alerts → broadcast.
pub mod pipeline;

// --- Public API Re-exports ---
pub use store::{InventoryStore, MemoryInventoryStore, StoreError};
pub use channel::{BroadcastChannel, ChannelReceiver, INVENTORY_CHANNEL};
pub use pipeline::SyncPipeline;
