//! # Data Ingestors Module
//!
//! Clients that pull readings from external feeds into the pipeline. Each
//! submodule owns the connection lifecycle for one kind of source.
//!
//! ## Contained Modules:
//! - **`inventory_wss`**: the single-flight WebSocket client for the upstream
//!   inventory feed, with a bounded fixed-delay reconnect policy.

/// The WebSocket client for the upstream inventory feed.
pub mod inventory_wss;

// --- Public API Re-exports ---
pub use inventory_wss::{IngestionClient, IngestionConfig, IngestionState};
