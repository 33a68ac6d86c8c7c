//! # Models
//!
//! Plain data carried through the pipeline. Nothing in here performs I/O.
//!
//! - **`reading`**: a single upstream update and its typed decoder.
//! - **`snapshot`**: the ordered per-store, per-model view.
//! - **`alert`**: low-inventory warnings and their severity.
//! - **`payload`**: the two shapes a channel subscriber can receive.
//! - **`cable`**: WebSocket framing used to carry a channel to remote consumers.

pub mod alert;
pub mod cable;
pub mod payload;
pub mod reading;
pub mod snapshot;

pub use alert::{Alert, Severity};
pub use cable::{CableCommand, CableFrame};
pub use payload::{ChannelPayload, InventoryData};
pub use reading::{ProtocolError, Reading};
pub use snapshot::{ShoeEntry, Snapshot, StoreEntry};
