//! # Consumer Sync Module
//!
//! The consumer side: a [`ClientSyncAgent`] that subscribes to the inventory
//! channel through a [`ChannelSource`] and falls back to pulling from a
//! [`BackendApi`] when the push path is unavailable.
//!
//! ## Contained Modules:
//!
//! - **`source`**: subscription events, the in-process source and the remote
//!   cable client.
//! - **`backend`**: pull and trigger calls, with an HTTP implementation.
//! - **`display`**: severity styling applied to every alert list shown.
//! - **`agent`**: the event loop owning the view.

pub mod agent;
pub mod backend;
pub mod display;
pub mod source;

pub use agent::{fallback_fetch, ClientSyncAgent, ConnectivityState, SyncAgentConfig};
pub use backend::{BackendApi, FetchError, HttpBackend};
pub use display::{DashboardView, DisplayAlert};
pub use source::{ChannelSource, EventReceiver, RemoteChannel, SubscriptionEvent};
