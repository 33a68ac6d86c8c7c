//! # lib_inventory
//!
//! Real-time store inventory synchronization: an upstream WebSocket ingestor
//! folds readings into an ordered snapshot, derives low-inventory alerts and
//! fans both out over a named broadcast channel. The consumer side subscribes
//! to that channel and falls back to one-shot HTTP polling whenever the
//! channel is not delivering.
//!
//! Every module sits behind a cargo feature so binaries only pull the stack
//! they need:
//!
//! | feature     | modules                         |
//! |-------------|---------------------------------|
//! | `core`      | `models`, `core`                |
//! | `ingestors` | `ingestors` (implies `core`)    |
//! | `retrieve`  | `retrieve`                      |
//! | `sync`      | `sync` (implies `core`, `retrieve`) |

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Wire and domain types shared by producer and consumer.
#[cfg(feature = "core")]
pub mod models;

/// Aggregation store, alert engine, broadcast channel and the pipeline tying them together.
#[cfg(feature = "core")]
pub mod core;

/// Upstream feed clients.
#[cfg(feature = "ingestors")]
pub mod ingestors;

/// Generic HTTP retrieval with optional retry middleware.
#[cfg(feature = "retrieve")]
pub mod retrieve;

/// Consumer-side channel subscription and fallback polling.
#[cfg(feature = "sync")]
pub mod sync;
