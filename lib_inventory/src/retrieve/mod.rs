//! # Data Retrieval Module
//!
//! Generic HTTP retrieval shared by every component that talks to a REST
//! endpoint, so request building, JSON handling and retry policy live in one
//! place.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: `ApiClient` built on `reqwest` and `reqwest-middleware`,
//!   with a configurable (possibly zero) number of exponential-backoff retries.

/// Generic HTTP API client with optional retry middleware.
pub mod ky_http;

pub use ky_http::{ApiClient, ApiClientOptions, ApiResponse};
