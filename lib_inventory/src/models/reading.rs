//! # Upstream Reading
//!
//! The feed sends one JSON object per message:
//!
//! ```json
//! {"store": "ALDO Maine Mall", "model": "ADERI", "inventory": 7}
//! ```
//!
//! Decoding is strict about types and fails closed: a negative or fractional
//! count, a missing field, or a blank name yields a [`ProtocolError`] and the
//! message is dropped by the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A malformed or undecodable inbound message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("payload is not a valid reading: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("payload is not valid UTF-8")]
    NotUtf8,

    #[error("reading has an empty `{0}` field")]
    EmptyField(&'static str),
}

/// A single upstream update for one (store, model) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub store: String,
    pub model: String,
    pub inventory: u32,
}

impl Reading {
    pub fn new(store: impl Into<String>, model: impl Into<String>, inventory: u32) -> Self {
        Self {
            store: store.into(),
            model: model.into(),
            inventory,
        }
    }

    /// Decodes and validates a text frame.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let reading: Reading = serde_json::from_str(text)?;
        reading.validate()
    }

    /// Decodes a binary frame, which must hold the same UTF-8 JSON as a text frame.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::NotUtf8)?;
        Self::from_json(text)
    }

    fn validate(self) -> Result<Self, ProtocolError> {
        if self.store.trim().is_empty() {
            return Err(ProtocolError::EmptyField("store"));
        }
        if self.model.trim().is_empty() {
            return Err(ProtocolError::EmptyField("model"));
        }
        Ok(self)
    }
}
