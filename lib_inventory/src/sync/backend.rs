//! # Backend API
//!
//! The two HTTP calls a consumer makes against the backend: the one-shot
//! snapshot pull and the "start ingestion if idle" trigger.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use thiserror::Error;

use crate::models::InventoryData;
use crate::retrieve::{ApiClient, ApiClientOptions};

pub const INVENTORY_PATH: &str = "api/inventory";
pub const TRIGGER_PATH: &str = "api/trigger_websocket_connection";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("backend answered HTTP {status}")]
    Status { status: u16 },

    #[error("backend returned an empty body")]
    EmptyBody,
}

#[async_trait]
pub trait BackendApi: Send + Sync {
    /// `GET /api/inventory`
    async fn fetch_inventory(&self) -> Result<InventoryData, FetchError>;

    /// `POST /api/trigger_websocket_connection`; returns the server's message.
    async fn trigger_ingestion(&self) -> Result<String, FetchError>;
}

#[derive(Debug, Deserialize)]
struct TriggerResponse {
    message: String,
}

/// [`BackendApi`] over HTTP. Requests are sent exactly once: a failed pull
/// is only retried by the next connectivity event, never by the transport.
pub struct HttpBackend {
    client: ApiClient,
}

impl HttpBackend {
    pub fn new(backend_url: &str, mut options: ApiClientOptions) -> anyhow::Result<Self> {
        options.max_retries = 0;
        Ok(Self {
            client: ApiClient::new(backend_url, options)?,
        })
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn fetch_inventory(&self) -> Result<InventoryData, FetchError> {
        let response = self
            .client
            .request::<InventoryData, ()>(Method::GET, INVENTORY_PATH, None, None)
            .await
            .map_err(|e| FetchError::Transport(format!("{:#}", e)))?;

        if !response.success {
            return Err(FetchError::Status {
                status: response.status,
            });
        }
        response.data.ok_or(FetchError::EmptyBody)
    }

    async fn trigger_ingestion(&self) -> Result<String, FetchError> {
        let response = self
            .client
            .request::<TriggerResponse, _>(
                Method::POST,
                TRIGGER_PATH,
                None,
                Some(serde_json::json!({})),
            )
            .await
            .map_err(|e| FetchError::Transport(format!("{:#}", e)))?;

        if !response.success {
            return Err(FetchError::Status {
                status: response.status,
            });
        }
        response
            .data
            .map(|body| body.message)
            .ok_or(FetchError::EmptyBody)
    }
}
