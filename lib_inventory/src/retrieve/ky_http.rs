//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest` with optional
//! exponential-backoff retries (`reqwest-retry`) and standardized JSON
//! response handling.

use std::time::Duration;

use anyhow::Context;
use reqwest::{header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE}, Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};

/// A standardized container for API responses.
///
/// Wraps the deserialized data along with the HTTP status and headers.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// Construction options for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    /// Optional Bearer token for the Authorization header.
    pub auth_token: Option<String>,
    /// Transient-failure retries. `0` sends every request exactly once.
    pub max_retries: u32,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            auth_token: None,
            max_retries: 3,
            timeout: Duration::from_secs(10),
        }
    }
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles base URLs,
/// authentication tokens, and automatic retries.
pub struct ApiClient {
    inner: ClientWithMiddleware,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a new `ApiClient`.
    ///
    /// `base_url` must be absolute. A trailing slash is added if missing so
    /// that relative paths join under it rather than replacing its last segment.
    ///
    /// # Errors
    /// Returns an error if the URL is not absolute or the client cannot be built.
    pub fn new(base_url: &str, options: ApiClientOptions) -> anyhow::Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let url = Url::parse(&normalized)
            .with_context(|| format!("Invalid base URL (must be absolute): {}", base_url))?;

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent("lib_inventory/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        let mut builder = ClientBuilder::new(http);
        if options.max_retries > 0 {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(options.max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            inner: builder.build(),
            base_url: url,
            auth_token: options.auth_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs a generic HTTP request and handles the response.
    ///
    /// # Arguments
    /// * `method` - The HTTP verb (GET, POST, etc.).
    /// * `path` - The relative path to append to the base URL.
    /// * `headers` - Optional additional headers for this specific request.
    /// * `body` - Optional serializable object to send as the JSON body.
    ///
    /// # Errors
    /// Returns an error if URL joining, the network call, or decoding a 2xx
    /// body fails. Non-2xx statuses are not errors; see `ApiResponse::success`.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        headers: Option<HeaderMap>,
        body: Option<B>,
    ) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let full_url = self.base_url.join(path.trim_start_matches('/'))?;
        let mut req = self.inner.request(method, full_url);

        if let Some(h) = headers {
            req = req.headers(h);
        }

        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if let Some(b) = body {
            let json_body = serde_json::to_string(&b)?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }

        let response: reqwest::Response = req.send().await?;
        let status = response.status();
        let resp_headers = response.headers().clone();

        if status.is_success() {
            let data = response.json::<T>().await?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers: resp_headers,
            })
        } else {
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers: resp_headers,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = ApiClient::new("http://localhost:3000", ApiClientOptions::default()).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:3000/");
        assert_eq!(
            client.base_url().join("api/inventory").unwrap().as_str(),
            "http://localhost:3000/api/inventory"
        );

        let prefixed = ApiClient::new("http://host/backend", ApiClientOptions::default()).unwrap();
        assert_eq!(
            prefixed.base_url().join("api/inventory").unwrap().as_str(),
            "http://host/backend/api/inventory"
        );
    }

    #[test]
    fn relative_base_url_is_rejected() {
        assert!(ApiClient::new("/api", ApiClientOptions::default()).is_err());
        assert!(ApiClient::new("", ApiClientOptions::default()).is_err());
    }
}
