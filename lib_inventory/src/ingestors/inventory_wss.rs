//! # Inventory WSS Ingestor
//!
//! WebSocket client for the upstream inventory feed.
//! Location: lib_inventory/src/ingestors/inventory_wss.rs
//!
//! ## Lifecycle
//!
//! ```text
//! Disconnected --start()--> Connecting --open--> Connected
//!      ^                        ^                    |
//!      |                        +--close, retry <----+
//!      +--stop()                                     |
//!                               Terminal <--close, retries exhausted
//! ```
//!
//! - `start()` never blocks: it spawns the session on its own Tokio task and
//!   returns. While a session is active further calls are no-ops, so at most
//!   one socket or reconnect sequence exists per client.
//! - A successful open resets the retry counter. After `max_attempts`
//!   consecutive failed reconnects the client broadcasts the error signal on
//!   the channel and the task ends; only a fresh `start()` resumes.
//! - A malformed message is dropped and logged; the connection stays up.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;

use crate::core::pipeline::SyncPipeline;
use crate::models::{ProtocolError, Reading};

/// Port of the upstream feed; the host comes from configuration.
pub const UPSTREAM_PORT: u16 = 8080;
/// Reconnects attempted after the first connection fails or drops.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
/// Fixed pause before each reconnect.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Error text broadcast once reconnects are exhausted.
pub const EXHAUSTED_MESSAGE: &str = "WebSocket connection error";

/// Configuration for the upstream WebSocket feed.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub ws_url: String,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
}

impl IngestionConfig {
    /// `ws://{host}:8080/` with the default retry policy.
    pub fn for_host(host: &str) -> Self {
        Self {
            ws_url: format!("ws://{}:{}/", host, UPSTREAM_PORT),
            ..Self::default()
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            ws_url: format!("ws://localhost:{}/", UPSTREAM_PORT),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionState {
    Disconnected,
    Connecting,
    Connected,
    /// Reconnects exhausted; waiting for an explicit `start()`.
    Terminal,
}

enum SessionEnd {
    Closed,
    Cancelled,
}

pub struct IngestionClient {
    config: IngestionConfig,
    pipeline: Arc<SyncPipeline>,
    in_flight: AtomicBool,
    state: watch::Sender<IngestionState>,
    attempts: AtomicU64,
    cancel: Mutex<CancellationToken>,
}

impl IngestionClient {
    pub fn new(config: IngestionConfig, pipeline: Arc<SyncPipeline>) -> Self {
        let (state, _) = watch::channel(IngestionState::Disconnected);
        Self {
            config,
            pipeline,
            in_flight: AtomicBool::new(false),
            state,
            attempts: AtomicU64::new(0),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Starts a session unless one is already active.
    ///
    /// Returns `true` if this call spawned the session. Must be called from
    /// within a Tokio runtime.
    pub fn start(self: &Arc<Self>) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Ingestion session already active; start ignored.");
            return false;
        }

        let token = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
        self.set_state(IngestionState::Connecting);

        let client = Arc::clone(self);
        tokio::spawn(async move { client.run(token).await });
        true
    }

    /// Cancels the active session, if any. The state returns to
    /// `Disconnected` once the session task has wound down.
    pub fn stop(&self) {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn state(&self) -> IngestionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<IngestionState> {
        self.state.subscribe()
    }

    /// Connection attempts made over the client's lifetime.
    pub fn connection_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut attempt: u32 = 0;

        loop {
            if let SessionEnd::Cancelled = self.connect(&mut attempt, &token).await {
                log::info!("Ingestion session stopped.");
                self.set_state(IngestionState::Disconnected);
                break;
            }

            if attempt < self.config.max_attempts {
                attempt += 1;
                log::info!(
                    "Reconnecting attempt {} in {}ms",
                    attempt,
                    self.config.retry_delay.as_millis()
                );
                self.set_state(IngestionState::Connecting);

                tokio::select! {
                    _ = token.cancelled() => {
                        log::info!("Ingestion session stopped while waiting to reconnect.");
                        self.set_state(IngestionState::Disconnected);
                        break;
                    }
                    _ = tokio::time::sleep(self.config.retry_delay) => {}
                }
            } else {
                log::error!(
                    "Upstream feed unreachable after {} reconnect attempt(s); giving up.",
                    self.config.max_attempts
                );
                self.set_state(IngestionState::Terminal);
                self.pipeline.signal_error(EXHAUSTED_MESSAGE);
                break;
            }
        }

        self.in_flight.store(false, Ordering::Release);
    }

    /// One connection: open, read until the socket closes or the session is
    /// cancelled. Resets `attempt` once the socket is open.
    async fn connect(&self, attempt: &mut u32, token: &CancellationToken) -> SessionEnd {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        log::info!("Connecting to upstream feed: {}", self.config.ws_url);

        let opening = tokio::time::timeout(
            self.config.connect_timeout,
            connect_async(self.config.ws_url.as_str()),
        );

        let mut ws = tokio::select! {
            _ = token.cancelled() => return SessionEnd::Cancelled,
            result = opening => match result {
                Ok(Ok((ws, _))) => ws,
                Ok(Err(e)) => {
                    log::error!("Failed to connect to upstream feed: {}", e);
                    return SessionEnd::Closed;
                }
                Err(_) => {
                    log::error!(
                        "Timed out after {}ms connecting to upstream feed.",
                        self.config.connect_timeout.as_millis()
                    );
                    return SessionEnd::Closed;
                }
            }
        };

        *attempt = 0;
        self.set_state(IngestionState::Connected);
        log::info!("Upstream connection opened.");

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    let _ = ws.close(None).await;
                    return SessionEnd::Cancelled;
                }
                msg = ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_message(Reading::from_json(text.as_str())).await;
                    }
                    Some(Ok(Message::Binary(bin))) => {
                        self.handle_message(Reading::from_bytes(&bin)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        log::warn!("Upstream connection closed by remote: {:?}", frame);
                        return SessionEnd::Closed;
                    }
                    // Ping/Pong are answered by tungstenite itself.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::error!("Upstream transport error: {}", e);
                        let _ = ws.close(None).await;
                        return SessionEnd::Closed;
                    }
                    None => {
                        log::warn!("Upstream stream ended.");
                        return SessionEnd::Closed;
                    }
                }
            }
        }
    }

    async fn handle_message(&self, decoded: Result<Reading, ProtocolError>) {
        match decoded {
            Ok(reading) => {
                if let Err(e) = self.pipeline.apply(&reading).await {
                    log::error!(
                        "Dropping reading for {}/{}: {}",
                        reading.store,
                        reading.model,
                        e
                    );
                }
            }
            Err(e) => log::warn!("Dropping malformed upstream message: {}", e),
        }
    }

    fn set_state(&self, next: IngestionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                log::debug!("Ingestion state: {:?} -> {:?}", *current, next);
                *current = next;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BroadcastChannel, MemoryInventoryStore};

    fn client(config: IngestionConfig) -> Arc<IngestionClient> {
        let pipeline = Arc::new(SyncPipeline::new(
            Arc::new(MemoryInventoryStore::new()),
            Arc::new(BroadcastChannel::inventory()),
        ));
        Arc::new(IngestionClient::new(config, pipeline))
    }

    #[test]
    fn host_config_uses_fixed_port_and_path() {
        let config = IngestionConfig::for_host("feed.internal");
        assert_eq!(config.ws_url, "ws://feed.internal:8080/");
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn starts_disconnected() {
        let client = client(IngestionConfig::default());
        assert_eq!(client.state(), IngestionState::Disconnected);
        assert!(!client.is_running());
        assert_eq!(client.connection_attempts(), 0);
    }

    #[tokio::test]
    async fn malformed_message_is_dropped() {
        let client = client(IngestionConfig::default());
        let mut rx = client.pipeline.channel().subscribe();

        client.handle_message(Reading::from_json("{oops")).await;
        assert!(rx.try_recv().is_err());

        client
            .handle_message(Reading::from_json(r#"{"store":"A","model":"X","inventory":4}"#))
            .await;
        assert!(!rx.recv().await.unwrap().is_error());
    }
}
