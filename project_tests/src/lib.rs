//! # Shared Test Fixtures
//!
//! Collaborators the integration tests in `tests/` plug into the library:
//!
//! - [`UpstreamFeed`]: a loopback WebSocket server standing in for the
//!   upstream inventory feed, with a scripted behaviour per connection.
//! - [`MockBackend`]: a [`BackendApi`] that counts pulls and triggers.
//! - [`PipelineBackend`]: a [`BackendApi`] served straight from a pipeline
//!   and ingestion client, for in-process end-to-end runs.
//! - [`ScriptedSource`]: a [`ChannelSource`] whose events the test emits.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::protocol::Message};

use lib_inventory::core::SyncPipeline;
use lib_inventory::ingestors::IngestionClient;
use lib_inventory::models::InventoryData;
use lib_inventory::sync::{BackendApi, ChannelSource, EventReceiver, FetchError, SubscriptionEvent};

/// Routes library logs to the test output when `RUST_LOG` is set.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What the loopback feed does with each accepted connection.
#[derive(Debug, Clone)]
pub enum FeedBehavior {
    /// Drop the TCP stream before the WebSocket handshake completes.
    DropBeforeHandshake,
    /// Complete the handshake, send `messages` as text frames, then either
    /// hold the socket open until the client leaves or close it.
    Serve { messages: Vec<String>, hold_open: bool },
}

pub struct UpstreamFeed {
    url: String,
    accepted: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl UpstreamFeed {
    pub async fn start(behavior: FeedBehavior) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Self::serve(listener, behavior)
    }

    /// Runs the feed on an already bound listener.
    pub fn serve(listener: TcpListener, behavior: FeedBehavior) -> anyhow::Result<Self> {
        let url = format!("ws://{}/", listener.local_addr()?);
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        let task = tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                log::debug!("Feed accepted {}", peer);
                match behavior.clone() {
                    FeedBehavior::DropBeforeHandshake => drop(stream),
                    FeedBehavior::Serve { messages, hold_open } => {
                        tokio::spawn(serve_session(stream, messages, hold_open));
                    }
                }
            }
        });

        Ok(Self { url, accepted, task })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// TCP connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for UpstreamFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_session(stream: tokio::net::TcpStream, messages: Vec<String>, hold_open: bool) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    for text in messages {
        if ws.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }
    if hold_open {
        while let Some(Ok(_)) = ws.next().await {}
    } else {
        let _ = ws.close(None).await;
    }
}

/// JSON text of one upstream reading.
pub fn reading_json(store: &str, model: &str, inventory: u32) -> String {
    serde_json::json!({ "store": store, "model": model, "inventory": inventory }).to_string()
}

#[derive(Default)]
pub struct MockBackend {
    inventory: Mutex<InventoryData>,
    failing: AtomicBool,
    fetches: AtomicUsize,
    triggers: AtomicUsize,
}

impl MockBackend {
    pub fn new(inventory: InventoryData) -> Arc<Self> {
        Arc::new(Self {
            inventory: Mutex::new(inventory),
            ..Self::default()
        })
    }

    /// Every pull answers HTTP 500.
    pub fn failing() -> Arc<Self> {
        let backend = Self::new(InventoryData::empty());
        backend.failing.store(true, Ordering::SeqCst);
        backend
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn fetch_inventory(&self) -> Result<InventoryData, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Status { status: 500 });
        }
        Ok(self.inventory.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn trigger_ingestion(&self) -> Result<String, FetchError> {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        Ok("WebSocket connection attempt triggered".to_string())
    }
}

/// In-process backend: pulls read the pipeline, triggers start ingestion.
pub struct PipelineBackend {
    pub pipeline: Arc<SyncPipeline>,
    pub ingestion: Arc<IngestionClient>,
}

#[async_trait]
impl BackendApi for PipelineBackend {
    async fn fetch_inventory(&self) -> Result<InventoryData, FetchError> {
        self.pipeline
            .current()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }

    async fn trigger_ingestion(&self) -> Result<String, FetchError> {
        self.ingestion.start();
        Ok("WebSocket connection attempt triggered".to_string())
    }
}

/// A source driven by the test: `emit` delivers, `close` ends the stream.
pub struct ScriptedSource {
    tx: Mutex<Option<mpsc::UnboundedSender<SubscriptionEvent>>>,
    rx: Mutex<Option<EventReceiver>>,
    opened: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn emit(&self, event: SubscriptionEvent) {
        if let Some(tx) = self.tx.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            let _ = tx.send(event);
        }
    }

    pub fn close(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Channel names subscriptions were opened for.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSource for ScriptedSource {
    fn open_subscription(&self, channel: &str) -> EventReceiver {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(channel.to_string());
        match self.rx.lock().unwrap_or_else(PoisonError::into_inner).take() {
            Some(rx) => rx,
            // Only one subscription per script; later ones end at once.
            None => mpsc::unbounded_channel().1,
        }
    }
}

/// Waits until `rx` holds `want`. `false` on timeout or a dropped sender.
pub async fn wait_for<T: PartialEq>(rx: &mut watch::Receiver<T>, want: T, within: Duration) -> bool {
    matches!(
        tokio::time::timeout(within, rx.wait_for(|current| *current == want)).await,
        Ok(Ok(_))
    )
}

/// Polls `condition` every few milliseconds until it holds or `within` elapses.
pub async fn eventually(within: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
