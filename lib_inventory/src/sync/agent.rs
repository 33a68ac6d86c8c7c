//! # Client Sync Agent
//!
//! Keeps a consumer's dashboard view current. The push channel is the main
//! source; a direct pull through [`BackendApi`] covers the moments the channel
//! cannot deliver:
//!
//! - the subscription is not confirmed within the fallback timeout,
//! - a confirmed subscription drops,
//! - the channel reports that ingestion gave up (`{"error": ...}`).
//!
//! One task owns the view and applies events in arrival order. Fallback pulls
//! run inline in that task, so a push and a pull never race to overwrite
//! each other.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::INVENTORY_CHANNEL;
use crate::models::{ChannelPayload, InventoryData};
use crate::sync::backend::BackendApi;
use crate::sync::display::DashboardView;
use crate::sync::source::{ChannelSource, EventReceiver, SubscriptionEvent};

pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct SyncAgentConfig {
    pub channel: String,
    /// How long to wait for a confirmed subscription before pulling once.
    pub fallback_timeout: Duration,
}

impl Default for SyncAgentConfig {
    fn default() -> Self {
        Self {
            channel: INVENTORY_CHANNEL.to_string(),
            fallback_timeout: DEFAULT_FALLBACK_TIMEOUT,
        }
    }
}

/// Handle to a running agent. Dropping it stops the agent.
pub struct ClientSyncAgent {
    view: watch::Receiver<Arc<DashboardView>>,
    connectivity: watch::Receiver<ConnectivityState>,
    task: JoinHandle<()>,
}

impl ClientSyncAgent {
    /// Opens the subscription and starts the event loop. Must be called
    /// inside a Tokio runtime.
    pub fn spawn(
        source: &dyn ChannelSource,
        backend: Arc<dyn BackendApi>,
        config: SyncAgentConfig,
    ) -> Self {
        let fallback_deadline = Instant::now() + config.fallback_timeout;
        let events = source.open_subscription(&config.channel);
        let (view_tx, view) = watch::channel(Arc::new(DashboardView::default()));
        let (connectivity_tx, connectivity) = watch::channel(ConnectivityState::Connecting);

        let worker = AgentLoop {
            backend,
            view: view_tx,
            connectivity: connectivity_tx,
            fallback_timeout: config.fallback_timeout,
        };
        let task = tokio::spawn(worker.run(events, fallback_deadline));

        Self {
            view,
            connectivity,
            task,
        }
    }

    /// The latest view. Empty until the first update or pull lands.
    pub fn view(&self) -> Arc<DashboardView> {
        self.view.borrow().clone()
    }

    /// Receiver notified on every view replacement.
    pub fn watch_view(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.view.clone()
    }

    pub fn connectivity(&self) -> ConnectivityState {
        *self.connectivity.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connectivity() == ConnectivityState::Connected
    }

    pub fn watch_connectivity(&self) -> watch::Receiver<ConnectivityState> {
        self.connectivity.clone()
    }

    /// True once the subscription has ended for good or the agent was shut down.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for ClientSyncAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Pulls the current snapshot once. A failed pull yields the empty snapshot;
/// the failure is logged, never surfaced.
pub async fn fallback_fetch(backend: &dyn BackendApi) -> InventoryData {
    match backend.fetch_inventory().await {
        Ok(data) => data,
        Err(e) => {
            log::error!("Error fetching inventory data: {}", e);
            InventoryData::empty()
        }
    }
}

struct AgentLoop {
    backend: Arc<dyn BackendApi>,
    view: watch::Sender<Arc<DashboardView>>,
    connectivity: watch::Sender<ConnectivityState>,
    fallback_timeout: Duration,
}

impl AgentLoop {
    async fn run(self, mut events: EventReceiver, fallback_deadline: Instant) {
        let fallback_timer = tokio::time::sleep_until(fallback_deadline);
        tokio::pin!(fallback_timer);
        let mut timer_armed = true;

        loop {
            tokio::select! {
                () = &mut fallback_timer, if timer_armed => {
                    timer_armed = false;
                    self.on_fallback_timeout().await;
                }
                event = events.recv() => match event {
                    Some(SubscriptionEvent::Connected) => {
                        log::info!("Connected to inventory channel.");
                        timer_armed = false;
                        self.set_connectivity(ConnectivityState::Connected);
                        self.notify_backend();
                    }
                    Some(SubscriptionEvent::Disconnected) => {
                        log::warn!("Disconnected from inventory channel.");
                        self.set_connectivity(ConnectivityState::Disconnected);
                        self.pull().await;
                    }
                    Some(SubscriptionEvent::Received(ChannelPayload::Error { error })) => {
                        log::warn!("Channel reported an upstream failure: {}", error);
                        self.pull().await;
                    }
                    Some(SubscriptionEvent::Received(ChannelPayload::Update(data))) => {
                        self.publish(data);
                    }
                    None => {
                        log::info!("Inventory channel subscription ended.");
                        self.set_connectivity(ConnectivityState::Disconnected);
                        break;
                    }
                }
            }
        }

        // A subscription that ended unconfirmed still owes its one pull.
        if timer_armed {
            fallback_timer.await;
            self.on_fallback_timeout().await;
        }
    }

    async fn on_fallback_timeout(&self) {
        if *self.connectivity.borrow() == ConnectivityState::Connected {
            return;
        }
        log::warn!(
            "Channel not confirmed after {}ms; pulling inventory directly.",
            self.fallback_timeout.as_millis()
        );
        self.pull().await;
    }

    async fn pull(&self) {
        let data = fallback_fetch(self.backend.as_ref()).await;
        self.publish(data);
    }

    fn publish(&self, data: InventoryData) {
        let view = DashboardView::new(data.inventory, &data.alerts);
        log::debug!(
            "View updated: {} store(s), {} alert(s)",
            view.inventory.stores().len(),
            view.alerts.len()
        );
        self.view.send_replace(Arc::new(view));
    }

    fn set_connectivity(&self, state: ConnectivityState) {
        self.connectivity.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    // Fire-and-forget: the backend ignores the trigger while a session runs.
    fn notify_backend(&self) {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            match backend.trigger_ingestion().await {
                Ok(message) => log::info!("Backend: {}", message),
                Err(e) => log::error!("Error notifying backend of connection: {}", e),
            }
        });
    }
}
