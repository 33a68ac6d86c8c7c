//! Client sync agent fallback discipline on a paused clock.

use std::time::Duration;

use lib_inventory::models::{Alert, ChannelPayload, InventoryData, Severity, ShoeEntry, Snapshot, StoreEntry};
use lib_inventory::sync::{
    ClientSyncAgent, ConnectivityState, DashboardView, SubscriptionEvent, SyncAgentConfig,
};
use project_tests::{MockBackend, ScriptedSource, init_logging};

fn data(store: &str, model: &str, inventory: u32, alerts: Vec<Alert>) -> InventoryData {
    InventoryData::new(
        Snapshot::new(vec![StoreEntry {
            name: store.into(),
            shoes: vec![ShoeEntry {
                model: model.into(),
                inventory,
            }],
        }]),
        alerts,
    )
}

fn low(store: &str, model: &str, inventory: u32, severity: Severity) -> Alert {
    Alert {
        message: format!("Low inventory for {} at {}: {} units", model, store, inventory),
        severity,
    }
}

/// Lets every ready task run; the paused clock only moves once all are idle.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn pulls_once_when_never_connected() {
    init_logging();
    let pulled = data("A", "X", 5, vec![low("A", "X", 5, Severity::Medium)]);
    let backend = MockBackend::new(pulled.clone());
    let source = ScriptedSource::new();

    let agent = ClientSyncAgent::spawn(&source, backend.clone(), SyncAgentConfig::default());
    assert_eq!(source.opened(), vec!["inventory_channel".to_string()]);
    assert_eq!(agent.connectivity(), ConnectivityState::Connecting);

    tokio::time::sleep(Duration::from_millis(9_900)).await;
    assert_eq!(backend.fetch_count(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.fetch_count(), 1);
    assert_eq!(*agent.view(), DashboardView::new(pulled.inventory, &pulled.alerts));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(backend.fetch_count(), 1);
    assert_eq!(backend.trigger_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn confirmed_subscription_disarms_the_timer_and_triggers_ingestion() {
    init_logging();
    let backend = MockBackend::new(InventoryData::empty());
    let source = ScriptedSource::new();
    let agent = ClientSyncAgent::spawn(&source, backend.clone(), SyncAgentConfig::default());

    source.emit(SubscriptionEvent::Connected);
    settle().await;
    assert!(agent.is_connected());
    assert_eq!(backend.trigger_count(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn each_disconnect_pulls_exactly_once() {
    init_logging();
    let backend = MockBackend::new(data("A", "X", 20, vec![]));
    let source = ScriptedSource::new();
    let agent = ClientSyncAgent::spawn(&source, backend.clone(), SyncAgentConfig::default());

    source.emit(SubscriptionEvent::Connected);
    source.emit(SubscriptionEvent::Disconnected);
    settle().await;
    assert_eq!(agent.connectivity(), ConnectivityState::Disconnected);
    assert_eq!(backend.fetch_count(), 1);
    assert_eq!(agent.view().inventory.inventory_of("A", "X"), Some(20));

    source.emit(SubscriptionEvent::Connected);
    settle().await;
    assert!(agent.is_connected());
    assert_eq!(backend.trigger_count(), 2);

    source.emit(SubscriptionEvent::Disconnected);
    settle().await;
    assert_eq!(backend.fetch_count(), 2);

    // The fallback timer was disarmed by the first confirmation.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn error_payload_triggers_a_pull() {
    init_logging();
    let pulled = data("B", "Y", 1, vec![low("B", "Y", 1, Severity::High)]);
    let backend = MockBackend::new(pulled.clone());
    let source = ScriptedSource::new();
    let agent = ClientSyncAgent::spawn(&source, backend.clone(), SyncAgentConfig::default());

    source.emit(SubscriptionEvent::Connected);
    source.emit(SubscriptionEvent::Received(ChannelPayload::Error {
        error: "WebSocket connection error".into(),
    }));
    settle().await;

    assert_eq!(backend.fetch_count(), 1);
    let view = agent.view();
    assert_eq!(view.inventory, pulled.inventory);
    assert_eq!(view.alerts[0].color, "alert-danger");
    assert_eq!(view.alerts[0].icon, "alert-circle");
    assert!(agent.is_connected());
}

#[tokio::test(start_paused = true)]
async fn failed_pull_replaces_the_view_with_empty_data() {
    init_logging();
    let backend = MockBackend::failing();
    let source = ScriptedSource::new();
    let agent = ClientSyncAgent::spawn(&source, backend.clone(), SyncAgentConfig::default());
    let mut views = agent.watch_view();

    source.emit(SubscriptionEvent::Connected);
    source.emit(SubscriptionEvent::Received(ChannelPayload::Update(data(
        "A",
        "X",
        4,
        vec![low("A", "X", 4, Severity::Medium)],
    ))));
    settle().await;
    assert!(!agent.view().inventory.is_empty());
    views.mark_unchanged();

    source.emit(SubscriptionEvent::Disconnected);
    settle().await;

    assert_eq!(backend.fetch_count(), 1);
    assert!(views.has_changed().unwrap());
    assert_eq!(*agent.view(), DashboardView::default());

    // Never retried on its own.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn updates_are_styled_and_replace_the_view_in_order() {
    init_logging();
    let backend = MockBackend::new(InventoryData::empty());
    let source = ScriptedSource::new();
    let agent = ClientSyncAgent::spawn(&source, backend.clone(), SyncAgentConfig::default());

    source.emit(SubscriptionEvent::Connected);
    source.emit(SubscriptionEvent::Received(ChannelPayload::Update(data(
        "A",
        "X",
        5,
        vec![low("A", "X", 5, Severity::Medium)],
    ))));
    source.emit(SubscriptionEvent::Received(ChannelPayload::Update(data(
        "A",
        "X",
        12,
        vec![],
    ))));
    settle().await;

    let view = agent.view();
    assert_eq!(view.inventory.inventory_of("A", "X"), Some(12));
    assert!(view.alerts.is_empty());
    assert_eq!(backend.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn medium_alerts_get_warning_style() {
    init_logging();
    let backend = MockBackend::new(InventoryData::empty());
    let source = ScriptedSource::new();
    let agent = ClientSyncAgent::spawn(&source, backend, SyncAgentConfig::default());

    source.emit(SubscriptionEvent::Received(ChannelPayload::Update(data(
        "A",
        "X",
        5,
        vec![low("A", "X", 5, Severity::Medium)],
    ))));
    settle().await;

    let view = agent.view();
    assert_eq!(view.alerts.len(), 1);
    assert_eq!(view.alerts[0].message, "Low inventory for X at A: 5 units");
    assert_eq!(view.alerts[0].color, "alert-warning");
    assert_eq!(view.alerts[0].icon, "alert-triangle");
    assert_eq!(view.alerts[0].icon_color, "text-warning");
}

#[tokio::test(start_paused = true)]
async fn ended_subscription_stops_the_agent() {
    init_logging();
    let backend = MockBackend::new(InventoryData::empty());
    let source = ScriptedSource::new();
    let agent = ClientSyncAgent::spawn(&source, backend.clone(), SyncAgentConfig::default());

    source.emit(SubscriptionEvent::Connected);
    source.close();
    settle().await;

    assert!(agent.is_finished());
    assert_eq!(agent.connectivity(), ConnectivityState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn custom_fallback_timeout_is_honoured() {
    init_logging();
    let backend = MockBackend::new(InventoryData::empty());
    let source = ScriptedSource::new();
    let config = SyncAgentConfig {
        fallback_timeout: Duration::from_millis(500),
        ..SyncAgentConfig::default()
    };
    let _agent = ClientSyncAgent::spawn(&source, backend.clone(), config);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(backend.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn subscription_ending_unconfirmed_still_pulls_once_the_timer_fires() {
    init_logging();
    let pulled = data("A", "X", 2, vec![low("A", "X", 2, Severity::High)]);
    let backend = MockBackend::new(pulled.clone());
    let source = ScriptedSource::new();
    let agent = ClientSyncAgent::spawn(&source, backend.clone(), SyncAgentConfig::default());

    source.close();
    settle().await;
    assert_eq!(agent.connectivity(), ConnectivityState::Disconnected);
    assert_eq!(backend.fetch_count(), 0);
    assert!(!agent.is_finished());

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(backend.fetch_count(), 1);
    assert_eq!(*agent.view(), DashboardView::new(pulled.inventory, &pulled.alerts));
    assert!(agent.is_finished());
}

#[tokio::test(start_paused = true)]
async fn fallback_window_starts_at_spawn() {
    init_logging();
    let backend = MockBackend::new(data("A", "X", 20, vec![]));
    let source = ScriptedSource::new();
    let _agent = ClientSyncAgent::spawn(&source, backend.clone(), SyncAgentConfig::default());

    // The agent task has not been polled yet when the clock moves.
    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(backend.fetch_count(), 1);
}
