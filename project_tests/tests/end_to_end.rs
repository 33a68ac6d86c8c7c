//! Feed → ingestion → pipeline → channel → agent, in-process and over HTTP.

use std::sync::Arc;
use std::time::Duration;

use lib_inventory::core::{BroadcastChannel, MemoryInventoryStore, SyncPipeline};
use lib_inventory::ingestors::{IngestionClient, IngestionConfig};
use lib_inventory::models::Reading;
use lib_inventory::retrieve::ApiClientOptions;
use lib_inventory::sync::{
    BackendApi, ClientSyncAgent, DashboardView, HttpBackend, RemoteChannel, SyncAgentConfig,
};
use project_tests::{FeedBehavior, PipelineBackend, UpstreamFeed, init_logging, reading_json};
use servers::inventory_logic::{routes, state::AppState};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};

const WITHIN: Duration = Duration::from_secs(5);

fn ingestion_config(feed: &UpstreamFeed, max_attempts: u32) -> IngestionConfig {
    IngestionConfig {
        ws_url: feed.url().to_string(),
        max_attempts,
        retry_delay: Duration::from_millis(20),
        connect_timeout: Duration::from_secs(2),
    }
}

fn scenario_feed() -> FeedBehavior {
    FeedBehavior::Serve {
        messages: vec![
            reading_json("A", "X", 5),
            reading_json("A", "Y", 15),
            reading_json("B", "X", 2),
        ],
        hold_open: true,
    }
}

async fn view_where(
    views: &mut watch::Receiver<Arc<DashboardView>>,
    predicate: impl FnMut(&Arc<DashboardView>) -> bool,
) -> Arc<DashboardView> {
    tokio::time::timeout(WITHIN, views.wait_for(predicate))
        .await
        .expect("view did not converge in time")
        .expect("agent stopped")
        .clone()
}

fn assert_scenario(view: &DashboardView) {
    assert_eq!(
        serde_json::to_value(&view.inventory).unwrap(),
        serde_json::json!([
            {"name": "A", "shoes": [{"model": "X", "inventory": 5}, {"model": "Y", "inventory": 15}]},
            {"name": "B", "shoes": [{"model": "X", "inventory": 2}]}
        ])
    );
    let shown: Vec<(&str, &str)> = view
        .alerts
        .iter()
        .map(|a| (a.message.as_str(), a.color.as_str()))
        .collect();
    assert_eq!(
        shown,
        vec![
            ("Low inventory for X at A: 5 units", "alert-warning"),
            ("Low inventory for X at B: 2 units", "alert-danger"),
        ]
    );
}

#[tokio::test]
async fn in_process_agent_triggers_ingestion_and_tracks_the_feed() {
    init_logging();
    let feed = UpstreamFeed::start(scenario_feed()).await.unwrap();

    let channel = Arc::new(BroadcastChannel::inventory());
    let pipeline = Arc::new(SyncPipeline::new(Arc::new(MemoryInventoryStore::new()), Arc::clone(&channel)));
    let ingestion = Arc::new(IngestionClient::new(ingestion_config(&feed, 2), Arc::clone(&pipeline)));
    let backend = Arc::new(PipelineBackend {
        pipeline: Arc::clone(&pipeline),
        ingestion: Arc::clone(&ingestion),
    });

    // Ingestion is idle until the agent's confirmation triggers it.
    let agent = ClientSyncAgent::spawn(channel.as_ref(), backend.clone(), SyncAgentConfig::default());
    let mut views = agent.watch_view();

    let view = view_where(&mut views, |v| v.inventory.shoes().count() == 3).await;
    assert_scenario(&view);
    assert!(agent.is_connected());
    assert_eq!(feed.accepted(), 1);

    // Push and pull agree.
    let pulled = backend.fetch_inventory().await.unwrap();
    assert_eq!(*view, DashboardView::new(pulled.inventory, &pulled.alerts));

    ingestion.stop();
}

struct Backend {
    url: String,
    state: AppState,
    _shutdown: broadcast::Sender<()>,
}

async fn start_backend(ingestion: IngestionConfig) -> Backend {
    let state = AppState::with_ingestion(Arc::new(BroadcastChannel::inventory()), ingestion);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (shutdown, rx) = broadcast::channel(1);
    tokio::spawn(routes::serve(listener, state.clone(), rx));
    Backend {
        url,
        state,
        _shutdown: shutdown,
    }
}

fn remote_agent(backend: &Backend) -> ClientSyncAgent {
    let http = HttpBackend::new(&backend.url, ApiClientOptions::default()).unwrap();
    let source = RemoteChannel::for_backend(&backend.url, Duration::from_millis(50)).unwrap();
    ClientSyncAgent::spawn(&source, Arc::new(http), SyncAgentConfig::default())
}

#[tokio::test]
async fn remote_agent_follows_the_feed_over_the_cable() {
    init_logging();
    let feed = UpstreamFeed::start(scenario_feed()).await.unwrap();
    let backend = start_backend(ingestion_config(&feed, 2)).await;

    let agent = remote_agent(&backend);
    let mut views = agent.watch_view();

    let view = view_where(&mut views, |v| v.inventory.shoes().count() == 3).await;
    assert_scenario(&view);
    assert!(agent.is_connected());
    assert_eq!(feed.accepted(), 1);

    backend.state.ingestion.stop();
}

#[tokio::test]
async fn remote_agent_pulls_over_http_when_ingestion_gives_up() {
    init_logging();
    let feed = UpstreamFeed::start(FeedBehavior::DropBeforeHandshake).await.unwrap();
    let backend = start_backend(ingestion_config(&feed, 1)).await;
    backend.state.pipeline.apply(&Reading::new("C", "Z", 7)).await.unwrap();

    let agent = remote_agent(&backend);
    let mut views = agent.watch_view();

    // Confirmation triggers ingestion; two failed attempts broadcast the
    // error; the agent answers it with one pull.
    let view = view_where(&mut views, |v| !v.inventory.is_empty()).await;
    assert_eq!(view.inventory.inventory_of("C", "Z"), Some(7));
    assert_eq!(view.alerts.len(), 1);
    assert_eq!(view.alerts[0].message, "Low inventory for Z at C: 7 units");
    assert_eq!(view.alerts[0].icon, "alert-triangle");
    assert_eq!(feed.accepted(), 2);
}
