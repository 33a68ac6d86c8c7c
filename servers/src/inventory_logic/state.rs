use crate::inventory_logic::config::ServerConfig;
use lib_inventory::core::{BroadcastChannel, INVENTORY_CHANNEL, MemoryInventoryStore, SyncPipeline};
use lib_inventory::ingestors::{IngestionClient, IngestionConfig};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Upsert → aggregate → alerts → broadcast; also serves the pull endpoint
    pub pipeline: Arc<SyncPipeline>,
    // The single upstream client; the trigger endpoint starts it
    pub ingestion: Arc<IngestionClient>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let channel = Arc::new(BroadcastChannel::new(INVENTORY_CHANNEL, config.channel_capacity()));
        Self::with_ingestion(channel, config.ingestion_config())
    }

    /// In-memory store feeding `channel`, with one ingestion client.
    pub fn with_ingestion(channel: Arc<BroadcastChannel>, ingestion: IngestionConfig) -> Self {
        let pipeline = Arc::new(SyncPipeline::new(Arc::new(MemoryInventoryStore::new()), channel));
        let ingestion = Arc::new(IngestionClient::new(ingestion, Arc::clone(&pipeline)));
        Self { pipeline, ingestion }
    }

    pub fn channel(&self) -> &Arc<BroadcastChannel> {
        self.pipeline.channel()
    }
}
