//! # Sync Pipeline
//!
//! The path every accepted reading takes: upsert, aggregate, derive alerts,
//! broadcast. The pull endpoint reads through the same pipeline, so a
//! snapshot yields the same alert list whichever way a consumer obtains it.

use std::sync::Arc;

use crate::core::alerts;
use crate::core::channel::BroadcastChannel;
use crate::core::store::{InventoryStore, StoreError};
use crate::models::{InventoryData, Reading};

pub struct SyncPipeline {
    store: Arc<dyn InventoryStore>,
    channel: Arc<BroadcastChannel>,
}

impl SyncPipeline {
    pub fn new(store: Arc<dyn InventoryStore>, channel: Arc<BroadcastChannel>) -> Self {
        Self { store, channel }
    }

    pub fn channel(&self) -> &Arc<BroadcastChannel> {
        &self.channel
    }

    /// Applies one reading and broadcasts the recomputed snapshot and alerts.
    /// Returns the number of subscribers reached.
    pub async fn apply(&self, reading: &Reading) -> Result<usize, StoreError> {
        self.store.upsert(reading).await?;
        let data = self.current().await?;
        log::debug!(
            "Applied {}/{} = {} ({} alert(s))",
            reading.store,
            reading.model,
            reading.inventory,
            data.alerts.len()
        );
        Ok(self.channel.broadcast(data.inventory, data.alerts))
    }

    /// Current snapshot with its alerts, as served by the pull endpoint.
    pub async fn current(&self) -> Result<InventoryData, StoreError> {
        let snapshot = self.store.aggregate().await?;
        let alerts = alerts::generate(&snapshot);
        Ok(InventoryData::new(snapshot, alerts))
    }

    /// Signals subscribers that the upstream feed is gone for good.
    pub fn signal_error(&self, message: &str) -> usize {
        self.channel.broadcast_error(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryInventoryStore;
    use crate::models::{Alert, ChannelPayload, Severity};

    fn pipeline() -> SyncPipeline {
        SyncPipeline::new(
            Arc::new(MemoryInventoryStore::new()),
            Arc::new(BroadcastChannel::inventory()),
        )
    }

    #[tokio::test]
    async fn scenario_readings_produce_ordered_alerts() {
        let pipeline = pipeline();
        for reading in [
            Reading::new("A", "X", 5),
            Reading::new("A", "Y", 15),
            Reading::new("B", "X", 2),
        ] {
            pipeline.apply(&reading).await.unwrap();
        }

        let data = pipeline.current().await.unwrap();
        assert_eq!(
            serde_json::to_value(&data.inventory).unwrap(),
            serde_json::json!([
                {"name": "A", "shoes": [{"model": "X", "inventory": 5}, {"model": "Y", "inventory": 15}]},
                {"name": "B", "shoes": [{"model": "X", "inventory": 2}]}
            ])
        );
        assert_eq!(
            data.alerts,
            vec![
                Alert {
                    message: "Low inventory for X at A: 5 units".into(),
                    severity: Severity::Medium,
                },
                Alert {
                    message: "Low inventory for X at B: 2 units".into(),
                    severity: Severity::High,
                },
            ]
        );
    }

    #[tokio::test]
    async fn broadcast_matches_pull() {
        let pipeline = pipeline();
        let mut rx = pipeline.channel().subscribe();

        assert_eq!(pipeline.apply(&Reading::new("A", "X", 1)).await.unwrap(), 1);

        let pushed = rx.recv().await.unwrap();
        let pulled = pipeline.current().await.unwrap();
        assert_eq!(*pushed, ChannelPayload::Update(pulled));
    }

    #[tokio::test]
    async fn signal_error_reaches_subscribers() {
        let pipeline = pipeline();
        let mut rx = pipeline.channel().subscribe();
        pipeline.signal_error("WebSocket connection error");
        assert!(rx.recv().await.unwrap().is_error());
    }
}
