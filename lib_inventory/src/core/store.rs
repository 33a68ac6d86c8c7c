//! # Aggregation Store
//!
//! Folds readings into per-store, per-model counts and hands out full
//! snapshots. The storage itself is an external collaborator, so the pipeline
//! only sees the [`InventoryStore`] trait. [`MemoryInventoryStore`] is the
//! implementation shipped with the crate.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{Reading, ShoeEntry, Snapshot, StoreEntry};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("inventory storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Locates or creates the store and model (keeping first-seen order) and
    /// overwrites the model's count with `reading.inventory`.
    async fn upsert(&self, reading: &Reading) -> Result<(), StoreError>;

    /// Full current snapshot in insertion order. Never mutates.
    async fn aggregate(&self) -> Result<Snapshot, StoreError>;
}

/// In-process store. Writes take the lock exclusively, so a snapshot never
/// observes half of an upsert.
#[derive(Debug, Default)]
pub struct MemoryInventoryStore {
    stores: RwLock<Vec<StoreEntry>>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn upsert(&self, reading: &Reading) -> Result<(), StoreError> {
        let mut stores = self.stores.write().await;

        let store_idx = match stores.iter().position(|s| s.name == reading.store) {
            Some(idx) => idx,
            None => {
                log::debug!("New store '{}'", reading.store);
                stores.push(StoreEntry::new(reading.store.clone()));
                stores.len() - 1
            }
        };
        let store = &mut stores[store_idx];

        match store.shoes.iter_mut().find(|s| s.model == reading.model) {
            Some(shoe) => shoe.inventory = reading.inventory,
            None => store.shoes.push(ShoeEntry {
                model: reading.model.clone(),
                inventory: reading.inventory,
            }),
        }
        Ok(())
    }

    async fn aggregate(&self) -> Result<Snapshot, StoreError> {
        Ok(Snapshot::new(self.stores.read().await.clone()))
    }
}
