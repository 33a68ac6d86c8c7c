//! # Snapshot
//!
//! Point-in-time view of every store and its per-model counts. Stores appear
//! in the order they were first seen and, within a store, models do too.
//! Serialized as a bare JSON array so it matches the `inventory` field of the
//! channel payload and the pull endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoeEntry {
    pub model: String,
    pub inventory: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub name: String,
    pub shoes: Vec<ShoeEntry>,
}

impl StoreEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shoes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Vec<StoreEntry>);

impl Snapshot {
    pub fn new(stores: Vec<StoreEntry>) -> Self {
        Self(stores)
    }

    pub fn stores(&self) -> &[StoreEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(store, shoe)` pairs in snapshot order.
    pub fn shoes(&self) -> impl Iterator<Item = (&StoreEntry, &ShoeEntry)> {
        self.0
            .iter()
            .flat_map(|store| store.shoes.iter().map(move |shoe| (store, shoe)))
    }

    /// Looks up the count for one (store, model) pair.
    pub fn inventory_of(&self, store: &str, model: &str) -> Option<u32> {
        self.0
            .iter()
            .find(|s| s.name == store)?
            .shoes
            .iter()
            .find(|s| s.model == model)
            .map(|s| s.inventory)
    }
}
