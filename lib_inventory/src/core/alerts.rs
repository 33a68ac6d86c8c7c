//! # Alert Engine
//!
//! Pure derivation of low-inventory alerts from a snapshot. Existence and
//! severity depend on the count alone; output order follows the snapshot.

use crate::models::{Alert, Severity, Snapshot};

/// Counts at or above this produce no alert.
pub const LOW_INVENTORY_THRESHOLD: u32 = 10;
/// Counts below this are `high` severity, the rest `medium`.
pub const HIGH_SEVERITY_THRESHOLD: u32 = 3;

pub fn generate(snapshot: &Snapshot) -> Vec<Alert> {
    snapshot
        .shoes()
        .filter(|(_, shoe)| shoe.inventory < LOW_INVENTORY_THRESHOLD)
        .map(|(store, shoe)| Alert {
            message: format!(
                "Low inventory for {} at {}: {} units",
                shoe.model, store.name, shoe.inventory
            ),
            severity: severity_for(shoe.inventory),
        })
        .collect()
}

fn severity_for(inventory: u32) -> Severity {
    if inventory < HIGH_SEVERITY_THRESHOLD {
        Severity::High
    } else {
        Severity::Medium
    }
}
