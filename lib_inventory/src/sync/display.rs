//! Consumer-side presentation of alerts. Kept out of the alert engine so the
//! producer stays transport- and UI-agnostic.

use serde::{Deserialize, Serialize};

use crate::models::{Alert, Severity, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayAlert {
    pub message: String,
    pub severity: Severity,
    pub color: String,
    pub icon: String,
    pub icon_color: String,
}

/// What the dashboard renders: the snapshot plus styled alerts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardView {
    pub inventory: Snapshot,
    pub alerts: Vec<DisplayAlert>,
}

impl DashboardView {
    pub fn new(inventory: Snapshot, alerts: &[Alert]) -> Self {
        Self {
            inventory,
            alerts: present_alerts(alerts),
        }
    }
}

/// `(class, icon, icon color)` for a severity.
pub fn style_for(severity: Severity) -> (&'static str, &'static str, &'static str) {
    match severity {
        Severity::High => ("alert-danger", "alert-circle", "text-danger"),
        Severity::Medium => ("alert-warning", "alert-triangle", "text-warning"),
        Severity::Info => ("alert-info", "info", "text-info"),
    }
}

pub fn present_alerts(alerts: &[Alert]) -> Vec<DisplayAlert> {
    alerts
        .iter()
        .map(|alert| {
            let (color, icon, icon_color) = style_for(alert.severity);
            DisplayAlert {
                message: alert.message.clone(),
                severity: alert.severity,
                color: color.to_string(),
                icon: icon.to_string(),
                icon_color: icon_color.to_string(),
            }
        })
        .collect()
}
