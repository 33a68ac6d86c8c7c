//! # Alerts
//!
//! Low-inventory warnings. The producer only ever emits `high` and `medium`;
//! the `info` variant exists so a consumer receiving a severity it does not
//! know still decodes the payload and falls back to the default styling.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Info,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub message: String,
    pub severity: Severity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_round_trips_known_values() {
        let alert: Alert =
            serde_json::from_str(r#"{"message":"m","severity":"high"}"#).unwrap();
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(
            serde_json::to_string(&Severity::Medium).unwrap(),
            r#""medium""#
        );
    }

    #[test]
    fn unknown_severity_falls_back_to_info() {
        let alert: Alert =
            serde_json::from_str(r#"{"message":"m","severity":"critical"}"#).unwrap();
        assert_eq!(alert.severity, Severity::Info);
    }
}
