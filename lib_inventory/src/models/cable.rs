//! # Cable Framing
//!
//! Minimal subscribe/confirm protocol used to carry a broadcast channel over a
//! WebSocket to a remote consumer.
//!
//! ```text
//! client -> {"command":"subscribe","channel":"inventory_channel"}
//! server -> {"type":"confirm_subscription","channel":"inventory_channel"}
//! server -> {"type":"message","channel":"inventory_channel","message":{...}}
//! ```
//!
//! A subscription to an unknown channel is answered with `reject_subscription`.

use serde::{Deserialize, Serialize};

use crate::models::ChannelPayload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CableCommand {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CableFrame {
    ConfirmSubscription { channel: String },
    RejectSubscription { channel: String },
    Message { channel: String, message: ChannelPayload },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_command_wire_format() {
        let cmd = CableCommand::Subscribe {
            channel: "inventory_channel".into(),
        };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            serde_json::json!({"command": "subscribe", "channel": "inventory_channel"})
        );
    }

    #[test]
    fn message_frame_wraps_payload() {
        let frame: CableFrame = serde_json::from_str(
            r#"{"type":"message","channel":"inventory_channel","message":{"error":"gone"}}"#,
        )
        .unwrap();
        assert_eq!(
            frame,
            CableFrame::Message {
                channel: "inventory_channel".into(),
                message: ChannelPayload::Error { error: "gone".into() },
            }
        );
    }
}
