//! OutboundItem - replies and heartbeats travelling back to a source

use serde::{Deserialize, Serialize};

/// Addressing of an outbound item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundKind {
    /// Answer to a specific source item (acknowledgement, reply)
    Reply { to: String },
    /// Broadcast liveness message, no addressee
    Heartbeat,
}

/// Best-effort message sent through a feed's reply mechanism
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundItem {
    #[serde(flatten)]
    pub kind: OutboundKind,
    pub text: String,
}

impl OutboundItem {
    /// Reply addressed to the source item `to`
    pub fn reply(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: OutboundKind::Reply { to: to.into() },
            text: text.into(),
        }
    }

    /// Heartbeat broadcast
    pub fn heartbeat(text: impl Into<String>) -> Self {
        Self {
            kind: OutboundKind::Heartbeat,
            text: text.into(),
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self.kind, OutboundKind::Heartbeat)
    }

    /// Source id this item answers, if it is a reply
    pub fn reply_to(&self) -> Option<&str> {
        match &self.kind {
            OutboundKind::Reply { to } => Some(to),
            OutboundKind::Heartbeat => None,
        }
    }
}
