//! Event types broadcast to SSE clients

use crate::ingest::ConnectionStatus;
use crate::model::Alert;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert pipeline events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlertEvent {
    /// A decoded reading was merged into the store
    AlertAppended {
        alert: Alert,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An alert was marked as seen
    AlertAcknowledged {
        alert_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The store was emptied
    AlertsCleared {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transport connectivity status changed
    ConnectionStatusChanged {
        status: ConnectionStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl AlertEvent {
    /// Event type string for the SSE `event` field
    pub fn event_type(&self) -> &'static str {
        match self {
            AlertEvent::AlertAppended { .. } => "AlertAppended",
            AlertEvent::AlertAcknowledged { .. } => "AlertAcknowledged",
            AlertEvent::AlertsCleared { .. } => "AlertsCleared",
            AlertEvent::ConnectionStatusChanged { .. } => "ConnectionStatusChanged",
        }
    }
}
