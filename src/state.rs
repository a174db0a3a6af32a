//! Shared pipeline state
//!
//! Couples the alert store to the persistence gateway and the event
//! broadcast: every mutating operation (`append_reading`, `acknowledge`,
//! `clear_all`) triggers exactly one downstream persistence request carrying
//! the resulting snapshot. `load_persisted` does not persist, since it is
//! itself sourced from persistence.
//!
//! All mutations go through the `RwLock` on one tokio runtime, so the store
//! itself needs no internal synchronization.

use crate::events::AlertEvent;
use crate::ingest::ConnectionStatus;
use crate::model::{Alert, SensorReading};
use crate::persist::PersistenceGateway;
use crate::storage::StorageError;
use crate::store::{AlertStore, StaleAlertId};
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// State shared between the ingestion controller and the HTTP surface
pub struct SharedState {
    alerts: RwLock<AlertStore>,
    status: RwLock<ConnectionStatus>,
    event_tx: broadcast::Sender<AlertEvent>,
    gateway: PersistenceGateway,
}

impl SharedState {
    pub fn new(gateway: PersistenceGateway) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            alerts: RwLock::new(AlertStore::new()),
            status: RwLock::new(ConnectionStatus::Connecting),
            event_tx,
            gateway,
        }
    }

    /// Current ordered alert sequence, by value
    pub async fn alerts(&self) -> Vec<Alert> {
        self.alerts.read().await.snapshot()
    }

    /// Current connectivity status
    pub async fn status(&self) -> ConnectionStatus {
        self.status.read().await.clone()
    }

    /// Update connectivity status (ingestion controller only)
    pub async fn set_status(&self, status: ConnectionStatus) {
        *self.status.write().await = status.clone();
        self.broadcast(AlertEvent::ConnectionStatusChanged {
            status,
            timestamp: Utc::now(),
        });
    }

    /// Subscribe to the pipeline event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<AlertEvent> {
        self.event_tx.subscribe()
    }

    /// Merge a freshly decoded reading as a new unacknowledged alert
    pub async fn append_reading(&self, reading: SensorReading) {
        let (alert, snapshot) = {
            let mut store = self.alerts.write().await;
            let alert = store.append(reading);
            (alert, store.snapshot())
        };
        self.gateway.persist(snapshot);
        self.broadcast(AlertEvent::AlertAppended {
            alert,
            timestamp: Utc::now(),
        });
    }

    /// Mark one alert as seen
    ///
    /// A stale id is reported to the caller, who treats it as a no-op.
    pub async fn acknowledge(&self, id: Uuid) -> Result<(), StaleAlertId> {
        let snapshot = {
            let mut store = self.alerts.write().await;
            store.acknowledge(id)?;
            store.snapshot()
        };
        self.gateway.persist(snapshot);
        self.broadcast(AlertEvent::AlertAcknowledged {
            alert_id: id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Empty the store and delete the stored snapshot
    ///
    /// Unlike the write path this awaits the storage removal, so the caller
    /// gets a definite completion signal. The in-memory clear is not rolled
    /// back if the removal fails.
    pub async fn clear_all(&self) -> Result<(), StorageError> {
        self.alerts.write().await.clear();
        let result = self.gateway.clear_all().await;
        self.broadcast(AlertEvent::AlertsCleared {
            timestamp: Utc::now(),
        });
        result
    }

    /// Replace the store with reconciled alerts (startup reconciler only)
    ///
    /// Loaded alerts are forced to acknowledged; no persistence request is
    /// issued since the data just came from persistence.
    pub async fn load_persisted(&self, alerts: Vec<Alert>) {
        self.alerts.write().await.load_snapshot(alerts);
    }

    fn broadcast(&self, event: AlertEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }
}
