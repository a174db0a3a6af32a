//! Persistence gateway
//!
//! Asynchronous bridge between the alert store and durable storage. Every
//! store mutation hands the gateway a full snapshot; the gateway serializes
//! it and writes it under one fixed key from a spawned task, so the mutation
//! path never blocks on storage.
//!
//! Writes carry a monotonically increasing sequence number and a write whose
//! number is below the highest already applied is discarded, so durable
//! state always converges on the last snapshot issued even when tasks
//! complete out of order. Write failures are logged and otherwise ignored;
//! in-memory state stays authoritative for the running session.

use crate::model::Alert;
use crate::storage::{Storage, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The single key the pipeline uses in durable storage
pub const STORAGE_KEY: &str = "sensorDataList";

/// Storage shape of one alert
///
/// Ids are not persisted; fresh ones are generated on load. The
/// `acknowledged` flag is stored but re-derived as `true` on load, so old
/// snapshots without it still parse.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedAlert {
    pub time: DateTime<Utc>,
    pub location: String,
    pub sensor: String,
    pub value: f64,
    #[serde(default)]
    pub acknowledged: bool,
}

impl From<&Alert> for PersistedAlert {
    fn from(alert: &Alert) -> Self {
        Self {
            time: alert.reading.time,
            location: alert.reading.location.clone(),
            sensor: alert.reading.sensor.clone(),
            value: alert.reading.value,
            acknowledged: alert.acknowledged,
        }
    }
}

impl From<PersistedAlert> for Alert {
    fn from(persisted: PersistedAlert) -> Self {
        Alert {
            id: uuid::Uuid::new_v4(),
            reading: crate::model::SensorReading {
                time: persisted.time,
                location: persisted.location,
                sensor: persisted.sensor,
                value: persisted.value,
            },
            acknowledged: persisted.acknowledged,
        }
    }
}

/// Fire-and-forget snapshot writer over the storage capability
#[derive(Clone)]
pub struct PersistenceGateway {
    storage: Arc<dyn Storage>,
    /// Next sequence number to issue
    next_seq: Arc<AtomicU64>,
    /// Highest sequence number whose write (or removal) has been applied
    applied_seq: Arc<Mutex<u64>>,
}

impl PersistenceGateway {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            next_seq: Arc::new(AtomicU64::new(0)),
            applied_seq: Arc::new(Mutex::new(0)),
        }
    }

    /// Write a snapshot under the fixed key without blocking the caller
    ///
    /// Serialization or storage failure is logged at warn and dropped; it
    /// never rolls back the in-memory store.
    pub fn persist(&self, snapshot: Vec<Alert>) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let storage = Arc::clone(&self.storage);
        let applied_seq = Arc::clone(&self.applied_seq);

        tokio::spawn(async move {
            let records: Vec<PersistedAlert> = snapshot.iter().map(PersistedAlert::from).collect();
            let payload = match serde_json::to_string(&records) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!("Failed to serialize alert snapshot: {}", err);
                    return;
                }
            };

            let mut applied = applied_seq.lock().await;
            if seq < *applied {
                debug!("Discarding stale snapshot write (seq {} < {})", seq, *applied);
                return;
            }
            match storage.set(STORAGE_KEY, &payload).await {
                Ok(()) => {
                    *applied = seq;
                    debug!("Persisted {} alert(s) (seq {})", records.len(), seq);
                }
                Err(err) => {
                    warn!("Failed to persist alert snapshot: {}", err);
                }
            }
        });
    }

    /// Delete the stored snapshot, awaited by the caller
    ///
    /// The presentation layer needs a definite completion signal before
    /// clearing its own view, so unlike `persist` this is not fire-and-forget
    /// and the error propagates. The removal takes a sequence number too, so
    /// a stale in-flight write cannot resurrect cleared data.
    pub async fn clear_all(&self) -> Result<(), StorageError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let mut applied = self.applied_seq.lock().await;
        if seq < *applied {
            return Ok(());
        }
        self.storage.remove(STORAGE_KEY).await?;
        *applied = seq;
        Ok(())
    }
}
