//! Startup reconciler
//!
//! Runs once, before the ingestion controller attaches to the transport:
//! loads the persisted snapshot into the store and marks every entry as
//! already acknowledged. A missing or corrupt snapshot is equivalent to a
//! first run, never fatal.

use crate::model::Alert;
use crate::persist::{PersistedAlert, STORAGE_KEY};
use crate::state::SharedState;
use crate::storage::Storage;
use tracing::{info, warn};

/// Populate the store from durable storage
///
/// The caller must await this before spawning the ingestion controller, so
/// that a live message arriving early is always appended after the
/// reconciled snapshot, never interleaved before it.
pub async fn load_persisted(state: &SharedState, storage: &dyn Storage) {
    let raw = match storage.get(STORAGE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            info!("No persisted alerts found (first run)");
            return;
        }
        Err(err) => {
            warn!("Failed to read persisted alerts, starting empty: {}", err);
            return;
        }
    };

    match serde_json::from_str::<Vec<PersistedAlert>>(&raw) {
        Ok(records) => {
            let alerts: Vec<Alert> = records.into_iter().map(Alert::from).collect();
            info!("Reconciled {} persisted alert(s)", alerts.len());
            state.load_persisted(alerts).await;
        }
        Err(err) => {
            warn!("Persisted alert snapshot is corrupt, starting empty: {}", err);
        }
    }
}
