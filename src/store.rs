//! Alert store
//!
//! In-memory ordered collection of alerts. Pure data structure with no I/O;
//! the persistence coupling (every mutation triggers one snapshot write)
//! lives in [`crate::state::SharedState`].
//!
//! Ordering invariant: unacknowledged alerts sort before acknowledged ones;
//! within each partition alerts sort by `time` descending (most recent
//! first); ties keep insertion order (stable sort).

use crate::model::{Alert, SensorReading};
use thiserror::Error;
use uuid::Uuid;

/// Acknowledgment targeted an alert that no longer exists
///
/// Happens when the list was cleared (or the id was otherwise stale) between
/// the user seeing the alert and the request arriving. Callers treat this as
/// a no-op, never a crash.
#[derive(Debug, Error, PartialEq)]
#[error("no alert with id {0}")]
pub struct StaleAlertId(pub Uuid);

/// Ordered sequence of alerts with merge, sort and acknowledgment operations
#[derive(Debug, Default)]
pub struct AlertStore {
    alerts: Vec<Alert>,
}

impl AlertStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a reading as a new unacknowledged alert and merge it in
    ///
    /// Readings are not deduplicated: every decoded message appends exactly
    /// one alert, even if an identical reading already exists.
    pub fn append(&mut self, reading: SensorReading) -> Alert {
        let alert = Alert::new(reading);
        self.alerts.push(alert.clone());
        self.resort();
        alert
    }

    /// Mark one alert as seen, shifting it into the acknowledged partition
    pub fn acknowledge(&mut self, id: Uuid) -> Result<(), StaleAlertId> {
        let alert = self
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StaleAlertId(id))?;
        alert.acknowledged = true;
        self.resort();
        Ok(())
    }

    /// Replace the sequence wholesale with reconciled alerts
    ///
    /// Every loaded alert is forced to `acknowledged = true` regardless of
    /// its stored flag: alerts that survived a restart are no longer "new".
    /// Used only by the startup reconciler.
    pub fn load_snapshot(&mut self, alerts: Vec<Alert>) {
        self.alerts = alerts;
        for alert in &mut self.alerts {
            alert.acknowledged = true;
        }
        self.resort();
    }

    /// Empty the sequence
    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    /// Current ordered sequence, by value
    ///
    /// Callers must not assume later mutations become visible in the
    /// returned sequence.
    pub fn snapshot(&self) -> Vec<Alert> {
        self.alerts.clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Restore the ordering invariant after a mutation
    ///
    /// `sort_by` is stable, so equal keys keep insertion order.
    fn resort(&mut self) {
        self.alerts.sort_by(|a, b| {
            a.acknowledged
                .cmp(&b.acknowledged)
                .then_with(|| b.reading.time.cmp(&a.reading.time))
        });
    }
}
