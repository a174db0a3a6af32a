//! End-to-end pipeline tests
//!
//! Drives the full ingestion path (reconcile, connect, subscribe, decode,
//! merge, persist) against an in-memory storage backend and a fake
//! transport session.

use async_trait::async_trait;
use greenhouse_alerts::ingest::{ConnectionStatus, IngestionController};
use greenhouse_alerts::persist::{PersistenceGateway, STORAGE_KEY};
use greenhouse_alerts::reconcile;
use greenhouse_alerts::state::SharedState;
use greenhouse_alerts::storage::{MemoryStorage, Storage};
use greenhouse_alerts::transport::{Qos, Session, SubscribeError, TransportEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

const TOPIC: &str = "alertapp/test";

struct FakeSession;

#[async_trait]
impl Session for FakeSession {
    async fn subscribe(&self, _topic: &str, _qos: Qos) -> Result<(), SubscribeError> {
        Ok(())
    }

    async fn end(&self) {}
}

struct Pipeline {
    state: Arc<SharedState>,
    storage: Arc<MemoryStorage>,
    tx: mpsc::Sender<TransportEvent>,
    shutdown: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

/// Start the pipeline the way main does: reconcile first, then ingest
async fn start_pipeline(storage: Arc<MemoryStorage>) -> Pipeline {
    let gateway = PersistenceGateway::new(storage.clone() as Arc<dyn Storage>);
    let state = Arc::new(SharedState::new(gateway));

    reconcile::load_persisted(&state, storage.as_ref()).await;

    let (tx, rx) = mpsc::channel(16);
    let (shutdown, shutdown_rx) = oneshot::channel();
    let controller = IngestionController::new(
        Box::new(FakeSession),
        rx,
        TOPIC.to_string(),
        Qos::AtLeastOnce,
        state.clone(),
    );
    let task = tokio::spawn(controller.run(shutdown_rx));

    Pipeline {
        state,
        storage,
        tx,
        shutdown,
        task,
    }
}

impl Pipeline {
    async fn connect(&self) {
        self.tx.send(TransportEvent::Connected).await.unwrap();
        self.wait_for_subscribed().await;
    }

    async fn deliver(&self, time: &str, value: f64) {
        self.tx
            .send(TransportEvent::Message {
                topic: TOPIC.to_string(),
                payload: payload(time, value),
            })
            .await
            .unwrap();
    }

    async fn wait_for_subscribed(&self) {
        for _ in 0..200 {
            if self.state.status().await == ConnectionStatus::Subscribed {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("controller never reached Subscribed");
    }

    async fn wait_for_alert_count(&self, expected: usize) {
        for _ in 0..200 {
            if self.state.alerts().await.len() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("store never reached {} alert(s)", expected);
    }

    /// Wait until the stored snapshot contains `needle`
    async fn wait_for_persisted(&self, needle: &str) {
        for _ in 0..200 {
            if let Some(value) = self.storage.get(STORAGE_KEY).await.unwrap() {
                if value.contains(needle) {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("persisted snapshot never contained {:?}", needle);
    }

    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        self.task.await.unwrap();
    }
}

fn payload(time: &str, value: f64) -> Vec<u8> {
    format!(
        r#"{{"time":"{}","location":"greenhouse-1","sensor":"temp-01","value":{}}}"#,
        time, value
    )
    .into_bytes()
}

#[tokio::test]
async fn reconciled_alerts_merge_with_live_messages() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set(
            STORAGE_KEY,
            r#"[{"time":"2024-01-01T08:00:00Z","location":"greenhouse-1","sensor":"temp-01","value":18.0,"acknowledged":false},
                {"time":"2024-01-01T09:00:00Z","location":"greenhouse-1","sensor":"temp-01","value":20.0,"acknowledged":true}]"#,
        )
        .await
        .unwrap();

    let p = start_pipeline(storage).await;

    // Two reconciled alerts, both forced to acknowledged
    let alerts = p.state.alerts().await;
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.acknowledged));

    p.connect().await;

    // One live message arrives: final store has three alerts, the new one
    // unacknowledged and sorted first despite its older timestamp
    p.deliver("2024-01-01T07:00:00Z", 35.0).await;
    p.wait_for_alert_count(3).await;

    let alerts = p.state.alerts().await;
    assert!(!alerts[0].acknowledged);
    assert_eq!(alerts[0].reading.value, 35.0);
    assert!(alerts[1].acknowledged);
    assert!(alerts[2].acknowledged);
    // Acknowledged partition stays time-descending
    assert_eq!(alerts[1].reading.value, 20.0);
    assert_eq!(alerts[2].reading.value, 18.0);

    p.stop().await;
}

#[tokio::test]
async fn live_alerts_survive_a_restart_as_acknowledged() {
    let storage = Arc::new(MemoryStorage::new());

    // First session: ingest two live readings
    let p = start_pipeline(storage.clone()).await;
    p.connect().await;
    p.deliver("2024-01-01T09:00:00Z", 21.0).await;
    p.deliver("2024-01-01T10:00:00Z", 24.0).await;
    p.wait_for_alert_count(2).await;

    // Wait for the two-record snapshot write to land before "restarting"
    p.wait_for_persisted("24").await;
    p.wait_for_persisted("21").await;
    p.stop().await;

    // Second session over the same storage: both alerts come back seen
    let p2 = start_pipeline(storage).await;
    let alerts = p2.state.alerts().await;
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.acknowledged));
    assert_eq!(alerts[0].reading.value, 24.0);

    p2.stop().await;
}

#[tokio::test]
async fn acknowledgment_flow_reorders_and_persists() {
    let storage = Arc::new(MemoryStorage::new());
    let p = start_pipeline(storage).await;
    p.connect().await;

    // Append readings at 09:00 then 10:00: order is [10:00, 09:00]
    p.deliver("2024-01-01T09:00:00Z", 21.0).await;
    p.deliver("2024-01-01T10:00:00Z", 24.0).await;
    p.wait_for_alert_count(2).await;

    let alerts = p.state.alerts().await;
    assert_eq!(alerts[0].reading.value, 24.0);
    assert_eq!(alerts[1].reading.value, 21.0);

    // Acknowledge the 10:00 entry: order becomes [09:00 unacked, 10:00 acked]
    p.state.acknowledge(alerts[0].id).await.unwrap();
    let alerts = p.state.alerts().await;
    assert_eq!(alerts[0].reading.value, 21.0);
    assert!(!alerts[0].acknowledged);
    assert_eq!(alerts[1].reading.value, 24.0);
    assert!(alerts[1].acknowledged);

    p.wait_for_persisted("\"acknowledged\":true").await;
    p.stop().await;
}

#[tokio::test]
async fn clear_all_wipes_memory_and_storage() {
    let storage = Arc::new(MemoryStorage::new());
    let p = start_pipeline(storage.clone()).await;
    p.connect().await;

    p.deliver("2024-01-01T09:00:00Z", 21.0).await;
    p.wait_for_alert_count(1).await;
    p.wait_for_persisted("21").await;

    p.state.clear_all().await.unwrap();
    assert!(p.state.alerts().await.is_empty());
    assert_eq!(storage.get(STORAGE_KEY).await.unwrap(), None);

    p.stop().await;
}
