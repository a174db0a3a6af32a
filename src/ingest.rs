//! Ingestion controller
//!
//! Drives decoder → store → persistence on each inbound message and tracks
//! the transport lifecycle:
//!
//! Disconnected → (connect) SubscribePending → (subscribe ok) Active, or
//! (subscribe err) SubscribeFailed; any phase returns to Disconnected on a
//! transport error or disconnect. There is no retry here: the transport
//! adapter reconnects on its own and re-delivers `Connected`, which
//! re-enters SubscribePending.
//!
//! The controller exclusively owns its session and notification receiver,
//! so once `run` returns (shutdown) no further store mutations can happen.

use crate::decoder::decode_reading;
use crate::state::SharedState;
use crate::transport::{Qos, Session, TransportEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Connectivity status surfaced to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Waiting for the transport to connect or for the subscription ack
    Connecting,
    /// Subscribed and ingesting
    Subscribed,
    /// Subscription rejected or connection lost
    Error { message: String },
}

/// Transport lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Disconnected,
    SubscribePending,
    Active,
    SubscribeFailed,
}

/// Subscribes to transport notifications and feeds decoded readings into
/// the shared state
pub struct IngestionController {
    session: Box<dyn Session>,
    notifications: mpsc::Receiver<TransportEvent>,
    topic: String,
    qos: Qos,
    state: Arc<SharedState>,
    phase: Phase,
}

impl IngestionController {
    pub fn new(
        session: Box<dyn Session>,
        notifications: mpsc::Receiver<TransportEvent>,
        topic: String,
        qos: Qos,
        state: Arc<SharedState>,
    ) -> Self {
        Self {
            session,
            notifications,
            topic,
            qos,
            state,
            phase: Phase::Disconnected,
        }
    }

    /// Consume transport notifications until shutdown fires
    ///
    /// On shutdown the session is ended and the notification receiver
    /// dropped; any persistence task already in flight completes or fails
    /// on its own.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Ingestion controller shutting down");
                    self.session.end().await;
                    return;
                }
                notification = self.notifications.recv() => {
                    match notification {
                        Some(event) => self.handle(event).await,
                        None => {
                            warn!("Transport notification channel closed");
                            self.state
                                .set_status(ConnectionStatus::Error {
                                    message: "transport closed".to_string(),
                                })
                                .await;
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn handle(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                self.phase = Phase::SubscribePending;
                self.state.set_status(ConnectionStatus::Connecting).await;

                match self.session.subscribe(&self.topic, self.qos).await {
                    Ok(()) => {
                        info!("Subscribed to topic {:?}", self.topic);
                        self.phase = Phase::Active;
                        self.state.set_status(ConnectionStatus::Subscribed).await;
                    }
                    Err(err) => {
                        // Terminal for this connection attempt; the
                        // transport's next reconnect starts a fresh one
                        warn!("Subscription failed: {}", err);
                        self.phase = Phase::SubscribeFailed;
                        self.state
                            .set_status(ConnectionStatus::Error {
                                message: err.to_string(),
                            })
                            .await;
                    }
                }
            }
            TransportEvent::Message { topic, payload } => {
                if self.phase != Phase::Active || topic != self.topic {
                    debug!("Ignoring message on topic {:?}", topic);
                    return;
                }
                match decode_reading(&payload) {
                    Ok(reading) => self.state.append_reading(reading).await,
                    Err(err) => warn!("Dropping undecodable message: {}", err),
                }
            }
            TransportEvent::Error(message) => {
                warn!("Transport error: {}", message);
                self.phase = Phase::Disconnected;
                self.state
                    .set_status(ConnectionStatus::Error { message })
                    .await;
            }
            TransportEvent::Disconnected => {
                warn!("Transport disconnected");
                self.phase = Phase::Disconnected;
                self.state
                    .set_status(ConnectionStatus::Error {
                        message: "connection lost".to_string(),
                    })
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::PersistenceGateway;
    use crate::storage::MemoryStorage;
    use crate::transport::SubscribeError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeSession {
        subscribe_ok: bool,
        subscribes: Arc<AtomicUsize>,
        ended: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Session for FakeSession {
        async fn subscribe(&self, topic: &str, _qos: Qos) -> Result<(), SubscribeError> {
            self.subscribes.fetch_add(1, Ordering::SeqCst);
            if self.subscribe_ok {
                Ok(())
            } else {
                Err(SubscribeError {
                    topic: topic.to_string(),
                    message: "broker refused".to_string(),
                })
            }
        }

        async fn end(&self) {
            self.ended.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        state: Arc<SharedState>,
        tx: mpsc::Sender<TransportEvent>,
        shutdown: oneshot::Sender<()>,
        subscribes: Arc<AtomicUsize>,
        ended: Arc<AtomicUsize>,
        task: tokio::task::JoinHandle<()>,
    }

    fn spawn_controller(subscribe_ok: bool) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let state = Arc::new(SharedState::new(PersistenceGateway::new(storage)));
        let (tx, rx) = mpsc::channel(16);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let subscribes = Arc::new(AtomicUsize::new(0));
        let ended = Arc::new(AtomicUsize::new(0));

        let controller = IngestionController::new(
            Box::new(FakeSession {
                subscribe_ok,
                subscribes: subscribes.clone(),
                ended: ended.clone(),
            }),
            rx,
            "alertapp/test".to_string(),
            Qos::AtLeastOnce,
            state.clone(),
        );
        let task = tokio::spawn(controller.run(shutdown_rx));

        Harness {
            state,
            tx,
            shutdown,
            subscribes,
            ended,
            task,
        }
    }

    async fn wait_for_status(state: &SharedState, expected: &ConnectionStatus) {
        for _ in 0..100 {
            if state.status().await == *expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "status never became {:?}, last was {:?}",
            expected,
            state.status().await
        );
    }

    async fn wait_for_alert_count(state: &SharedState, expected: usize) {
        for _ in 0..100 {
            if state.alerts().await.len() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("store never reached {} alert(s)", expected);
    }

    #[tokio::test]
    async fn connect_then_subscribe_reaches_active() {
        let h = spawn_controller(true);

        h.tx.send(TransportEvent::Connected).await.unwrap();
        wait_for_status(&h.state, &ConnectionStatus::Subscribed).await;
        assert_eq!(h.subscribes.load(Ordering::SeqCst), 1);

        h.shutdown.send(()).unwrap();
        h.task.await.unwrap();
        assert_eq!(h.ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribe_failure_surfaces_error_without_retry() {
        let h = spawn_controller(false);

        h.tx.send(TransportEvent::Connected).await.unwrap();
        wait_for_status(
            &h.state,
            &ConnectionStatus::Error {
                message: "subscribe to \"alertapp/test\" failed: broker refused".to_string(),
            },
        )
        .await;

        // No internal retry happens
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.subscribes.load(Ordering::SeqCst), 1);

        h.shutdown.send(()).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn active_messages_are_decoded_and_appended() {
        let h = spawn_controller(true);
        h.tx.send(TransportEvent::Connected).await.unwrap();
        wait_for_status(&h.state, &ConnectionStatus::Subscribed).await;

        h.tx.send(TransportEvent::Message {
            topic: "alertapp/test".to_string(),
            payload: br#"{"time":"2024-01-01T10:00:00Z","location":"greenhouse-1","sensor":"temp-01","value":23.5}"#.to_vec(),
        })
        .await
        .unwrap();

        wait_for_alert_count(&h.state, 1).await;
        assert_eq!(h.state.alerts().await[0].reading.value, 23.5);

        h.shutdown.send(()).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn foreign_topics_and_bad_payloads_are_dropped() {
        let h = spawn_controller(true);
        h.tx.send(TransportEvent::Connected).await.unwrap();
        wait_for_status(&h.state, &ConnectionStatus::Subscribed).await;

        h.tx.send(TransportEvent::Message {
            topic: "sensores/temperatura".to_string(),
            payload: br#"{"time":"2024-01-01T10:00:00Z","location":"a","sensor":"b","value":1.0}"#
                .to_vec(),
        })
        .await
        .unwrap();
        h.tx.send(TransportEvent::Message {
            topic: "alertapp/test".to_string(),
            payload: b"not json".to_vec(),
        })
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.state.alerts().await.is_empty());

        h.shutdown.send(()).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn disconnect_surfaces_error_and_reconnect_resubscribes() {
        let h = spawn_controller(true);
        h.tx.send(TransportEvent::Connected).await.unwrap();
        wait_for_status(&h.state, &ConnectionStatus::Subscribed).await;

        h.tx.send(TransportEvent::Disconnected).await.unwrap();
        wait_for_status(
            &h.state,
            &ConnectionStatus::Error {
                message: "connection lost".to_string(),
            },
        )
        .await;

        // While disconnected, messages are not ingested
        h.tx.send(TransportEvent::Message {
            topic: "alertapp/test".to_string(),
            payload: br#"{"time":"2024-01-01T10:00:00Z","location":"a","sensor":"b","value":1.0}"#
                .to_vec(),
        })
        .await
        .unwrap();

        // External reconnect re-enters the subscribe path
        h.tx.send(TransportEvent::Connected).await.unwrap();
        wait_for_status(&h.state, &ConnectionStatus::Subscribed).await;
        assert_eq!(h.subscribes.load(Ordering::SeqCst), 2);
        assert!(h.state.alerts().await.is_empty());

        h.shutdown.send(()).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_stops_ingestion() {
        let h = spawn_controller(true);
        h.tx.send(TransportEvent::Connected).await.unwrap();
        wait_for_status(&h.state, &ConnectionStatus::Subscribed).await;

        h.shutdown.send(()).unwrap();
        h.task.await.unwrap();
        assert_eq!(h.ended.load(Ordering::SeqCst), 1);

        // Notifications sent after teardown go nowhere
        let send_result = h
            .tx
            .send(TransportEvent::Message {
                topic: "alertapp/test".to_string(),
                payload: br#"{"time":"2024-01-01T10:00:00Z","location":"a","sensor":"b","value":1.0}"#.to_vec(),
            })
            .await;
        assert!(send_result.is_err());
        assert!(h.state.alerts().await.is_empty());
    }
}
