//! MQTT transport adapter over rumqttc
//!
//! Owns the broker connection and maps rumqttc's event loop onto the
//! pipeline's [`TransportEvent`] notifications. Reconnection is this
//! adapter's responsibility: rumqttc reconnects on the next poll after a
//! connection error, which re-delivers `Connected` and lets the ingestion
//! controller re-subscribe.

use super::{Qos, Session, SubscribeError, TransportEvent};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Pause between reconnect attempts after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Notification channel depth; the controller drains continuously
const NOTIFICATION_BUFFER: usize = 256;

/// Broker connection settings
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
}

/// MQTT-backed [`Session`]
pub struct MqttSession {
    client: AsyncClient,
}

/// Connect to the broker and start delivering transport notifications
///
/// Returns the session handle and the notification receiver. The spawned
/// event loop task exits when the receiver is dropped.
pub fn connect(config: &MqttConfig) -> (MqttSession, mpsc::Receiver<TransportEvent>) {
    let mut options = MqttOptions::new(
        config.client_id.clone(),
        config.host.clone(),
        config.port,
    );
    options.set_keep_alive(Duration::from_secs(30));

    let (client, mut event_loop) = AsyncClient::new(options, 64);
    let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);

    tokio::spawn(async move {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    if tx.send(TransportEvent::Connected).await.is_err() {
                        break;
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    let notification = TransportEvent::Message {
                        topic: publish.topic.clone(),
                        payload: publish.payload.to_vec(),
                    };
                    if tx.send(notification).await.is_err() {
                        break;
                    }
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    if tx.send(TransportEvent::Disconnected).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("MQTT connection error: {}", err);
                    if tx.send(TransportEvent::Error(err.to_string())).await.is_err() {
                        break;
                    }
                    // Polling again triggers rumqttc's reconnect; pace it
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
        debug!("MQTT event loop task exiting");
    });

    (MqttSession { client }, rx)
}

fn map_qos(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
        Qos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

#[async_trait]
impl Session for MqttSession {
    async fn subscribe(&self, topic: &str, qos: Qos) -> Result<(), SubscribeError> {
        self.client
            .subscribe(topic, map_qos(qos))
            .await
            .map_err(|err| SubscribeError {
                topic: topic.to_string(),
                message: err.to_string(),
            })
    }

    async fn end(&self) {
        if let Err(err) = self.client.disconnect().await {
            debug!("MQTT disconnect during teardown failed: {}", err);
        }
    }
}
