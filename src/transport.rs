//! Pub/sub transport capability boundary
//!
//! The connection layer (connect, resubscribe, retry) is an external
//! collaborator. The pipeline consumes it as a [`Session`] it owns plus a
//! stream of [`TransportEvent`] notifications; the concrete MQTT adapter
//! lives in [`mqtt`].

use async_trait::async_trait;
use thiserror::Error;

pub mod mqtt;

/// Delivery guarantee requested at subscribe time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl TryFrom<u8> for Qos {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(Qos::AtMostOnce),
            1 => Ok(Qos::AtLeastOnce),
            2 => Ok(Qos::ExactlyOnce),
            other => Err(other),
        }
    }
}

/// The transport rejected a subscription request
#[derive(Debug, Error)]
#[error("subscribe to {topic:?} failed: {message}")]
pub struct SubscribeError {
    pub topic: String,
    pub message: String,
}

/// Lifecycle notifications delivered by the transport
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Connection (re)established; subscriptions must be (re)issued
    Connected,
    /// Inbound message on some topic
    Message { topic: String, payload: Vec<u8> },
    /// Connection-level failure; the transport retries on its own
    Error(String),
    /// Connection closed by the peer
    Disconnected,
}

/// An established pub/sub session, explicitly owned by its consumer
///
/// The ingestion controller holds exactly one session and scopes its
/// lifecycle (subscribe on connect, end on teardown) to its own.
#[async_trait]
pub trait Session: Send + Sync {
    /// Subscribe to one topic; resolving Ok is the subscribe acknowledgment
    async fn subscribe(&self, topic: &str, qos: Qos) -> Result<(), SubscribeError>;

    /// Tear the session down; never fails from the caller's view
    async fn end(&self);
}
