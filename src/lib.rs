//! # Greenhouse Alerts Library
//!
//! Core ingestion pipeline for the greenhouse alert monitor:
//! - Sensor reading decoding and validation
//! - In-memory ordered alert store with acknowledgment state
//! - Asynchronous snapshot persistence to local storage
//! - MQTT ingestion controller and startup reconciliation
//! - HTTP/SSE surface for the alert display

pub mod api;
pub mod config;
pub mod decoder;
pub mod error;
pub mod events;
pub mod ingest;
pub mod model;
pub mod persist;
pub mod reconcile;
pub mod state;
pub mod storage;
pub mod store;
pub mod transport;

pub use error::{Error, Result};
pub use model::{Alert, SensorReading};
