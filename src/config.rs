//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line arguments
//! 2. Environment variables (via clap's `env` attribute)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! The TOML file is looked up at `--config`, else at the OS config
//! directory (`<config-dir>/greenhouse-alerts/config.toml`).

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default broker matches the public HiveMQ endpoint the sensors publish to
const DEFAULT_BROKER_HOST: &str = "broker.hivemq.com";
const DEFAULT_BROKER_PORT: u16 = 1883;
const DEFAULT_TOPIC: &str = "alertapp/test";
const DEFAULT_HTTP_PORT: u16 = 5731;

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// MQTT broker host
    pub broker_host: String,
    /// MQTT broker port
    pub broker_port: u16,
    /// Client identifier presented to the broker
    pub client_id: String,
    /// The single topic the pipeline subscribes to
    pub topic: String,
    /// Requested QoS level (0, 1 or 2)
    pub qos: u8,
    /// SQLite database holding the persisted snapshot
    pub database_path: PathBuf,
    /// HTTP port for the presentation-facing surface
    pub http_port: u16,
    /// Log level directive (tracing EnvFilter syntax)
    pub log_level: String,
}

/// Optional overrides, typically parsed from the command line
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub broker_host: Option<String>,
    pub broker_port: Option<u16>,
    pub client_id: Option<String>,
    pub topic: Option<String>,
    pub qos: Option<u8>,
    pub database_path: Option<PathBuf>,
    pub http_port: Option<u16>,
    pub log_level: Option<String>,
}

/// TOML file shape; every field optional
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    broker_host: Option<String>,
    #[serde(default)]
    broker_port: Option<u16>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    qos: Option<u8>,
    #[serde(default)]
    database_path: Option<PathBuf>,
    #[serde(default)]
    http_port: Option<u16>,
    #[serde(default)]
    log_level: Option<String>,
}

impl Config {
    /// Resolve the effective configuration from overrides, file and defaults
    pub fn resolve(overrides: &Overrides) -> Result<Config> {
        let file = load_toml_config(overrides.config_file.as_deref())?;

        let config = Config {
            broker_host: overrides
                .broker_host
                .clone()
                .or(file.broker_host)
                .unwrap_or_else(|| DEFAULT_BROKER_HOST.to_string()),
            broker_port: overrides
                .broker_port
                .or(file.broker_port)
                .unwrap_or(DEFAULT_BROKER_PORT),
            client_id: overrides
                .client_id
                .clone()
                .or(file.client_id)
                .unwrap_or_else(|| format!("greenhouse-alerts-{}", std::process::id())),
            topic: overrides
                .topic
                .clone()
                .or(file.topic)
                .unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
            qos: overrides.qos.or(file.qos).unwrap_or(1),
            database_path: overrides
                .database_path
                .clone()
                .or(file.database_path)
                .unwrap_or_else(default_database_path),
            http_port: overrides
                .http_port
                .or(file.http_port)
                .unwrap_or(DEFAULT_HTTP_PORT),
            log_level: overrides
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or_else(|| "info".to_string()),
        };

        if config.qos > 2 {
            return Err(Error::Config(format!(
                "qos must be 0, 1 or 2 (got {})",
                config.qos
            )));
        }
        if config.topic.is_empty() {
            return Err(Error::Config("topic must not be empty".to_string()));
        }

        Ok(config)
    }
}

fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => {
            let Some(default) = default_config_path() else {
                return Ok(TomlConfig::default());
            };
            if !default.exists() {
                return Ok(TomlConfig::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content)
        .map_err(|err| Error::Config(format!("Invalid config file {}: {}", path.display(), err)))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("greenhouse-alerts").join("config.toml"))
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("greenhouse-alerts").join("alerts.db"))
        .unwrap_or_else(|| PathBuf::from("./greenhouse-alerts.db"))
}
