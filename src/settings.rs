//! Receiver and sender settings.
//!
//! Settings are read from an optional TOML file and then from environment
//! variables prefixed with `HUBSIG_`, using `__` between nested keys:
//!
//! ```toml
//! [receiver]
//! port = 8080
//! max_body_size = 1048576
//! comparison = "constant_time"
//!
//! [sender]
//! url = "http://127.0.0.1:8080/webhook"
//! ```
//!
//! `HUBSIG_RECEIVER__PORT=9000` overrides the port above.

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::signature::Comparison;

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file was not found
    #[error("Settings file not found: {0}")]
    FileNotFound(String),

    /// The path is not valid UTF-8
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Error parsing or merging configuration sources
    #[error("Failed to load settings: {0}")]
    Config(#[from] ConfigError),
}

/// Settings for the webhook receiver.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReceiverSettings {
    /// Address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub bind_address: String,
    /// Port to listen on
    pub port: u16,
    /// Shared secret the `/webhook` endpoint verifies with
    pub secret: Option<String>,
    /// Largest accepted body in bytes; unbounded when unset
    pub max_body_size: Option<usize>,
    /// How digests are compared
    pub comparison: Comparison,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            secret: None,
            max_body_size: None,
            comparison: Comparison::default(),
        }
    }
}

impl ReceiverSettings {
    /// Get the full bind address (ip:port)
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Settings for delivering signed webhooks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SenderSettings {
    pub url: Option<String>,
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub receiver: ReceiverSettings,
    pub sender: SenderSettings,
}

impl Settings {
    /// Load settings from `path` (if any) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, its path is not valid
    /// UTF-8, or a value cannot be deserialized.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            let path_str = path
                .to_str()
                .ok_or_else(|| SettingsError::InvalidPath(format!("{:?}", path)))?;
            if !path.exists() {
                return Err(SettingsError::FileNotFound(path_str.to_string()));
            }
            builder = builder.add_source(File::with_name(path_str));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("HUBSIG")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
