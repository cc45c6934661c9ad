//! Bridge configuration
//!
//! Loaded from a TOML file; every key is optional:
//!
//! ```toml
//! serial_path = "/dev/ttyUSB0"
//! baudrate = 115200
//! channel_id = 123456
//! write_key = "XXXXXXXXXXXXXXXX"
//! endpoint = "https://api.thingspeak.com/update"
//! trace = false
//! poll_interval_secs = 60
//! day_boundary = "local"   # or "utc", or "+02:00"
//! ```
//!
//! Command-line flags override file values.

use crate::constants::{DEFAULT_BAUDRATE, DEFAULT_SERIAL_PATH, DEFAULT_THINGSPEAK_ENDPOINT};
use crate::error::RavenError;
use crate::raven::serial::SerialConfig;
use crate::raven::tracker::DayBoundary;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A channel write key. Wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct WriteKey(String);

impl WriteKey {
    pub fn new(key: impl Into<String>) -> Self {
        WriteKey(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WriteKey(***)")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub serial_path: String,
    pub baudrate: u32,
    pub channel_id: Option<u64>,
    pub write_key: Option<WriteKey>,
    pub endpoint: String,
    /// Log diagnostic readings at info instead of debug.
    pub trace: bool,
    pub poll_interval_secs: Option<u64>,
    pub day_boundary: DayBoundary,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            serial_path: DEFAULT_SERIAL_PATH.to_string(),
            baudrate: DEFAULT_BAUDRATE,
            channel_id: None,
            write_key: None,
            endpoint: DEFAULT_THINGSPEAK_ENDPOINT.to_string(),
            trace: false,
            poll_interval_secs: None,
            day_boundary: DayBoundary::default(),
        }
    }
}

impl BridgeConfig {
    /// Parses a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, RavenError> {
        toml::from_str(content).map_err(|e| RavenError::ConfigError(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self, RavenError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RavenError::ConfigError(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            baudrate: self.baudrate,
        }
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }

    /// Channel id and write key, both required to publish.
    pub fn channel(&self) -> Result<(u64, WriteKey), RavenError> {
        let channel_id = self
            .channel_id
            .ok_or_else(|| RavenError::ConfigError("channel_id is not set".into()))?;
        let write_key = self
            .write_key
            .clone()
            .filter(|k| !k.expose().is_empty())
            .ok_or_else(|| RavenError::ConfigError("write_key is not set".into()))?;
        Ok((channel_id, write_key))
    }

    /// Rejects settings the bridge cannot run with.
    pub fn validate(&self) -> Result<(), RavenError> {
        if self.serial_path.trim().is_empty() {
            return Err(RavenError::ConfigError("serial_path is empty".into()));
        }
        if self.baudrate == 0 {
            return Err(RavenError::ConfigError("baudrate must be positive".into()));
        }
        if self.poll_interval_secs == Some(0) {
            return Err(RavenError::ConfigError(
                "poll_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
