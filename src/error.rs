//! # RAVEn Error Handling
//!
//! This module defines the RavenError enum, which represents the different error
//! types that can occur while bridging the dongle to the telemetry channel.
//!
//! Only `SerialPortError` ends a session. Decode and publish errors are
//! confined to the fragment or update that produced them.

use thiserror::Error;

/// Represents the different error types that can occur in the raven-rs crate.
#[derive(Debug, Error)]
pub enum RavenError {
    /// Indicates a failure opening, reading or writing the serial port.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// Indicates an accumulated fragment could not be decoded into a reading.
    #[error("Error decoding fragment: {reason}")]
    DecodeError {
        reason: String,
        /// The raw buffer, kept for diagnostic logging.
        raw: String,
    },

    /// Indicates a recognised message lacked one of its required fields.
    #[error("{message} is missing field {field}")]
    MissingField {
        message: &'static str,
        field: &'static str,
    },

    /// Indicates the telemetry sink rejected or failed an update.
    #[error("Publish error: {0}")]
    PublishError(String),

    /// Indicates invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A catch‑all error for uncategorized cases.
    #[error("Other error: {0}")]
    Other(String),
}

impl RavenError {
    /// Builds a `DecodeError` carrying the offending buffer.
    pub fn decode(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        RavenError::DecodeError {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// True for errors that end the session (transport failures).
    pub fn is_fatal(&self) -> bool {
        matches!(self, RavenError::SerialPortError(_))
    }
}

impl From<std::io::Error> for RavenError {
    fn from(err: std::io::Error) -> Self {
        RavenError::SerialPortError(err.to_string())
    }
}

impl From<tokio_serial::Error> for RavenError {
    fn from(err: tokio_serial::Error) -> Self {
        RavenError::SerialPortError(err.to_string())
    }
}

impl From<reqwest::Error> for RavenError {
    fn from(err: reqwest::Error) -> Self {
        RavenError::PublishError(err.to_string())
    }
}
