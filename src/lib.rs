//! # raven-rs - Bridge a RAVEn Smart-Meter Dongle to ThingSpeak
//!
//! The Rainforest RAVEn (RFA-Z106) is a USB dongle that joins a smart
//! meter's ZigBee network and reports readings over a serial port as small
//! multi-line XML documents. This crate reads those documents, derives the
//! usage metrics a home energy dashboard wants, and pushes them to a
//! ThingSpeak channel.
//!
//! ## Features
//!
//! - Connect to the dongle via a serial port connection
//! - Accumulate streamed lines into complete XML fragments
//! - Classify fragments and decode timestamps, signed demand and summations
//! - Track a once-per-day net energy delta across calendar rollovers
//! - Issue the dongle's poll commands
//! - Publish metric updates without blocking the read loop
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use raven_rs::{connect, Publisher, RavenBridge, ThingSpeakSink, DayBoundary, WriteKey};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), raven_rs::RavenError> {
//! let handle = connect("/dev/ttyUSB0").await?;
//! let (mut lines, mut commands) = handle.into_split();
//!
//! let sink = ThingSpeakSink::new("https://api.thingspeak.com/update", WriteKey::new("KEY"))?;
//! let publisher = Publisher::spawn(Arc::new(sink));
//! let mut bridge = RavenBridge::new(123456, publisher, DayBoundary::Local, false);
//!
//! bridge.run(&mut lines, &mut commands, None).await?;
//! bridge.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod raven;
pub mod telemetry;

pub use crate::bridge::{BridgeStats, RavenBridge};
pub use crate::config::{BridgeConfig, WriteKey};
pub use crate::error::RavenError;
pub use crate::logging::{init_logger, log_info};

// Protocol types
pub use raven::{
    classify, parse_document, AggregateTracker, CommandIssuer, DailyAggregateState, DayBoundary,
    DemandReading, FragmentAccumulator, LineReader, ParsedReading, RavenCommand, RavenHandle,
    SerialConfig, SummationReading,
};

// Telemetry types
pub use telemetry::{MetricField, MetricUpdate, Publisher, TelemetrySink, ThingSpeakSink};

/// Connect to the RAVEn dongle via serial port.
///
/// # Arguments
/// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
///
/// # Returns
/// * `Ok(RavenHandle)` - Connected device handle for communication
/// * `Err(RavenError)` - Connection failed
pub async fn connect(port: &str) -> Result<RavenHandle<tokio_serial::SerialStream>, RavenError> {
    RavenHandle::connect(port).await
}

/// Connect to the RAVEn dongle with a custom serial configuration.
pub async fn connect_with_config(
    port: &str,
    config: SerialConfig,
) -> Result<RavenHandle<tokio_serial::SerialStream>, RavenError> {
    RavenHandle::connect_with_config(port, config).await
}
