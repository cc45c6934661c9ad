// Shared helpers for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use raven_rs::constants::RAVEN_EPOCH_UNIX_SECS;
use raven_rs::{MetricUpdate, RavenError, TelemetrySink};
use std::sync::Mutex;

/// Sink that records every update it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub updates: Mutex<Vec<(u64, MetricUpdate)>>,
}

impl RecordingSink {
    pub fn updates(&self) -> Vec<MetricUpdate> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .map(|(_, u)| u.clone())
            .collect()
    }
}

#[async_trait]
impl TelemetrySink for RecordingSink {
    async fn update_channel(
        &self,
        channel_id: u64,
        update: &MetricUpdate,
    ) -> Result<(), RavenError> {
        self.updates
            .lock()
            .unwrap()
            .push((channel_id, update.clone()));
        Ok(())
    }
}

/// Device seconds (since 2000-01-01 UTC) for a UTC wall-clock time.
pub fn device_secs(year: i32, month: u32, day: u32, hour: u32) -> u64 {
    let at = Utc
        .with_ymd_and_hms(year, month, day, hour, 0, 0)
        .unwrap()
        .timestamp();
    (at - RAVEN_EPOCH_UNIX_SECS) as u64
}

/// Lines of an InstantaneousDemand document as the dongle sends them.
pub fn demand_lines(secs: u64, raw_demand: u32) -> Vec<String> {
    vec![
        "<InstantaneousDemand>".to_string(),
        "  <DeviceMacId>0xd8d5b90000001234</DeviceMacId>".to_string(),
        format!("  <TimeStamp>0x{secs:08x}</TimeStamp>"),
        format!("  <Demand>0x{raw_demand:06x}</Demand>"),
        "  <Multiplier>0x00000001</Multiplier>".to_string(),
        "  <Divisor>0x000003e8</Divisor>".to_string(),
        "</InstantaneousDemand>".to_string(),
    ]
}

/// Lines of a CurrentSummationDelivered document.
pub fn summation_lines(secs: u64, delivered: u64, received: u64) -> Vec<String> {
    vec![
        "<CurrentSummationDelivered>".to_string(),
        "  <DeviceMacId>0xd8d5b90000001234</DeviceMacId>".to_string(),
        format!("  <TimeStamp>0x{secs:08x}</TimeStamp>"),
        format!("  <SummationDelivered>0x{delivered:016x}</SummationDelivered>"),
        format!("  <SummationReceived>0x{received:016x}</SummationReceived>"),
        "</CurrentSummationDelivered>".to_string(),
    ]
}

pub fn connection_status_lines(status: &str) -> Vec<String> {
    vec![
        "<ConnectionStatus>".to_string(),
        format!("  <Status>{status}</Status>"),
        "</ConnectionStatus>".to_string(),
    ]
}
