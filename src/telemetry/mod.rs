//! # Telemetry Publishing
//!
//! Metric updates, the sink abstraction they are pushed into, the ThingSpeak
//! sink, and the fire-and-forget publisher the bridge hands updates to.
//!
//! ## Channel layout
//!
//! | Slot                  | ThingSpeak field |
//! |-----------------------|------------------|
//! | `instantaneousUsage`  | `field1`         |
//! | `cumulativeNetUsage`  | `field2`         |
//! | `cumulativeEnergyIn`  | `field3`         |
//! | `cumulativeEnergyOut` | `field4`         |
//! | `dailyNetEnergy`      | `field5`         |

pub mod publisher;
pub mod thingspeak;

pub use publisher::Publisher;
pub use thingspeak::ThingSpeakSink;

use crate::error::RavenError;
use crate::raven::message::DemandReading;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// The five metric slots of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricField {
    InstantaneousUsage,
    CumulativeNetUsage,
    CumulativeEnergyIn,
    CumulativeEnergyOut,
    DailyNetEnergy,
}

impl MetricField {
    pub const ALL: [MetricField; 5] = [
        MetricField::InstantaneousUsage,
        MetricField::CumulativeNetUsage,
        MetricField::CumulativeEnergyIn,
        MetricField::CumulativeEnergyOut,
        MetricField::DailyNetEnergy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetricField::InstantaneousUsage => "instantaneousUsage",
            MetricField::CumulativeNetUsage => "cumulativeNetUsage",
            MetricField::CumulativeEnergyIn => "cumulativeEnergyIn",
            MetricField::CumulativeEnergyOut => "cumulativeEnergyOut",
            MetricField::DailyNetEnergy => "dailyNetEnergy",
        }
    }

    /// ThingSpeak field key for this slot.
    pub fn channel_field(&self) -> &'static str {
        match self {
            MetricField::InstantaneousUsage => "field1",
            MetricField::CumulativeNetUsage => "field2",
            MetricField::CumulativeEnergyIn => "field3",
            MetricField::CumulativeEnergyOut => "field4",
            MetricField::DailyNetEnergy => "field5",
        }
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A partial set of metric values for one channel update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricUpdate {
    values: BTreeMap<MetricField, i64>,
}

impl MetricUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update carrying only the instantaneous usage of a demand reading.
    pub fn from_demand(reading: &DemandReading) -> Self {
        let mut update = MetricUpdate::new();
        update.set(MetricField::InstantaneousUsage, reading.demand_watts);
        update
    }

    pub fn set(&mut self, field: MetricField, value: i64) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: MetricField) -> Option<i64> {
        self.values.get(&field).copied()
    }

    pub fn contains(&self, field: MetricField) -> bool {
        self.values.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricField, i64)> + '_ {
        self.values.iter().map(|(field, value)| (*field, *value))
    }
}

impl fmt::Display for MetricUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, value)| format!("{field}={value}"))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Destination for channel updates.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Pushes one update to `channel_id`. Delivery is best effort.
    async fn update_channel(&self, channel_id: u64, update: &MetricUpdate)
        -> Result<(), RavenError>;
}
