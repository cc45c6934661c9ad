//! # Daily Aggregate Tracking
//!
//! Every summation reading publishes the cumulative net, delivered and
//! received totals. Once per calendar day it additionally publishes the
//! daily net: the change in net usage since the previous rollover baseline.
//!
//! The first reading of a new day triggers the emission, so the value covers
//! "previous rollover reading to this reading", not midnight to midnight.
//! The dongle gives no guarantee of a reading at midnight.

use crate::logging::log_warn;
use crate::raven::message::SummationReading;
use crate::telemetry::{MetricField, MetricUpdate};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which calendar decides where one day ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DayBoundary {
    /// The host's local time zone.
    #[default]
    Local,
    /// A fixed UTC offset; UTC itself is `+00:00`.
    Fixed(FixedOffset),
}

impl DayBoundary {
    pub fn utc() -> Self {
        DayBoundary::Fixed(Utc.fix())
    }

    /// Calendar day of `timestamp` under this boundary.
    pub fn calendar_day(&self, timestamp: &DateTime<Utc>) -> NaiveDate {
        match self {
            DayBoundary::Local => timestamp.with_timezone(&Local).date_naive(),
            DayBoundary::Fixed(offset) => timestamp.with_timezone(offset).date_naive(),
        }
    }
}

impl FromStr for DayBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(DayBoundary::Local),
            "utc" | "z" => Ok(DayBoundary::utc()),
            other => other
                .parse::<FixedOffset>()
                .map(DayBoundary::Fixed)
                .map_err(|e| format!("invalid day boundary {s:?}: {e}")),
        }
    }
}

impl TryFrom<String> for DayBoundary {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DayBoundary> for String {
    fn from(value: DayBoundary) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DayBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayBoundary::Local => write!(f, "local"),
            DayBoundary::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Rollover bookkeeping that lives for the whole process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyAggregateState {
    /// Net usage at the last rollover; unset until the first summation.
    pub baseline_net: Option<i64>,
    /// Calendar day of the last rollover.
    pub last_rollover_date: Option<NaiveDate>,
}

/// Turns summation readings into metric updates.
#[derive(Debug, Clone, Default)]
pub struct AggregateTracker {
    state: DailyAggregateState,
    boundary: DayBoundary,
}

impl AggregateTracker {
    pub fn new(boundary: DayBoundary) -> Self {
        AggregateTracker {
            state: DailyAggregateState::default(),
            boundary,
        }
    }

    pub fn state(&self) -> &DailyAggregateState {
        &self.state
    }

    pub fn boundary(&self) -> DayBoundary {
        self.boundary
    }

    /// Builds the update for one summation reading and advances the
    /// rollover state.
    pub fn update(&mut self, reading: &SummationReading) -> MetricUpdate {
        let net = reading.net_watt_hours();
        let cur_day = self.boundary.calendar_day(&reading.timestamp);

        let mut update = MetricUpdate::new();
        update.set(MetricField::CumulativeNetUsage, net);
        update.set(
            MetricField::CumulativeEnergyIn,
            reading.delivered_watt_hours as i64,
        );
        update.set(
            MetricField::CumulativeEnergyOut,
            reading.received_watt_hours as i64,
        );

        match (self.state.baseline_net, self.state.last_rollover_date) {
            (Some(baseline), Some(last_day)) => {
                if cur_day != last_day {
                    match net.checked_sub(baseline) {
                        Some(delta) => update.set(MetricField::DailyNetEnergy, delta),
                        None => log_warn(&format!(
                            "daily net out of range: {net} - {baseline}, skipping"
                        )),
                    }
                    self.state.baseline_net = Some(net);
                    self.state.last_rollover_date = Some(cur_day);
                }
            }
            _ => {
                self.state.baseline_net = Some(net);
                self.state.last_rollover_date = Some(cur_day);
            }
        }

        update
    }
}
