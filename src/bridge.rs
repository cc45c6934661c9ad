//! # RAVEn to Telemetry Bridge
//!
//! Wires the pipeline together:
//!
//! ```text
//! serial lines -> FragmentAccumulator -> decode + classify -> AggregateTracker
//!              -> MetricUpdate -> Publisher -> sink
//! ```
//!
//! Everything runs on one task in arrival order. The only suspension
//! points are waiting for the next line and, when polling is enabled,
//! writing a poll command. Publishing never blocks the loop.

use crate::error::RavenError;
use crate::logging::{log_info, log_trace, log_warn};
use crate::raven::accumulator::FragmentAccumulator;
use crate::raven::command::{CommandIssuer, RavenCommand};
use crate::raven::message::{parse_document, ParsedReading};
use crate::raven::serial::LineReader;
use crate::raven::tracker::{AggregateTracker, DayBoundary};
use crate::telemetry::publisher::PublishStats;
use crate::telemetry::{MetricUpdate, Publisher};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Commands issued on every poll tick.
pub const POLL_COMMANDS: [RavenCommand; 2] = [
    RavenCommand::InstantaneousDemand,
    RavenCommand::CurrentSummationDelivered,
];

/// Counters for one bridge session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub documents: u64,
    pub decode_errors: u64,
    pub published: u64,
    pub diagnostics: u64,
}

/// Owns all per-session pipeline state.
pub struct RavenBridge {
    channel_id: u64,
    accumulator: FragmentAccumulator,
    tracker: AggregateTracker,
    publisher: Publisher,
    trace: bool,
    stats: BridgeStats,
}

impl RavenBridge {
    pub fn new(channel_id: u64, publisher: Publisher, boundary: DayBoundary, trace: bool) -> Self {
        RavenBridge {
            channel_id,
            accumulator: FragmentAccumulator::new(),
            tracker: AggregateTracker::new(boundary),
            publisher,
            trace,
            stats: BridgeStats::default(),
        }
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn tracker(&self) -> &AggregateTracker {
        &self.tracker
    }

    /// Feeds one serial line; returns the reading if it completed one.
    pub fn handle_line(&mut self, line: &str) -> Option<ParsedReading> {
        let document = self.accumulator.feed(line)?;
        self.process_document(&document)
    }

    /// Decodes, classifies and dispatches one complete fragment.
    ///
    /// A bad fragment is logged with its raw text and dropped. It leaves
    /// the tracker untouched.
    pub fn process_document(&mut self, raw: &str) -> Option<ParsedReading> {
        self.stats.documents += 1;
        match parse_document(raw) {
            Ok(reading) => {
                self.dispatch(&reading);
                Some(reading)
            }
            Err(RavenError::DecodeError { reason, raw }) => {
                self.stats.decode_errors += 1;
                log_warn(&format!("err: {reason}"));
                log_warn(&format!("data received: {raw}"));
                None
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                log_warn(&format!("err: {e}"));
                None
            }
        }
    }

    /// Maps a reading to its metric update and queues it for publishing.
    ///
    /// Connection status and unrecognized documents are only logged.
    pub fn dispatch(&mut self, reading: &ParsedReading) -> Option<MetricUpdate> {
        let update = match reading {
            ParsedReading::InstantaneousDemand(demand) => {
                log_trace(
                    self.trace,
                    &format!(
                        "demand: {} : {}",
                        demand.timestamp.to_rfc3339(),
                        demand.demand_watts
                    ),
                );
                MetricUpdate::from_demand(demand)
            }
            ParsedReading::CurrentSummationDelivered(summation) => {
                log_trace(
                    self.trace,
                    &format!(
                        "sum: {} : {} - {}",
                        summation.timestamp.to_rfc3339(),
                        summation.delivered_watt_hours,
                        summation.received_watt_hours
                    ),
                );
                self.tracker.update(summation)
            }
            ParsedReading::ConnectionStatus { status } => {
                self.stats.diagnostics += 1;
                log_trace(self.trace, &format!("connection status: {status}"));
                return None;
            }
            ParsedReading::Unrecognized { raw } => {
                self.stats.diagnostics += 1;
                log_trace(self.trace, &raw.summary());
                return None;
            }
        };

        match self.publisher.publish(self.channel_id, update.clone()) {
            Ok(()) => self.stats.published += 1,
            Err(e) => log_warn(&format!("{e}")),
        }
        Some(update)
    }

    /// Runs until the line stream ends or the transport fails.
    ///
    /// With `poll_interval` set, [`POLL_COMMANDS`] are written before the
    /// first line is read and then once per period; a due tick is served
    /// before pending lines.
    /// A transport error ends the session and is returned; there is no
    /// reconnect.
    pub async fn run<R, W>(
        &mut self,
        lines: &mut LineReader<R>,
        commands: &mut CommandIssuer<W>,
        poll_interval: Option<Duration>,
    ) -> Result<(), RavenError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send,
    {
        if poll_interval.is_some() {
            issue_polls(commands).await?;
        }
        let mut ticker = poll_interval.map(|period| {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                biased;

                _ = next_tick(&mut ticker) => issue_polls(commands).await?,
                line = lines.next_line() => match line? {
                    Some(line) => {
                        self.handle_line(&line);
                    }
                    None => {
                        log_info("serial stream closed");
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Waits for queued updates to drain and returns both sets of counters.
    pub async fn shutdown(self) -> (BridgeStats, PublishStats) {
        let stats = self.stats;
        (stats, self.publisher.shutdown().await)
    }
}

async fn issue_polls<W>(commands: &mut CommandIssuer<W>) -> Result<(), RavenError>
where
    W: AsyncWrite + Unpin + Send,
{
    for command in POLL_COMMANDS {
        commands.issue(command).await?;
    }
    Ok(())
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
