//! Fire-and-forget publishing.
//!
//! The read loop must never wait on the network. `Publisher::publish` queues
//! the update on an unbounded channel and returns; a background task drains
//! the queue in order and forwards each update to the sink. Sink failures
//! are logged and dropped, never retried.

use super::{MetricUpdate, TelemetrySink};
use crate::error::RavenError;
use crate::logging::log_error;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Outbound {
    channel_id: u64,
    update: MetricUpdate,
}

/// Handle to the background publishing task.
pub struct Publisher {
    tx: mpsc::UnboundedSender<Outbound>,
    worker: JoinHandle<PublishStats>,
}

/// Outcome counters of the publishing task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub delivered: u64,
    pub failed: u64,
}

impl Publisher {
    /// Spawns the publishing task. Must be called inside a tokio runtime.
    pub fn spawn(sink: Arc<dyn TelemetrySink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
        let worker = tokio::spawn(async move {
            let mut stats = PublishStats::default();
            while let Some(Outbound { channel_id, update }) = rx.recv().await {
                match sink.update_channel(channel_id, &update).await {
                    Ok(()) => stats.delivered += 1,
                    Err(e) => {
                        stats.failed += 1;
                        log_error(&format!("publish to channel {channel_id} failed: {e}"));
                    }
                }
            }
            stats
        });
        Publisher { tx, worker }
    }

    /// Queues `update` for `channel_id` without waiting for delivery.
    ///
    /// Empty updates are ignored. Fails only when the task has gone away.
    pub fn publish(&self, channel_id: u64, update: MetricUpdate) -> Result<(), RavenError> {
        if update.is_empty() {
            return Ok(());
        }
        self.tx
            .send(Outbound { channel_id, update })
            .map_err(|_| RavenError::PublishError("publisher task has stopped".into()))
    }

    /// Stops accepting updates, waits for the queue to drain and returns the
    /// task's counters.
    pub async fn shutdown(self) -> PublishStats {
        drop(self.tx);
        match self.worker.await {
            Ok(stats) => stats,
            Err(e) => {
                log_error(&format!("publisher task ended abnormally: {e}"));
                PublishStats::default()
            }
        }
    }
}
