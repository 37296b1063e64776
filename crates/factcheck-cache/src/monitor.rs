//! Periodic sampling of cache usage.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::service::CacheService;

/// One point in a monitoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSample {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub memory_entries: usize,
    pub file_bytes: u64,
    pub hit_rate: f64,
    /// Requests per second since the previous sample (since start for the first).
    pub operations_per_second: f64,
    pub remote_entries: Option<u64>,
}

/// A running monitor.
///
/// Dropping the handle does not stop sampling; call [`cancel`](Self::cancel).
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<Vec<MonitorSample>>,
}

impl MonitorHandle {
    /// Stop sampling early. Samples taken so far are kept.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that stops this run when cancelled, for use from another task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to end and return its samples in order.
    pub async fn join(self) -> Vec<MonitorSample> {
        match self.task.await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(error = %e, "Monitor task failed");
                Vec::new()
            }
        }
    }
}

impl CacheService {
    /// Start sampling every `interval` for `duration` in the background.
    ///
    /// Takes `max(1, duration / interval)` samples, the first immediately.
    /// Closing the service cancels the run.
    pub fn spawn_monitor(&self, duration: Duration, interval: Duration) -> MonitorHandle {
        let interval = interval.max(Duration::from_millis(1));
        let count = (duration.as_nanos() / interval.as_nanos()).max(1);
        let cancel = self.inner.shutdown.child_token();
        let token = cancel.clone();
        let service = self.clone();

        let task = self.inner.tasks.spawn(async move {
            let started = Instant::now();
            let deadline = started + duration;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut samples = Vec::new();
            let mut previous = (started, service.inner.stats.total_requests());
            tracing::debug!(?duration, ?interval, count, "Monitor started");

            while (samples.len() as u128) < count {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let sample = service.sample(&mut previous).await;
                samples.push(sample);
            }

            if !token.is_cancelled() {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            tracing::debug!(samples = samples.len(), "Monitor finished");
            samples
        });

        MonitorHandle { cancel, task }
    }

    /// Sample every `interval` until `duration` elapses and return the history.
    pub async fn monitor(&self, duration: Duration, interval: Duration) -> Vec<MonitorSample> {
        self.spawn_monitor(duration, interval).join().await
    }

    async fn sample(&self, previous: &mut (Instant, u64)) -> MonitorSample {
        let stats = self.get_stats().await;
        let now = Instant::now();
        let elapsed = now.duration_since(previous.0).as_secs_f64();
        let operations = stats.total_requests.saturating_sub(previous.1);
        *previous = (now, stats.total_requests);

        MonitorSample {
            timestamp: OffsetDateTime::now_utc(),
            memory_entries: stats.memory_entries,
            file_bytes: stats.file_bytes,
            hit_rate: stats.hit_rate,
            operations_per_second: if elapsed > 0.0 {
                operations as f64 / elapsed
            } else {
                0.0
            },
            remote_entries: stats.remote_entries,
        }
    }
}
