//! Background resource monitor.
//!
//! A supervisor task owns its shutdown signal and pushes each tick through
//! a bounded channel. Stopping is idempotent and aborts the task.

use super::governor::{ResourceAlert, ResourceGovernor, ResourceSample};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const TICK_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct MonitorTick {
    pub sample: ResourceSample,
    pub alerts: Vec<ResourceAlert>,
}

struct MonitorTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct ResourceMonitor {
    governor: Arc<ResourceGovernor>,
    task: Mutex<Option<MonitorTask>>,
}

impl ResourceMonitor {
    pub fn new(governor: Arc<ResourceGovernor>) -> Self {
        Self {
            governor,
            task: Mutex::new(None),
        }
    }

    /// Start ticking every `interval`. An already running monitor is
    /// stopped first. Must be called inside a Tokio runtime.
    pub fn start(&self, interval: Duration) -> mpsc::Receiver<MonitorTick> {
        self.stop();

        let (tx, rx) = mpsc::channel(TICK_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let governor = Arc::clone(&self.governor);
        let handle = tokio::spawn(supervise(governor, interval, tx, shutdown_rx));

        if let Ok(mut task) = self.task.lock() {
            *task = Some(MonitorTask {
                shutdown: shutdown_tx,
                handle,
            });
        }
        log::debug!("Resource monitor started ({interval:?} interval)");
        rx
    }

    /// Start and deliver every tick to `on_sample` on a consumer task.
    pub fn start_with_callback<F>(&self, interval: Duration, on_sample: F)
    where
        F: Fn(&ResourceSample, &[ResourceAlert]) + Send + 'static,
    {
        let mut rx = self.start(interval);
        tokio::spawn(async move {
            while let Some(tick) = rx.recv().await {
                on_sample(&tick.sample, &tick.alerts);
            }
        });
    }

    pub fn stop(&self) {
        let task = match self.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(task) = task {
            let _ = task.shutdown.send(());
            task.handle.abort();
            log::debug!("Resource monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|t| t.as_ref().is_some_and(|t| !t.handle.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn supervise(
    governor: Arc<ResourceGovernor>,
    interval: Duration,
    tx: mpsc::Sender<MonitorTick>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let probe = Arc::clone(&governor);
                let reading = tokio::task::spawn_blocking(move || {
                    let sample = probe.sample();
                    let alerts = probe.alerts_for(&sample);
                    (sample, alerts)
                })
                .await;
                let (sample, alerts) = match reading {
                    Ok(reading) => reading,
                    Err(e) => {
                        log::warn!("Resource sample task failed: {e}");
                        continue;
                    }
                };
                for alert in &alerts {
                    log::debug!("Resource alert: {}", alert.message());
                }
                match tx.try_send(MonitorTick { sample, alerts }) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        log::debug!("Monitor consumer lagging; dropping tick");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/monitor_tests.rs"]
mod tests;
