//! Progress events and the observer a pipeline run reports through.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

// ─── Event Types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Unpacking,
    Scanning,
    Reorganizing,
    Packing,
    Validating,
    Completed,
    Error,
    Warning,
    Info,
}

impl Stage {
    /// Advisory stages never end a run.
    pub fn is_advisory(&self) -> bool {
        matches!(self, Stage::Warning | Stage::Info)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub stage: Stage,
    pub percent: u8,
    pub message: String,
}

// ─── Sinks ─────────────────────────────────────────────────────────

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Writes events to the `log` facade.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, event: ProgressEvent) {
        match event.stage {
            Stage::Error => log::error!("[{:>3}%] {}", event.percent, event.message),
            Stage::Warning => log::warn!("[{:>3}%] {}", event.percent, event.message),
            _ => log::info!(
                "[{:>3}%] {:?}: {}",
                event.percent,
                event.stage,
                event.message
            ),
        }
    }
}

/// Forwards events to an async consumer. A closed receiver drops events.
pub struct ChannelSink(pub UnboundedSender<ProgressEvent>);

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.0.send(event);
    }
}

// ─── Reporter ──────────────────────────────────────────────────────

/// Cheap handle threaded through the stages of one run.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self { sink }
    }

    pub fn silent() -> Self {
        Self::new(Arc::new(NoopSink))
    }

    pub fn report(&self, stage: Stage, percent: u8, message: impl Into<String>) {
        self.sink.emit(ProgressEvent {
            stage,
            percent: percent.min(100),
            message: message.into(),
        });
    }

    /// Report `done / total` mapped linearly onto `[start, end]`.
    pub fn report_range(
        &self,
        stage: Stage,
        start: u8,
        end: u8,
        done: usize,
        total: usize,
        message: impl Into<String>,
    ) {
        self.report(stage, scale_percent(start, end, done, total), message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.report(Stage::Warning, 0, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.report(Stage::Info, 0, message);
    }
}

pub fn scale_percent(start: u8, end: u8, done: usize, total: usize) -> u8 {
    if total == 0 || end <= start {
        return end.max(start);
    }
    let span = (end - start) as usize;
    let offset = span * done.min(total) / total;
    start + offset as u8
}

// ─── Cancellation ──────────────────────────────────────────────────

/// Cooperative cancellation, observed between batches.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Aborted)` once cancelled, tagged with where it was noticed.
    pub fn check(&self, at: &str) -> crate::types::PipelineResult<()> {
        if self.is_cancelled() {
            log::info!("Run cancelled during {at}");
            return Err(crate::types::PipelineError::Aborted(format!(
                "cancelled during {at}"
            )));
        }
        Ok(())
    }
}

/// Per-run observer and cancellation, handed to every stage once.
#[derive(Clone)]
pub struct StageContext {
    pub progress: ProgressReporter,
    pub cancel: CancelFlag,
}

impl StageContext {
    pub fn new(progress: ProgressReporter, cancel: CancelFlag) -> Self {
        Self { progress, cancel }
    }

    /// Silent and never cancelled. Used when a stage runs on its own.
    pub fn detached() -> Self {
        Self::new(ProgressReporter::silent(), CancelFlag::new())
    }
}

#[cfg(test)]
#[path = "tests/progress_tests.rs"]
mod tests;
