pub mod progress;
pub mod runner;
pub mod workers;

pub use progress::{
    CancelFlag, ChannelSink, LogSink, NoopSink, ProgressEvent, ProgressReporter, ProgressSink,
    Stage, StageContext,
};
pub use runner::{Pipeline, PipelineRequest, PreflightHook, RunOutcome};
