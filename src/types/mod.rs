pub mod errors;

pub use errors::{ErrorCategory, PipelineError, PipelineResult, UnpackFailure};
