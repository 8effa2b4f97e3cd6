//! Pull the front-end assets out of zip, asar and installer containers and
//! lay them out as a clean, validated web tree.

pub mod services;
pub mod types;
#[cfg(test)]
pub mod test_utils;

pub use services::pipeline::{Pipeline, PipelineRequest, RunOutcome};
pub use services::package::PackageKind;
pub use types::{ErrorCategory, PipelineError, PipelineResult};
