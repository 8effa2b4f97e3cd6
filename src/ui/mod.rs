//! Terminal presentation for the CLI: environment detection, prompts and
//! the run progress bar.

pub mod context;
pub mod progress;
pub mod prompts;

pub use context::UiContext;
pub use progress::RunProgress;
