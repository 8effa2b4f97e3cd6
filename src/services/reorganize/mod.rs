pub mod entry;
pub mod framework;
pub mod organizer;

pub use entry::{synthesize_entry, ENTRY_FILE};
pub use framework::{detect_framework, Framework};
pub use organizer::{ReorganizeOutcome, Reorganizer};

#[cfg(test)]
#[path = "tests/framework_tests.rs"]
mod framework_tests;

#[cfg(test)]
#[path = "tests/entry_tests.rs"]
mod entry_tests;
