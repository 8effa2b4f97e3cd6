//! Container format detection and unpacking.
//!
//! Zip and asar share the zip extraction path; installer formats go
//! through the platform toolchain selected at construction.

mod analyze;
mod extract;
pub mod toolchain;
mod tools;
mod types;
mod unpack;

pub use analyze::analyze_zip;
pub use extract::extract_zip;
pub use toolchain::{create_toolchain, InstallerToolchain, Platform};
pub use types::{
    detect_format, ContainerFormat, ContainerHandle, FormatFamily, UnpackOptions, ZipAnalysis,
};
pub use unpack::Unpacker;

#[cfg(test)]
#[path = "tests/archive_tests.rs"]
mod tests;
