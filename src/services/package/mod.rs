pub mod packager;
pub mod validator;

pub use packager::{package, PackageKind, PACK_PROGRESS};
pub use validator::{describe, validate, PackageArtifact, ValidationReport, VALIDATE_PROGRESS};
