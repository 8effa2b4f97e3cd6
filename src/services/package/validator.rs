use super::packager::PackageKind;
use crate::services::fs_utils::file_utils::tree_stats;
use crate::services::reorganize::{Framework, ENTRY_FILE};
use crate::types::{PipelineError, PipelineResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const VALIDATE_PROGRESS: u8 = 95;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ValidationReport {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }

    pub fn into_result(self, artifact: &Path) -> PipelineResult<()> {
        if self.valid {
            return Ok(());
        }
        Err(PipelineError::Validation {
            path: artifact.to_path_buf(),
            reason: self.reason.unwrap_or_else(|| "invalid artifact".to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageArtifact {
    pub output_path: PathBuf,
    pub kind: PackageKind,
    pub framework: Framework,
    pub file_count: usize,
    pub byte_size: u64,
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<fs::File>, String> {
    let file = fs::File::open(path).map_err(|e| format!("cannot open archive: {e}"))?;
    zip::ZipArchive::new(file).map_err(|e| format!("not a readable archive: {e}"))
}

/// Check that `artifact` has an entry document at its root. Archives are
/// checked by listing entries, never by extracting.
pub fn validate(artifact: &Path) -> ValidationReport {
    let report = if artifact.is_dir() {
        if artifact.join(ENTRY_FILE).is_file() {
            ValidationReport::ok()
        } else {
            ValidationReport::fail(format!("{ENTRY_FILE} missing at the output root"))
        }
    } else if artifact.is_file() {
        match open_archive(artifact) {
            Ok(archive) if archive.file_names().any(|n| n == ENTRY_FILE) => ValidationReport::ok(),
            Ok(_) => ValidationReport::fail(format!("{ENTRY_FILE} missing at the archive root")),
            Err(reason) => ValidationReport::fail(reason),
        }
    } else {
        ValidationReport::fail("artifact does not exist")
    };

    match &report.reason {
        None => log::info!("Validated {}", artifact.display()),
        Some(reason) => log::warn!("Validation failed for {}: {reason}", artifact.display()),
    }
    report
}

/// File count and byte size of a packaged artifact.
pub fn describe(artifact: &Path, framework: Framework) -> PipelineResult<PackageArtifact> {
    let (kind, file_count, byte_size) = if artifact.is_dir() {
        let (count, bytes) = tree_stats(artifact).map_err(|e| {
            PipelineError::Package(format!("Failed to measure {}: {e}", artifact.display()))
        })?;
        (PackageKind::Directory, count, bytes)
    } else {
        let mut archive = open_archive(artifact)
            .map_err(|e| PipelineError::Package(format!("{}: {e}", artifact.display())))?;
        let mut count = 0usize;
        let mut bytes = 0u64;
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i).map_err(|e| {
                PipelineError::Package(format!("{}: entry {i}: {e}", artifact.display()))
            })?;
            if entry.is_file() {
                count += 1;
                bytes += entry.size();
            }
        }
        (PackageKind::Archive, count, bytes)
    };

    Ok(PackageArtifact {
        output_path: artifact.to_path_buf(),
        kind,
        framework,
        file_count,
        byte_size,
    })
}

#[cfg(test)]
#[path = "tests/validator_tests.rs"]
mod tests;
