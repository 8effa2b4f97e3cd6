use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Stable, user-facing error category. Front ends key their messaging off
/// this rather than the display string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    UnsupportedFormat,
    UnpackFailure,
    ScanFailure,
    ReorganizeFailure,
    PackageFailure,
    ValidationFailure,
    ResourceInsufficient,
    Aborted,
    Config,
}

/// Ways an unpack stage can fail. None of these are retried.
#[derive(Debug, Error)]
pub enum UnpackFailure {
    #[error("required tool `{tool}` is not available on this system")]
    ToolMissing { tool: String },
    #[error("`{tool}` exited with {status}: {stderr}")]
    ToolExit {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),
    #[error("permission denied writing to {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported container format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("Unpack failed: {0}")]
    Unpack(#[from] UnpackFailure),
    #[error("Scan failed at {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Reorganize failed: {0}")]
    Reorganize(String),
    #[error("Packaging failed: {0}")]
    Package(String),
    #[error("Validation failed for {}: {reason}", path.display())]
    Validation { path: PathBuf, reason: String },
    #[error("Insufficient resources: {reason}")]
    ResourceInsufficient { reason: String },
    #[error("Aborted: {0}")]
    Aborted(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedFormat(_) => ErrorCategory::UnsupportedFormat,
            Self::Unpack(_) => ErrorCategory::UnpackFailure,
            Self::Scan { .. } => ErrorCategory::ScanFailure,
            Self::Reorganize(_) => ErrorCategory::ReorganizeFailure,
            Self::Package(_) | Self::Io { .. } | Self::Json(_) => ErrorCategory::PackageFailure,
            Self::Validation { .. } => ErrorCategory::ValidationFailure,
            Self::ResourceInsufficient { .. } => ErrorCategory::ResourceInsufficient,
            Self::Aborted(_) => ErrorCategory::Aborted,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl UnpackFailure {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Error for a failed write under the destination tree.
    pub fn dest_write(path: &std::path::Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied(path.to_path_buf());
        }
        Self::io(format!("Failed to write {}", path.display()), source)
    }
}

impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
#[path = "tests/errors_tests.rs"]
mod tests;
