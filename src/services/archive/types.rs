use crate::types::{PipelineError, PipelineResult, UnpackFailure};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Supported container format, identified by extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerFormat {
    Zip,
    /// Electron-style archive; unpacked through the zip machinery.
    Asar,
    WindowsInstaller,
    DiskImage,
    Deb,
    Rpm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormatFamily {
    ZipLike,
    Installer,
}

impl ContainerFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "zip" => Some(Self::Zip),
            "asar" => Some(Self::Asar),
            "exe" => Some(Self::WindowsInstaller),
            "dmg" => Some(Self::DiskImage),
            "deb" => Some(Self::Deb),
            "rpm" => Some(Self::Rpm),
            _ => None,
        }
    }

    pub fn family(&self) -> FormatFamily {
        match self {
            Self::Zip | Self::Asar => FormatFamily::ZipLike,
            Self::WindowsInstaller | Self::DiskImage | Self::Deb | Self::Rpm => {
                FormatFamily::Installer
            }
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Asar => "asar",
            Self::WindowsInstaller => "exe",
            Self::DiskImage => "dmg",
            Self::Deb => "deb",
            Self::Rpm => "rpm",
        }
    }
}

/// `None` means unknown; callers reject before touching the file.
pub fn detect_format(path: &Path) -> Option<ContainerFormat> {
    ContainerFormat::from_path(path)
}

/// An input container whose format has been detected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerHandle {
    pub path: PathBuf,
    pub format: ContainerFormat,
    pub size_bytes: u64,
}

impl ContainerHandle {
    /// Detect the format, then stat the file. Unknown extensions are
    /// rejected before any I/O.
    pub fn open(path: &Path) -> PipelineResult<Self> {
        let format =
            detect_format(path).ok_or_else(|| PipelineError::UnsupportedFormat(path.to_path_buf()))?;

        let meta = std::fs::metadata(path).map_err(|e| {
            UnpackFailure::io(format!("Failed to read container {}", path.display()), e)
        })?;
        if !meta.is_file() {
            return Err(UnpackFailure::CorruptArchive(format!(
                "{} is not a regular file",
                path.display()
            ))
            .into());
        }

        Ok(Self {
            path: path.to_path_buf(),
            format,
            size_bytes: meta.len(),
        })
    }
}

/// Result of reading a zip-like container's central directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipAnalysis {
    pub entry_count: usize,
    pub uncompressed_size: u64,
    pub single_root_folder: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnpackOptions {
    /// Extract in yielding batches instead of one pass.
    pub is_large_file: bool,
}
