use crate::services::fs_utils::file_utils::{
    copy_dir_contents, remove_path, replace_dir, resolve_path,
};
use crate::types::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

pub const PACK_PROGRESS: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Directory,
    Archive,
}

impl PackageKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Archive => "archive",
        }
    }
}

/// Materialize `source` at `dest` and return `dest`.
///
/// Directory output replaces anything already at `dest`; there is no merge.
/// A failure after `dest` was touched removes whatever was written there.
pub fn package(source: &Path, dest: &Path, kind: PackageKind) -> PipelineResult<PathBuf> {
    check_overlap(source, dest)?;
    log::info!(
        "Packaging {} as {} at {}",
        source.display(),
        kind.name(),
        dest.display()
    );

    let written = match kind {
        PackageKind::Directory => write_directory(source, dest),
        PackageKind::Archive => {
            remove_path(dest).map_err(|e| package_error("Failed to replace", dest, e))?;
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| package_error("Failed to create parent of", dest, e))?;
            }
            write_archive(source, dest)
        }
    };

    if let Err(e) = written {
        if let Err(cleanup) = remove_path(dest) {
            log::warn!("Failed to remove partial output {}: {cleanup}", dest.display());
        }
        return Err(e);
    }
    Ok(dest.to_path_buf())
}

/// `dest` is replaced wholesale, so it may neither contain nor sit inside
/// the tree being packaged.
fn check_overlap(source: &Path, dest: &Path) -> PipelineResult<()> {
    let source = resolve_path(source);
    let dest = resolve_path(dest);
    if dest.starts_with(&source) {
        return Err(PipelineError::Package(format!(
            "Destination {} lies inside the packaged tree",
            dest.display()
        )));
    }
    if source.starts_with(&dest) {
        return Err(PipelineError::Package(format!(
            "Destination {} contains the packaged tree {}",
            dest.display(),
            source.display()
        )));
    }
    Ok(())
}

fn write_directory(source: &Path, dest: &Path) -> PipelineResult<()> {
    replace_dir(dest).map_err(|e| package_error("Failed to prepare", dest, e))?;
    copy_dir_contents(source, dest).map_err(|e| package_error("Failed to copy into", dest, e))
}

fn package_error(what: &str, path: &Path, e: io::Error) -> PipelineError {
    PipelineError::Package(format!("{what} {}: {e}", path.display()))
}

/// Zip entry name for `path` below `root`, always `/`-separated.
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn write_archive(source: &Path, dest: &Path) -> PipelineResult<()> {
    let file = fs::File::create(dest).map_err(|e| package_error("Failed to create", dest, e))?;
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let zip_error = |e: zip::result::ZipError| {
        PipelineError::Package(format!("Failed to write {}: {e}", dest.display()))
    };

    let mut files = 0usize;
    for entry in WalkDir::new(source).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            PipelineError::Package(format!("Failed to walk {}: {e}", source.display()))
        })?;
        let Some(name) = entry_name(source, entry.path()) else {
            continue;
        };

        if entry.file_type().is_dir() {
            writer.add_directory(name, options).map_err(zip_error)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options).map_err(zip_error)?;
            let mut input = fs::File::open(entry.path())
                .map_err(|e| package_error("Failed to read", entry.path(), e))?;
            io::copy(&mut input, &mut writer)
                .map_err(|e| package_error("Failed to compress", entry.path(), e))?;
            files += 1;
        }
    }

    writer.finish().map_err(zip_error)?;
    log::debug!("Wrote {files} files to {}", dest.display());
    Ok(())
}

#[cfg(test)]
#[path = "tests/packager_tests.rs"]
mod tests;
