use super::analyze::analyze_zip;
use super::extract::{extract_zip, UNPACK_PROGRESS_END, UNPACK_PROGRESS_START};
use super::toolchain::InstallerToolchain;
use super::types::{ContainerHandle, FormatFamily, UnpackOptions};
use crate::services::pipeline::progress::{Stage, StageContext};
use crate::types::{PipelineError, PipelineResult, UnpackFailure};
use std::path::{Path, PathBuf};

/// Zip containers with at least this many entries take the batched path
/// regardless of byte size.
const LARGE_ENTRY_COUNT: usize = 1000;

/// Runs the per-format extraction for a detected container.
pub struct Unpacker {
    toolchain: Box<dyn InstallerToolchain>,
    batch_size: usize,
    large_file_threshold: u64,
}

impl Unpacker {
    pub fn new(
        toolchain: Box<dyn InstallerToolchain>,
        batch_size: usize,
        large_file_threshold: u64,
    ) -> Self {
        Self {
            toolchain,
            batch_size: batch_size.max(1),
            large_file_threshold,
        }
    }

    /// Decide whether `handle` should be extracted in batches.
    pub fn options_for(&self, handle: &ContainerHandle) -> UnpackOptions {
        if handle.size_bytes >= self.large_file_threshold {
            return UnpackOptions { is_large_file: true };
        }
        if handle.format.family() == FormatFamily::ZipLike {
            match analyze_zip(&handle.path) {
                Ok(analysis) => {
                    log::debug!(
                        "{}: {} entries, {} bytes uncompressed",
                        handle.path.display(),
                        analysis.entry_count,
                        analysis.uncompressed_size
                    );
                    return UnpackOptions {
                        is_large_file: analysis.entry_count >= LARGE_ENTRY_COUNT
                            || analysis.uncompressed_size >= self.large_file_threshold,
                    };
                }
                // Corruption surfaces from extraction with full context.
                Err(e) => log::debug!("Pre-unpack analysis failed: {e}"),
            }
        }
        UnpackOptions::default()
    }

    /// Unpack `handle` into `dest_dir` and return `dest_dir`.
    pub fn unpack(
        &self,
        handle: &ContainerHandle,
        dest_dir: &Path,
        options: UnpackOptions,
        ctx: &StageContext,
    ) -> PipelineResult<PathBuf> {
        log::info!(
            "Unpacking {} as {} ({} bytes, large: {})",
            handle.path.display(),
            handle.format.tag(),
            handle.size_bytes,
            options.is_large_file
        );

        match handle.format.family() {
            FormatFamily::ZipLike => {
                let batch = options.is_large_file.then_some(self.batch_size);
                let files = extract_zip(&handle.path, dest_dir, batch, ctx)?;
                log::info!("Extracted {files} files from {}", handle.path.display());
            }
            FormatFamily::Installer => {
                ctx.progress.report(
                    Stage::Unpacking,
                    UNPACK_PROGRESS_START,
                    format!("Unpacking {} installer via {}", handle.format.tag(), self.toolchain.name()),
                );
                self.toolchain
                    .unpack(handle.format, &handle.path, dest_dir)
                    .map_err(|e| {
                        log::error!("Installer unpack failed: {e}");
                        PipelineError::Unpack(e)
                    })?;
                ctx.cancel.check("unpacking")?;
                ctx.progress.report(
                    Stage::Unpacking,
                    UNPACK_PROGRESS_END,
                    "Installer unpacked",
                );
            }
        }

        if !dest_dir.is_dir() {
            return Err(UnpackFailure::CorruptArchive(format!(
                "{} produced no output",
                handle.path.display()
            ))
            .into());
        }
        Ok(dest_dir.to_path_buf())
    }
}

#[cfg(test)]
#[path = "tests/unpack_tests.rs"]
mod tests;
