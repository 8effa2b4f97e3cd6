use crate::services::pipeline::progress::{Stage, StageContext};
use crate::types::{PipelineResult, UnpackFailure};
use std::fs;
use std::io;
use std::path::Path;

/// Overall-progress window owned by extraction.
pub const UNPACK_PROGRESS_START: u8 = 10;
pub const UNPACK_PROGRESS_END: u8 = 40;

/// Extract a zip-structured container into `dest_path`.
///
/// With `batch_size` set, entries are written in fixed-size batches; between
/// batches the worker yields, reports progress, and honours cancellation.
/// Without it the whole archive is written in one pass. Returns the number
/// of files written.
pub fn extract_zip(
    archive_path: &Path,
    dest_path: &Path,
    batch_size: Option<usize>,
    ctx: &StageContext,
) -> PipelineResult<usize> {
    let file = fs::File::open(archive_path)
        .map_err(|e| UnpackFailure::io(format!("Failed to open {}", archive_path.display()), e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| UnpackFailure::CorruptArchive(format!("Invalid or corrupt ZIP: {e}")))?;

    fs::create_dir_all(dest_path).map_err(|e| UnpackFailure::dest_write(dest_path, e))?;

    let total = archive.len();
    ctx.progress.report(
        Stage::Unpacking,
        UNPACK_PROGRESS_START,
        format!("Extracting {total} entries"),
    );

    let mut count: usize = 0;
    match batch_size {
        None => {
            for i in 0..total {
                count += extract_entry(&mut archive, i, dest_path)?;
            }
        }
        Some(size) => {
            let size = size.max(1);
            let mut start = 0;
            while start < total {
                let end = (start + size).min(total);
                for i in start..end {
                    count += extract_entry(&mut archive, i, dest_path)?;
                }
                ctx.progress.report_range(
                    Stage::Unpacking,
                    UNPACK_PROGRESS_START,
                    UNPACK_PROGRESS_END,
                    end,
                    total,
                    format!("Extracted {end}/{total} entries"),
                );
                ctx.cancel.check("unpacking")?;
                std::thread::yield_now();
                start = end;
            }
        }
    }

    ctx.progress.report(
        Stage::Unpacking,
        UNPACK_PROGRESS_END,
        format!("Extracted {count} files"),
    );
    Ok(count)
}

/// Write one entry. Returns 1 for a file, 0 for directories and skipped
/// entries.
fn extract_entry(
    archive: &mut zip::ZipArchive<fs::File>,
    index: usize,
    dest_path: &Path,
) -> Result<usize, UnpackFailure> {
    let mut entry = archive.by_index(index).map_err(|e| {
        UnpackFailure::CorruptArchive(format!("Failed to read entry {index}: {e}"))
    })?;

    let entry_path = match entry.enclosed_name() {
        Some(p) => p.to_path_buf(),
        None => {
            log::warn!("Skipping entry with unsafe path: {}", entry.name());
            return Ok(0);
        }
    };

    let output_path = dest_path.join(&entry_path);

    if entry.is_dir() {
        fs::create_dir_all(&output_path).map_err(|e| UnpackFailure::dest_write(&output_path, e))?;
        return Ok(0);
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|e| UnpackFailure::dest_write(parent, e))?;
    }
    let mut outfile =
        fs::File::create(&output_path).map_err(|e| UnpackFailure::dest_write(&output_path, e))?;
    io::copy(&mut entry, &mut outfile).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            UnpackFailure::PermissionDenied(output_path.clone())
        } else {
            UnpackFailure::CorruptArchive(format!("Failed to read {}: {e}", entry_path.display()))
        }
    })?;
    Ok(1)
}
