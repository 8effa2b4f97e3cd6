use super::types::ZipAnalysis;
use crate::types::UnpackFailure;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Read a zip-like container's entry table without extracting.
pub fn analyze_zip(archive_path: &Path) -> Result<ZipAnalysis, UnpackFailure> {
    let file = fs::File::open(archive_path)
        .map_err(|e| UnpackFailure::io(format!("Failed to open {}", archive_path.display()), e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| UnpackFailure::CorruptArchive(format!("Invalid or corrupt ZIP: {e}")))?;

    let mut uncompressed_size: u64 = 0;
    let mut root_dirs: HashSet<String> = HashSet::new();

    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| UnpackFailure::CorruptArchive(format!("Failed to read entry {i}: {e}")))?;
        uncompressed_size = uncompressed_size.saturating_add(entry.size());

        let name = entry.name().replace('\\', "/");
        if let Some(first) = name.split('/').next() {
            if !first.is_empty() {
                root_dirs.insert(first.to_string());
            }
        }
    }

    Ok(ZipAnalysis {
        entry_count: archive.len(),
        uncompressed_size,
        single_root_folder: if root_dirs.len() == 1 {
            root_dirs.into_iter().next()
        } else {
            None
        },
    })
}
