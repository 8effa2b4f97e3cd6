use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Recursively copy the contents of `from` into `to`, creating `to` if
/// needed. Existing files are overwritten.
pub fn copy_dir_contents(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    let mut options = fs_extra::dir::CopyOptions::new();
    options.content_only = true;
    options.overwrite = true;

    fs_extra::dir::copy(from, to, &options)
        .map(|_| ())
        .map_err(|err| io::Error::other(err.to_string()))
}

/// Make `path` an empty directory, deleting whatever was there first.
pub fn replace_dir(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            log::debug!("Replacing existing directory {}", path.display());
            fs::remove_dir_all(path)?;
        }
        Ok(_) => fs::remove_file(path)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(path)
}

/// Remove a file or directory tree. Missing paths are not an error.
pub fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Absolute form of `path` with symlinks resolved as far as it exists, for
/// containment checks between paths that may not exist yet.
pub fn resolve_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    let resolved = loop {
        if let Ok(canonical) = existing.canonicalize() {
            break Some(missing.iter().rev().fold(canonical, |acc, part| acc.join(part)));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break None,
        }
    };
    resolved.unwrap_or(absolute)
}

/// Claim `file_name` in `taken`, or the first free `stem-N.ext` variant.
/// Comparison is case-insensitive so output stays valid on case-folding
/// filesystems.
pub fn unique_file_name(file_name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(file_name.to_lowercase()) {
        return file_name.to_string();
    }

    let (stem, ext) = match file_name.rfind('.') {
        Some(dot) if dot > 0 => (&file_name[..dot], &file_name[dot..]),
        _ => (file_name, ""),
    };
    let mut n = 1usize;
    loop {
        let candidate = format!("{stem}-{n}{ext}");
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

/// Regular-file count and total byte size under `root`. Symlinks are not
/// followed.
pub fn tree_stats(root: &Path) -> io::Result<(usize, u64)> {
    let mut files = 0usize;
    let mut bytes = 0u64;
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() {
            files += 1;
            bytes += entry.metadata().map_err(io::Error::other)?.len();
        }
    }
    Ok((files, bytes))
}
