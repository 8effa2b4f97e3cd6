pub mod beautify;

pub use beautify::{beautify, looks_minified, normalize_line_endings, CodeKind};

use crate::services::cache::TransformCache;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Transformed body of `path`, served from `cache` when present.
///
/// Returns `Ok(None)` for files that are not valid UTF-8; callers copy
/// those untouched.
pub fn transform_cached(
    cache: &TransformCache,
    path: &Path,
    kind: CodeKind,
) -> std::io::Result<Option<Arc<str>>> {
    if let Some(hit) = cache.get(path) {
        return Ok(Some(hit));
    }

    let bytes = fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(t) => t,
        Err(_) => {
            log::debug!("{} is not UTF-8, copying as-is", path.display());
            return Ok(None);
        }
    };

    let transformed: Arc<str> = beautify(kind, &text).into();
    cache.put(path.to_path_buf(), Arc::clone(&transformed));
    Ok(Some(transformed))
}

#[cfg(test)]
#[path = "tests/transform_tests.rs"]
mod tests;
