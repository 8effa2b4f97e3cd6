//! In-memory cache of transformed (beautified) file content.

pub mod transform_cache;

pub use transform_cache::{CacheEntry, CacheStats, TransformCache, DEFAULT_MAX_ENTRIES};
