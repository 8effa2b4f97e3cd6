//! Bounded-concurrency directory scan.
//!
//! Each directory level is processed in fixed-size batches on a small rayon
//! pool. A batch completes fully before the next starts; results are merged
//! into the file set only at that boundary.

use super::classify::{classify, ClassifiedFileSet, FileCategory};
use crate::services::cache::TransformCache;
use crate::services::pipeline::progress::{scale_percent, Stage, StageContext};
use crate::services::pipeline::workers::build_pool;
use crate::services::resources::ResourceGovernor;
use crate::types::{PipelineError, PipelineResult};
use rayon::prelude::*;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SCAN_PROGRESS_START: u8 = 45;
pub const SCAN_PROGRESS_END: u8 = 55;

/// Share of the transform cache dropped when a batch ends under pressure.
const PRESSURE_EVICT_PERCENT: u8 = 30;

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "__MACOSX"];

enum Found {
    File(FileCategory, PathBuf),
    Dir(PathBuf),
}

pub struct Scanner {
    governor: Arc<ResourceGovernor>,
    cache: Arc<TransformCache>,
    pool: rayon::ThreadPool,
    batch_size: usize,
}

impl Scanner {
    pub fn new(
        governor: Arc<ResourceGovernor>,
        cache: Arc<TransformCache>,
        workers: usize,
        batch_size: usize,
    ) -> PipelineResult<Self> {
        Ok(Self {
            governor,
            cache,
            pool: build_pool(workers, "scan")?,
            batch_size: batch_size.max(1),
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Walk `root` and bucket every regular file. Unreadable entries below
    /// the root are logged and skipped; an unreadable root is fatal.
    pub fn scan(&self, root: &Path, ctx: &StageContext) -> PipelineResult<ClassifiedFileSet> {
        let root_entries = fs::read_dir(root).map_err(|source| PipelineError::Scan {
            path: root.to_path_buf(),
            source,
        })?;

        ctx.progress.report(
            Stage::Scanning,
            SCAN_PROGRESS_START,
            format!("Scanning {}", root.display()),
        );

        let mut files = ClassifiedFileSet::new();
        let mut pending: VecDeque<PathBuf> = VecDeque::new();
        let mut dirs_done = 0usize;
        // The queue grows as we descend, so the raw ratio can dip.
        let mut high_water = SCAN_PROGRESS_START;

        self.scan_level(collect_entries(root, root_entries), &mut files, &mut pending, ctx)?;
        dirs_done += 1;

        while let Some(dir) = pending.pop_front() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => collect_entries(&dir, entries),
                Err(e) => {
                    log::warn!("Skipping unreadable directory {}: {e}", dir.display());
                    continue;
                }
            };
            self.scan_level(entries, &mut files, &mut pending, ctx)?;
            dirs_done += 1;

            high_water = high_water.max(scale_percent(
                SCAN_PROGRESS_START,
                SCAN_PROGRESS_END,
                dirs_done,
                dirs_done + pending.len(),
            ));
            ctx.progress.report(
                Stage::Scanning,
                high_water,
                format!("Scanned {dirs_done} directories, {} files", files.total()),
            );
        }

        log::info!(
            "Scan complete: {} files ({} recognized) in {dirs_done} directories",
            files.total(),
            files.recognized_count()
        );
        ctx.progress.report(
            Stage::Scanning,
            SCAN_PROGRESS_END,
            format!("Found {} front-end files", files.recognized_count()),
        );
        Ok(files)
    }

    fn scan_level(
        &self,
        entries: Vec<PathBuf>,
        files: &mut ClassifiedFileSet,
        pending: &mut VecDeque<PathBuf>,
        ctx: &StageContext,
    ) -> PipelineResult<()> {
        for batch in entries.chunks(self.batch_size) {
            let found: Vec<Found> = self.pool.install(|| {
                batch
                    .par_iter()
                    .filter_map(|path| inspect(path))
                    .collect()
            });

            for item in found {
                match item {
                    Found::File(category, path) => files.push(category, path),
                    Found::Dir(path) => pending.push_back(path),
                }
            }

            ctx.cancel.check("scanning")?;
            if self.governor.is_under_pressure() {
                let evicted = self.cache.evict_percentage(PRESSURE_EVICT_PERCENT);
                log::debug!("Memory pressure during scan; evicted {evicted} cache entries");
            }
        }
        Ok(())
    }
}

fn collect_entries(dir: &Path, entries: fs::ReadDir) -> Vec<PathBuf> {
    entries
        .filter_map(|entry| match entry {
            Ok(e) => Some(e.path()),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                None
            }
        })
        .collect()
}

/// Stat one entry without following symlinks.
fn inspect(path: &Path) -> Option<Found> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("Skipping {}: {e}", path.display());
            return None;
        }
    };

    if meta.is_dir() {
        let skipped = path
            .file_name()
            .map(|n| SKIPPED_DIRS.iter().any(|skip| n == *skip))
            .unwrap_or(false);
        if skipped {
            log::debug!("Not descending into {}", path.display());
            return None;
        }
        return Some(Found::Dir(path.to_path_buf()));
    }

    if meta.is_file() {
        return Some(Found::File(classify(path), path.to_path_buf()));
    }
    None
}

#[cfg(test)]
#[path = "tests/walker_tests.rs"]
mod tests;
