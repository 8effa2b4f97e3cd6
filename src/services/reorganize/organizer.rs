//! Canonical output layout.
//!
//! ```text
//! <dest>/index.html, *.html, config files
//! <dest>/css/
//! <dest>/js/
//! <dest>/assets/images/
//! <dest>/assets/fonts/
//! ```

use super::entry::synthesize_entry;
use super::framework::{detect_framework, Framework};
use crate::services::cache::TransformCache;
use crate::services::fs_utils::file_utils::unique_file_name;
use crate::services::pipeline::progress::{Stage, StageContext};
use crate::services::pipeline::workers::build_pool;
use crate::services::scanner::{ClassifiedFileSet, FileCategory};
use crate::services::transform::{transform_cached, CodeKind};
use crate::types::{PipelineError, PipelineResult};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CSS_DIR: &str = "css";
pub const JS_DIR: &str = "js";
pub const IMAGES_DIR: &str = "assets/images";
pub const FONTS_DIR: &str = "assets/fonts";

pub const REORGANIZE_PROGRESS_START: u8 = 60;
pub const REORGANIZE_PROGRESS_END: u8 = 85;

/// Cache share dropped after each category finishes.
const GROUP_EVICT_PERCENT: u8 = 10;

/// Output directory for a category, relative to the destination root.
/// `Other` files are not carried over.
pub fn target_dir(category: FileCategory) -> Option<&'static str> {
    match category {
        FileCategory::Html | FileCategory::Config => Some(""),
        FileCategory::Css => Some(CSS_DIR),
        FileCategory::Js => Some(JS_DIR),
        FileCategory::Images => Some(IMAGES_DIR),
        FileCategory::Fonts => Some(FONTS_DIR),
        FileCategory::Other => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorganizeOutcome {
    pub framework: Framework,
    /// Recognized files written to the destination, excluding anything
    /// synthesized.
    pub file_count: usize,
    pub synthesized_entry: bool,
}

#[derive(Debug)]
struct PlannedCopy {
    source: PathBuf,
    target: PathBuf,
    kind: Option<CodeKind>,
}

pub struct Reorganizer {
    cache: Arc<TransformCache>,
    pool: rayon::ThreadPool,
    code_batch_size: usize,
    asset_batch_size: usize,
}

impl Reorganizer {
    pub fn new(
        cache: Arc<TransformCache>,
        workers: usize,
        code_batch_size: usize,
        asset_batch_size: usize,
    ) -> PipelineResult<Self> {
        Ok(Self {
            cache,
            pool: build_pool(workers, "reorganize")?,
            code_batch_size: code_batch_size.max(1),
            asset_batch_size: asset_batch_size.max(1),
        })
    }

    pub fn reorganize(
        &self,
        source_root: &Path,
        dest_root: &Path,
        files: &ClassifiedFileSet,
        ctx: &StageContext,
    ) -> PipelineResult<ReorganizeOutcome> {
        if dest_root.starts_with(source_root) {
            return Err(PipelineError::Reorganize(format!(
                "Output {} lies inside the source tree {}",
                dest_root.display(),
                source_root.display()
            )));
        }
        create_layout(dest_root)?;

        let plan = plan_copies(files, dest_root);
        let total: usize = plan.iter().map(|(_, copies)| copies.len()).sum();
        log::info!(
            "Reorganizing {total} files from {} into {}",
            source_root.display(),
            dest_root.display()
        );
        ctx.progress.report(
            Stage::Reorganizing,
            REORGANIZE_PROGRESS_START,
            format!("Reorganizing {total} files"),
        );

        let mut done = 0usize;
        let mut written = 0usize;
        for (category, copies) in &plan {
            let batch_size = if category.is_code() {
                self.code_batch_size
            } else {
                self.asset_batch_size
            };

            for batch in copies.chunks(batch_size) {
                written += self
                    .pool
                    .install(|| batch.par_iter().filter(|c| self.copy_one(c)).count());
                done += batch.len();

                ctx.cancel.check("reorganizing")?;
                ctx.progress.report_range(
                    Stage::Reorganizing,
                    REORGANIZE_PROGRESS_START,
                    REORGANIZE_PROGRESS_END,
                    done,
                    total,
                    format!("Processed {done}/{total} files"),
                );
            }

            if !copies.is_empty() {
                let evicted = self.cache.evict_percentage(GROUP_EVICT_PERCENT);
                log::debug!(
                    "Finished {} ({} files), evicted {evicted} cache entries",
                    category.label(),
                    copies.len()
                );
            }
        }

        let framework = detect_framework(files);
        let synthesized_entry = synthesize_entry(dest_root, framework).map_err(|e| {
            PipelineError::Reorganize(format!("Failed to write entry document: {e}"))
        })?;

        ctx.progress.report(
            Stage::Reorganizing,
            REORGANIZE_PROGRESS_END,
            format!("Reorganized {written} files ({})", framework.name()),
        );
        Ok(ReorganizeOutcome {
            framework,
            file_count: written,
            synthesized_entry,
        })
    }

    /// Copy or transform one file. Failures are logged and the file is
    /// skipped.
    fn copy_one(&self, copy: &PlannedCopy) -> bool {
        let result = match copy.kind {
            Some(kind) => match transform_cached(&self.cache, &copy.source, kind) {
                Ok(Some(text)) => fs::write(&copy.target, text.as_bytes()),
                Ok(None) => fs::copy(&copy.source, &copy.target).map(|_| ()),
                Err(e) => Err(e),
            },
            None => fs::copy(&copy.source, &copy.target).map(|_| ()),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "Skipping {} -> {}: {e}",
                    copy.source.display(),
                    copy.target.display()
                );
                false
            }
        }
    }
}

fn create_layout(dest_root: &Path) -> PipelineResult<()> {
    for dir in ["", CSS_DIR, JS_DIR, IMAGES_DIR, FONTS_DIR] {
        let path = dest_root.join(dir);
        fs::create_dir_all(&path).map_err(|e| {
            PipelineError::Reorganize(format!("Failed to create {}: {e}", path.display()))
        })?;
    }
    Ok(())
}

/// Assign every recognized file a flat target name. Shallower sources
/// claim names first, so a top-level `index.html` keeps its name.
fn plan_copies(files: &ClassifiedFileSet, dest_root: &Path) -> Vec<(FileCategory, Vec<PlannedCopy>)> {
    let mut taken: HashMap<&'static str, HashSet<String>> = HashMap::new();
    let mut plan = Vec::new();

    for category in FileCategory::ALL {
        let Some(dir) = target_dir(category) else {
            continue;
        };
        let mut sources: Vec<&PathBuf> = files.get(category).iter().collect();
        sources.sort_by(|a, b| {
            a.components()
                .count()
                .cmp(&b.components().count())
                .then_with(|| a.cmp(b))
        });

        let names = taken.entry(dir).or_default();
        let copies = sources
            .into_iter()
            .filter_map(|source| {
                let file_name = source.file_name()?.to_string_lossy().into_owned();
                let name = unique_file_name(&file_name, names);
                if name != file_name {
                    log::debug!("Renamed {} to {name} to avoid a collision", source.display());
                }
                Some(PlannedCopy {
                    source: source.clone(),
                    target: dest_root.join(dir).join(name),
                    kind: CodeKind::from_category(category),
                })
            })
            .collect();
        plan.push((category, copies));
    }
    plan
}

#[cfg(test)]
#[path = "tests/organizer_tests.rs"]
mod tests;
