use crate::types::{PipelineError, PipelineResult};

/// Fixed-size rayon pool for one stage. Threads are named `assetlift-<label>-N`.
pub fn build_pool(workers: usize, label: &'static str) -> PipelineResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(move |i| format!("assetlift-{label}-{i}"))
        .build()
        .map_err(|e| PipelineError::Config(format!("Failed to build {label} pool: {e}")))
}
