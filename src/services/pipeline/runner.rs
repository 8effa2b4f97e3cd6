//! End-to-end extraction run.
//!
//! detect → pre-flight → admission → unpack → scan → reorganize → package
//! → validate. The scratch tree, cache contents and resource monitor are
//! released on every exit path.

use super::progress::{CancelFlag, ProgressReporter, Stage, StageContext};
use crate::services::archive::{create_toolchain, detect_format, ContainerHandle, Platform, Unpacker};
use crate::services::cache::TransformCache;
use crate::services::config::PipelineSettings;
use crate::services::fs_utils::file_utils::{remove_path, resolve_path};
use crate::services::package::{
    describe, package, validate, PackageArtifact, PackageKind, PACK_PROGRESS, VALIDATE_PROGRESS,
};
use crate::services::reorganize::{ReorganizeOutcome, Reorganizer};
use crate::services::resources::{ResourceGovernor, ResourceMonitor};
use crate::services::scanner::{
    sweep_stale_runs, EphemeralTracker, LiveMarker, Scanner, RUN_DIR_PREFIX,
};
use crate::types::{PipelineError, PipelineResult};
use futures_util::future::BoxFuture;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Share of the cache dropped when the monitor reports a memory alert.
const MEMORY_ALERT_EVICT_PERCENT: u8 = 50;

/// Asked once per run before anything is written. `false` aborts the run.
pub type PreflightHook = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub kind: PackageKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub artifact: PackageArtifact,
    pub reorganized: ReorganizeOutcome,
}

pub struct Pipeline {
    settings: PipelineSettings,
    governor: Arc<ResourceGovernor>,
    cache: Arc<TransformCache>,
    tracker: Arc<EphemeralTracker>,
    platform: Platform,
    preflight: Option<PreflightHook>,
    cancel: CancelFlag,
    background_started: AtomicBool,
}

impl Pipeline {
    /// Pipeline over the live system, sharing the process-wide cache.
    pub fn new(settings: PipelineSettings) -> PipelineResult<Self> {
        settings.validate()?;
        if !TransformCache::init_global(settings.cache_max_entries) {
            let active = TransformCache::global().capacity();
            if active != settings.cache_max_entries {
                log::warn!(
                    "Transform cache already initialized with {active} entries; ignoring cache_max_entries = {}",
                    settings.cache_max_entries
                );
            }
        }
        let governor = ResourceGovernor::system(settings.thresholds, settings.scratch_root());
        let tracker = EphemeralTracker::new(settings.ephemeral_max_age());

        Ok(Self {
            governor: Arc::new(governor),
            cache: TransformCache::global(),
            tracker: Arc::new(tracker),
            platform: Platform::detect(),
            preflight: None,
            cancel: CancelFlag::new(),
            background_started: AtomicBool::new(false),
            settings,
        })
    }

    pub fn with_governor(mut self, governor: Arc<ResourceGovernor>) -> Self {
        self.governor = governor;
        self
    }

    pub fn with_cache(mut self, cache: Arc<TransformCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_preflight(mut self, hook: PreflightHook) -> Self {
        self.preflight = Some(hook);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<TransformCache> {
        &self.cache
    }

    pub fn tracker(&self) -> &Arc<EphemeralTracker> {
        &self.tracker
    }

    /// Handle for cancelling the run in progress from another task.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Stop the ephemeral sweeper and remove everything it still tracks.
    pub fn shutdown(&self) -> usize {
        self.tracker.shutdown()
    }

    /// Run one extraction. Progress, including the terminal `Completed` or
    /// `Error` event, goes to `progress`.
    pub async fn run(
        &self,
        request: &PipelineRequest,
        progress: ProgressReporter,
    ) -> PipelineResult<RunOutcome> {
        self.cancel.reset();
        let ctx = StageContext::new(progress.clone(), self.cancel.clone());

        let result = self.run_inner(request, &ctx).await;
        match &result {
            Ok(outcome) => {
                log::info!(
                    "Run complete: {} ({} files, {} bytes)",
                    outcome.artifact.output_path.display(),
                    outcome.artifact.file_count,
                    outcome.artifact.byte_size
                );
                progress.report(
                    Stage::Completed,
                    100,
                    format!("Wrote {}", outcome.artifact.output_path.display()),
                );
            }
            Err(e) => {
                log::error!("Run failed [{:?}]: {e}", e.category());
                progress.report(Stage::Error, 0, e.to_string());
            }
        }
        result
    }

    async fn run_inner(
        &self,
        request: &PipelineRequest,
        ctx: &StageContext,
    ) -> PipelineResult<RunOutcome> {
        if detect_format(&request.input).is_none() {
            return Err(PipelineError::UnsupportedFormat(request.input.clone()));
        }
        let handle = ContainerHandle::open(&request.input)?;
        self.check_output_placement(request)?;

        if let Some(hook) = &self.preflight {
            if !hook().await {
                return Err(PipelineError::Aborted(
                    "pre-flight confirmation declined".into(),
                ));
            }
        }

        let admission = self.governor.check_admission(handle.size_bytes);
        for alert in &admission.alerts {
            ctx.progress.warn(alert.message());
        }
        if !admission.admitted {
            return Err(PipelineError::ResourceInsufficient {
                reason: admission.reason,
            });
        }

        self.start_background();
        let scratch_root = self.settings.scratch_root();
        fs::create_dir_all(&scratch_root)
            .map_err(|e| PipelineError::io("Failed to create scratch root", e))?;
        let scratch = tempfile::Builder::new()
            .prefix(RUN_DIR_PREFIX)
            .tempdir_in(&scratch_root)
            .map_err(|e| PipelineError::io("Failed to create scratch tree", e))?;
        log::debug!("Scratch tree at {}", scratch.path().display());
        let marker = LiveMarker::start(scratch.path(), self.live_marker_interval());

        let _guard = self.watch_resources(&ctx.progress);

        let stages = Stages {
            unpacker: Unpacker::new(
                create_toolchain(
                    self.platform,
                    self.settings.tools.clone(),
                    Arc::clone(&self.tracker),
                ),
                self.settings.unpack_batch_size,
                self.settings.large_file_threshold_bytes,
            ),
            scanner: Scanner::new(
                Arc::clone(&self.governor),
                Arc::clone(&self.cache),
                self.settings.worker_count(),
                self.settings.scan_batch_size,
            )?,
            reorganizer: Reorganizer::new(
                Arc::clone(&self.cache),
                self.settings.worker_count(),
                self.settings.code_batch_size,
                self.settings.asset_batch_size,
            )?,
        };
        let request = request.clone();
        let ctx = ctx.clone();

        // The scratch tree moves into the worker so unwinding removes it too.
        let worker = tokio::task::spawn_blocking(move || {
            let outcome = stages.run(&handle, scratch.path(), &request, &ctx);
            (outcome, scratch)
        })
        .await;
        marker.stop().await;

        let (outcome, scratch) =
            worker.map_err(|e| PipelineError::Aborted(format!("pipeline worker failed: {e}")))?;
        let path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            log::warn!("Failed to remove scratch tree {}: {e}", path.display());
        }
        outcome
    }

    /// Refresh often enough that another process's sweep never sees the
    /// marker as older than the ephemeral max age.
    fn live_marker_interval(&self) -> Duration {
        (self.settings.ephemeral_max_age() / 4).max(Duration::from_secs(1))
    }

    /// The output is replaced wholesale, so it may not enclose the scratch
    /// root or the input container.
    fn check_output_placement(&self, request: &PipelineRequest) -> PipelineResult<()> {
        let output = resolve_path(&request.output);
        let scratch_root = resolve_path(&self.settings.scratch_root());
        if scratch_root.starts_with(&output) {
            return Err(PipelineError::Package(format!(
                "Output {} contains the scratch root {}",
                request.output.display(),
                scratch_root.display()
            )));
        }
        if resolve_path(&request.input).starts_with(&output) {
            return Err(PipelineError::Package(format!(
                "Output {} contains the input {}",
                request.output.display(),
                request.input.display()
            )));
        }
        Ok(())
    }

    fn start_background(&self) {
        if self.background_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let root = self.settings.scratch_root();
        match sweep_stale_runs(&root, RUN_DIR_PREFIX, self.settings.ephemeral_max_age()) {
            Ok(0) => {}
            Ok(n) => log::info!("Removed {n} orphaned scratch trees"),
            Err(e) => log::warn!("Stale scratch sweep failed: {e}"),
        }
        self.tracker
            .start_sweeper(self.settings.ephemeral_sweep_interval());
    }

    /// Start the monitor for this run. Alerts become warnings; memory
    /// alerts also shed half the cache.
    fn watch_resources(&self, progress: &ProgressReporter) -> RunGuard {
        let monitor = ResourceMonitor::new(Arc::clone(&self.governor));
        let mut ticks = monitor.start(self.settings.monitor_interval());
        let cache = Arc::clone(&self.cache);
        let progress = progress.clone();

        let consumer = tokio::spawn(async move {
            while let Some(tick) = ticks.recv().await {
                for alert in &tick.alerts {
                    progress.warn(alert.message());
                }
                if tick.alerts.iter().any(|a| a.is_memory()) {
                    let evicted = cache.evict_percentage(MEMORY_ALERT_EVICT_PERCENT);
                    log::debug!("Memory alert: evicted {evicted} cache entries");
                }
            }
        });

        RunGuard {
            cache: Arc::clone(&self.cache),
            monitor,
            consumer,
        }
    }
}

/// Per-run cleanup that must happen however the run ends.
struct RunGuard {
    cache: Arc<TransformCache>,
    monitor: ResourceMonitor,
    consumer: JoinHandle<()>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.monitor.stop();
        self.consumer.abort();
        self.cache.clear_all();
        log::debug!("Run resources released");
    }
}

struct Stages {
    unpacker: Unpacker,
    scanner: Scanner,
    reorganizer: Reorganizer,
}

impl Stages {
    fn run(
        &self,
        handle: &ContainerHandle,
        scratch: &Path,
        request: &PipelineRequest,
        ctx: &StageContext,
    ) -> PipelineResult<RunOutcome> {
        let unpacked = scratch.join("unpacked");
        let organized = scratch.join("organized");
        fs::create_dir_all(&unpacked)
            .map_err(|e| PipelineError::io("Failed to create unpack directory", e))?;

        let options = self.unpacker.options_for(handle);
        self.unpacker.unpack(handle, &unpacked, options, ctx)?;

        let files = self.scanner.scan(&unpacked, ctx)?;

        let reorganized = self
            .reorganizer
            .reorganize(&unpacked, &organized, &files, ctx)?;

        ctx.progress.report(
            Stage::Packing,
            PACK_PROGRESS,
            format!("Packaging as {}", request.kind.name()),
        );
        let artifact_path = package(&organized, &request.output, request.kind)?;

        ctx.progress
            .report(Stage::Validating, VALIDATE_PROGRESS, "Validating output");
        let report = validate(&artifact_path);
        if !report.valid {
            if let Err(e) = remove_path(&artifact_path) {
                log::warn!(
                    "Failed to remove invalid artifact {}: {e}",
                    artifact_path.display()
                );
            }
            report.into_result(&artifact_path)?;
        }

        let artifact = describe(&artifact_path, reorganized.framework)?;
        Ok(RunOutcome {
            artifact,
            reorganized,
        })
    }
}

#[cfg(test)]
#[path = "tests/runner_tests.rs"]
mod tests;
