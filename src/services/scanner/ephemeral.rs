//! Tracker for transient scratch paths (mount points, work dirs).
//!
//! Registered paths are removed once they outlive `max_age`, whether or not
//! the run that created them finished. A long-running process must not
//! accumulate scratch directories. Pinned paths belong to a guard that is
//! still alive and are never aged out.

use crate::services::fs_utils::file_utils::remove_path;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Name prefix of per-run scratch directories.
pub const RUN_DIR_PREFIX: &str = "assetlift-run-";
/// Name prefix of disk-image mount points.
pub const MOUNT_DIR_PREFIX: &str = "assetlift-mount-";
/// Heartbeat file inside a run directory. The stale sweep dates a run by
/// the newer of the directory's and this file's mtime.
pub const LIVE_MARKER: &str = ".assetlift-live";

#[derive(Debug, Clone, Copy)]
struct TrackedPath {
    registered: Instant,
    pinned: bool,
}

struct SweepTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct EphemeralTracker {
    entries: Mutex<HashMap<PathBuf, TrackedPath>>,
    max_age: Duration,
    sweeper: Mutex<Option<SweepTask>>,
}

impl EphemeralTracker {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_age,
            sweeper: Mutex::new(None),
        }
    }

    pub fn register(&self, path: impl Into<PathBuf>) {
        self.insert(path.into(), false);
    }

    /// Track `path` but exempt it from cleanup until [`unpin`](Self::unpin).
    pub fn register_pinned(&self, path: impl Into<PathBuf>) {
        self.insert(path.into(), true);
    }

    fn insert(&self, path: PathBuf, pinned: bool) {
        log::debug!("Tracking ephemeral path {} (pinned: {pinned})", path.display());
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                path,
                TrackedPath {
                    registered: Instant::now(),
                    pinned,
                },
            );
        }
    }

    /// Make a pinned path eligible for cleanup again.
    pub fn unpin(&self, path: &Path) -> bool {
        self.entries
            .lock()
            .ok()
            .and_then(|mut e| e.get_mut(path).map(|t| t.pinned = false))
            .is_some()
    }

    /// Forget `path` without touching the filesystem.
    pub fn unregister(&self, path: &Path) -> bool {
        self.entries
            .lock()
            .map(|mut e| e.remove(path).is_some())
            .unwrap_or(false)
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(path))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_older_than(self.max_age)
    }

    /// Remove every unpinned path registered at least `age` ago. Paths
    /// that fail to delete stay tracked for the next sweep.
    pub fn cleanup_older_than(&self, age: Duration) -> usize {
        let now = Instant::now();
        let expired: Vec<PathBuf> = match self.entries.lock() {
            Ok(entries) => entries
                .iter()
                .filter(|(_, t)| !t.pinned && now.saturating_duration_since(t.registered) >= age)
                .map(|(path, _)| path.clone())
                .collect(),
            Err(_) => return 0,
        };

        let mut removed = 0;
        for path in expired {
            match remove_path(&path) {
                Ok(()) => {
                    self.unregister(&path);
                    removed += 1;
                }
                Err(e) => log::warn!("Failed to clean ephemeral path {}: {e}", path.display()),
            }
        }
        if removed > 0 {
            log::info!("Cleaned {removed} ephemeral path(s)");
        }
        removed
    }

    pub fn cleanup_all(&self) -> usize {
        self.cleanup_older_than(Duration::ZERO)
    }

    /// Sweep expired paths every `interval` on a background task. The task
    /// holds only a weak reference and ends with the tracker.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) {
        self.stop_sweeper();

        let weak: Weak<Self> = Arc::downgrade(self);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; skip it so fresh entries survive.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let Some(tracker) = weak.upgrade() else { break };
                        let sweep = tokio::task::spawn_blocking(move || tracker.cleanup_expired());
                        if let Err(e) = sweep.await {
                            log::warn!("Ephemeral sweep task failed: {e}");
                        }
                    }
                }
            }
        });

        if let Ok(mut sweeper) = self.sweeper.lock() {
            *sweeper = Some(SweepTask {
                shutdown: shutdown_tx,
                handle,
            });
        }
    }

    pub fn stop_sweeper(&self) {
        let task = self.sweeper.lock().ok().and_then(|mut s| s.take());
        if let Some(task) = task {
            let _ = task.shutdown.send(());
            task.handle.abort();
        }
    }

    /// Stop sweeping and remove everything still tracked.
    pub fn shutdown(&self) -> usize {
        self.stop_sweeper();
        self.cleanup_all()
    }
}

impl Drop for EphemeralTracker {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

/// Remove directories under `root` named `prefix*` whose mtime is older
/// than `max_age`. Covers scratch trees left by a crashed process.
pub fn sweep_stale_runs(root: &Path, prefix: &str, max_age: Duration) -> Result<u64, String> {
    if !root.exists() {
        return Ok(0);
    }

    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .ok_or_else(|| "Failed to compute cleanup cutoff".to_string())?;

    let mut removed = 0_u64;
    for entry in std::fs::read_dir(root).map_err(|e| e.to_string())? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        let path = entry.path();

        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(prefix) || !path.is_dir() {
            continue;
        }

        let modified = match entry.metadata().and_then(|meta| meta.modified()) {
            Ok(value) => value,
            Err(_) => continue,
        };
        if last_activity(&path, modified) >= cutoff {
            continue;
        }

        match std::fs::remove_dir_all(&path) {
            Ok(()) => removed = removed.saturating_add(1),
            Err(e) => log::warn!("Failed to remove stale run {}: {e}", path.display()),
        }
    }

    if removed > 0 {
        log::info!("Removed {removed} stale scratch tree(s) under {}", root.display());
    }
    Ok(removed)
}

fn last_activity(run_dir: &Path, dir_modified: SystemTime) -> SystemTime {
    match fs::metadata(run_dir.join(LIVE_MARKER)).and_then(|m| m.modified()) {
        Ok(marker) => marker.max(dir_modified),
        Err(_) => dir_modified,
    }
}

/// (Re)write the live marker in `run_dir`, bumping its mtime.
pub fn touch_live_marker(run_dir: &Path) -> io::Result<()> {
    fs::write(run_dir.join(LIVE_MARKER), std::process::id().to_string())
}

/// Keeps a run directory's live marker fresh so other processes' stale
/// sweeps leave it alone.
pub struct LiveMarker {
    run_dir: PathBuf,
    handle: JoinHandle<()>,
}

impl LiveMarker {
    /// Write the marker now, then refresh it every `every`. Must be called
    /// inside a Tokio runtime.
    pub fn start(run_dir: &Path, every: Duration) -> Self {
        if let Err(e) = touch_live_marker(run_dir) {
            log::warn!("Failed to mark {} live: {e}", run_dir.display());
        }
        let dir = run_dir.to_path_buf();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = touch_live_marker(&dir) {
                    log::debug!("Live marker refresh failed for {}: {e}", dir.display());
                }
            }
        });
        Self {
            run_dir: run_dir.to_path_buf(),
            handle,
        }
    }

    /// Stop refreshing. Once this returns no write is in flight, so the run
    /// directory can be removed.
    pub async fn stop(mut self) {
        self.handle.abort();
        let _ = (&mut self.handle).await;
        log::debug!("Live marker stopped for {}", self.run_dir.display());
    }
}

impl Drop for LiveMarker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
#[path = "tests/ephemeral_tests.rs"]
mod tests;
