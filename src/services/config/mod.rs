pub mod models;

pub use models::*;

use crate::types::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

impl PipelineSettings {
    /// Load settings from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let settings: Self = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        settings.validate()?;
        log::debug!("Loaded pipeline settings from {}", path.display());
        Ok(settings)
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> PipelineResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let counts = [
            ("cache_max_entries", self.cache_max_entries),
            ("scan_batch_size", self.scan_batch_size),
            ("max_workers", self.max_workers),
            ("unpack_batch_size", self.unpack_batch_size),
            ("code_batch_size", self.code_batch_size),
            ("asset_batch_size", self.asset_batch_size),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(PipelineError::Config(format!("{name} must be greater than 0")));
            }
        }

        let t = &self.thresholds;
        for (name, value) in [
            ("thresholds.memory_percent", t.memory_percent),
            ("thresholds.cpu_percent", t.cpu_percent),
            ("thresholds.disk_percent", t.disk_percent),
        ] {
            if !(1.0..=100.0).contains(&value) {
                return Err(PipelineError::Config(format!(
                    "{name} must be within 1..=100, got {value}"
                )));
            }
        }

        if self.monitor_interval_ms == 0 {
            return Err(PipelineError::Config(
                "monitor_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn ephemeral_max_age(&self) -> Duration {
        Duration::from_secs(self.ephemeral_max_age_secs)
    }

    pub fn ephemeral_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.ephemeral_sweep_interval_secs)
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Worker pool size: never above the configured cap or the core count.
    pub fn worker_count(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cores.min(self.max_workers).max(1)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
