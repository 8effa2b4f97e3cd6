use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Percentage thresholds that raise advisory alerts. None of them block work.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ResourceThresholds {
    pub memory_percent: f32,
    pub cpu_percent: f32,
    pub disk_percent: f32,
}

impl Default for ResourceThresholds {
    fn default() -> Self {
        Self {
            memory_percent: 80.0,
            cpu_percent: 80.0,
            disk_percent: 90.0,
        }
    }
}

/// External binaries used for installer formats.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ToolCommands {
    pub ar: String,
    pub tar: String,
    pub rpm2cpio: String,
    pub cpio: String,
    pub hdiutil: String,
    pub seven_zip: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            ar: "ar".into(),
            tar: "tar".into(),
            rpm2cpio: "rpm2cpio".into(),
            cpio: "cpio".into(),
            hdiutil: "hdiutil".into(),
            seven_zip: "7z".into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub thresholds: ResourceThresholds,
    pub monitor_interval_ms: u64,
    pub cache_max_entries: usize,
    pub scan_batch_size: usize,
    pub max_workers: usize,
    pub unpack_batch_size: usize,
    /// Containers at or above this size take the batched extraction path.
    pub large_file_threshold_bytes: u64,
    pub code_batch_size: usize,
    pub asset_batch_size: usize,
    /// Parent directory for per-run scratch trees. System temp dir when unset.
    pub scratch_root: Option<PathBuf>,
    pub ephemeral_max_age_secs: u64,
    pub ephemeral_sweep_interval_secs: u64,
    pub tools: ToolCommands,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            thresholds: ResourceThresholds::default(),
            monitor_interval_ms: 1500,
            cache_max_entries: 100,
            scan_batch_size: 50,
            max_workers: 4,
            unpack_batch_size: 10,
            large_file_threshold_bytes: 100 * 1024 * 1024,
            code_batch_size: 5,
            asset_batch_size: 20,
            scratch_root: None,
            ephemeral_max_age_secs: 30 * 60,
            ephemeral_sweep_interval_secs: 5 * 60,
            tools: ToolCommands::default(),
        }
    }
}
