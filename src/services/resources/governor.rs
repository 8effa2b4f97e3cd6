//! System resource sampling and the admission decision.
//!
//! Admission only looks at absolute free memory. Percentage thresholds
//! produce advisory alerts and drive the pressure signal, never a refusal.

use crate::services::config::ResourceThresholds;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use sysinfo::{Disks, System};

/// Required transient memory per container byte.
const ADMISSION_MEMORY_FACTOR: u64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSample {
    pub memory_total: u64,
    pub memory_free: u64,
    pub memory_used_percent: f32,
    pub cpu_load_percent: f32,
    pub disk_free: u64,
    pub disk_used_percent: f32,
    pub timestamp: DateTime<Utc>,
}

impl Default for ResourceSample {
    fn default() -> Self {
        Self {
            memory_total: 0,
            memory_free: 0,
            memory_used_percent: 0.0,
            cpu_load_percent: 0.0,
            disk_free: 0,
            disk_used_percent: 0.0,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ResourceAlert {
    Memory { used_percent: f32, threshold: f32 },
    Cpu { load_percent: f32, threshold: f32 },
    Disk { used_percent: f32, threshold: f32 },
}

impl ResourceAlert {
    pub fn message(&self) -> String {
        match self {
            Self::Memory {
                used_percent,
                threshold,
            } => format!("Memory usage {used_percent:.1}% exceeds {threshold:.0}%"),
            Self::Cpu {
                load_percent,
                threshold,
            } => format!("CPU load {load_percent:.1}% exceeds {threshold:.0}%"),
            Self::Disk {
                used_percent,
                threshold,
            } => format!("Disk usage {used_percent:.1}% exceeds {threshold:.0}%"),
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    pub admitted: bool,
    pub reason: String,
    pub required_bytes: u64,
    pub free_bytes: u64,
    /// Advisory only; present even when admitted.
    pub alerts: Vec<ResourceAlert>,
}

/// Source of resource samples. Tests substitute fixed readings.
pub trait ResourceProbe: Send + Sync {
    fn sample(&self) -> ResourceSample;

    /// Reading for the per-batch pressure check. Only the memory fields are
    /// meaningful.
    fn sample_memory(&self) -> ResourceSample {
        self.sample()
    }
}

/// Live readings from `sysinfo`. Disk figures are for the volume holding
/// `disk_path`.
pub struct SysinfoProbe {
    system: Mutex<System>,
    disk_path: PathBuf,
}

impl SysinfoProbe {
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        Self {
            system: Mutex::new(System::new()),
            disk_path: disk_path.into(),
        }
    }
}

impl ResourceProbe for SysinfoProbe {
    fn sample(&self) -> ResourceSample {
        let mut sample = ResourceSample::default();

        match self.system.lock() {
            Ok(mut sys) => {
                sys.refresh_memory();
                sys.refresh_cpu_usage();
                sample.memory_total = sys.total_memory();
                sample.memory_free = sys.available_memory();
                sample.memory_used_percent =
                    used_percent(sample.memory_total, sample.memory_free);
                sample.cpu_load_percent = sys.global_cpu_usage();
            }
            Err(_) => log::warn!("Resource probe lock poisoned; reporting zeroed memory/cpu"),
        }

        if let Some((free, total)) = disk_space_for(&self.disk_path) {
            sample.disk_free = free;
            sample.disk_used_percent = used_percent(total, free);
        }

        sample
    }

    fn sample_memory(&self) -> ResourceSample {
        let mut sample = ResourceSample::default();
        match self.system.lock() {
            Ok(mut sys) => {
                sys.refresh_memory();
                sample.memory_total = sys.total_memory();
                sample.memory_free = sys.available_memory();
                sample.memory_used_percent =
                    used_percent(sample.memory_total, sample.memory_free);
            }
            Err(_) => log::warn!("Resource probe lock poisoned; reporting zeroed memory"),
        }
        sample
    }
}

/// Returns whatever sample it was last given.
pub struct FixedProbe {
    sample: Mutex<ResourceSample>,
}

impl FixedProbe {
    pub fn new(sample: ResourceSample) -> Self {
        Self {
            sample: Mutex::new(sample),
        }
    }

    /// Sample with the given free memory and usage percentage, everything
    /// else idle.
    pub fn with_memory(total: u64, free: u64) -> Self {
        Self::new(ResourceSample {
            memory_total: total,
            memory_free: free,
            memory_used_percent: used_percent(total, free),
            ..ResourceSample::default()
        })
    }

    pub fn set(&self, sample: ResourceSample) {
        if let Ok(mut s) = self.sample.lock() {
            *s = sample;
        }
    }
}

impl ResourceProbe for FixedProbe {
    fn sample(&self) -> ResourceSample {
        let mut sample = self
            .sample
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        sample.timestamp = Utc::now();
        sample
    }
}

impl<P: ResourceProbe + ?Sized> ResourceProbe for std::sync::Arc<P> {
    fn sample(&self) -> ResourceSample {
        (**self).sample()
    }

    fn sample_memory(&self) -> ResourceSample {
        (**self).sample_memory()
    }
}

/// Free/total bytes of the disk with the longest mount prefix of `path`.
fn disk_space_for(path: &Path) -> Option<(u64, u64)> {
    let disks = Disks::new_with_refreshed_list();
    let search_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let mut best: Option<(u64, u64)> = None;
    let mut matched_len = 0;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if search_path.starts_with(mount) {
            let mount_len = mount.as_os_str().len();
            if mount_len >= matched_len {
                matched_len = mount_len;
                best = Some((disk.available_space(), disk.total_space()));
            }
        }
    }
    best
}

fn used_percent(total: u64, free: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let used = total.saturating_sub(free);
    (used as f64 / total as f64 * 100.0) as f32
}

pub struct ResourceGovernor {
    thresholds: ResourceThresholds,
    probe: Box<dyn ResourceProbe>,
    last_sample: Mutex<Option<ResourceSample>>,
}

impl ResourceGovernor {
    pub fn new(thresholds: ResourceThresholds, probe: Box<dyn ResourceProbe>) -> Self {
        Self {
            thresholds,
            probe,
            last_sample: Mutex::new(None),
        }
    }

    /// Governor backed by live system readings.
    pub fn system(thresholds: ResourceThresholds, disk_path: impl Into<PathBuf>) -> Self {
        Self::new(thresholds, Box::new(SysinfoProbe::new(disk_path)))
    }

    pub fn thresholds(&self) -> ResourceThresholds {
        self.thresholds
    }

    pub fn sample(&self) -> ResourceSample {
        let sample = self.probe.sample();
        if let Ok(mut last) = self.last_sample.lock() {
            *last = Some(sample.clone());
        }
        sample
    }

    pub fn last_sample(&self) -> Option<ResourceSample> {
        self.last_sample.lock().ok().and_then(|s| s.clone())
    }

    pub fn alerts_for(&self, sample: &ResourceSample) -> Vec<ResourceAlert> {
        evaluate_thresholds(sample, &self.thresholds)
    }

    pub fn check_admission(&self, expected_workload_bytes: u64) -> Admission {
        let sample = self.sample();
        let admission = admission_for(&sample, expected_workload_bytes, &self.thresholds);
        if admission.admitted {
            log::info!("Admission granted: {}", admission.reason);
        } else {
            log::warn!("Admission denied: {}", admission.reason);
        }
        admission
    }

    /// Memory usage is at or above its threshold right now. Reads memory
    /// only; called after every scan batch.
    pub fn is_under_pressure(&self) -> bool {
        let sample = self.probe.sample_memory();
        sample.memory_used_percent >= self.thresholds.memory_percent
    }
}

pub fn evaluate_thresholds(
    sample: &ResourceSample,
    thresholds: &ResourceThresholds,
) -> Vec<ResourceAlert> {
    let mut alerts = Vec::new();
    if sample.memory_used_percent >= thresholds.memory_percent {
        alerts.push(ResourceAlert::Memory {
            used_percent: sample.memory_used_percent,
            threshold: thresholds.memory_percent,
        });
    }
    if sample.cpu_load_percent >= thresholds.cpu_percent {
        alerts.push(ResourceAlert::Cpu {
            load_percent: sample.cpu_load_percent,
            threshold: thresholds.cpu_percent,
        });
    }
    if sample.disk_used_percent >= thresholds.disk_percent {
        alerts.push(ResourceAlert::Disk {
            used_percent: sample.disk_used_percent,
            threshold: thresholds.disk_percent,
        });
    }
    alerts
}

/// Admit iff free memory strictly exceeds twice the workload. Alerts are
/// attached for the caller to surface but play no part in the decision.
pub fn admission_for(
    sample: &ResourceSample,
    expected_workload_bytes: u64,
    thresholds: &ResourceThresholds,
) -> Admission {
    let required = expected_workload_bytes.saturating_mul(ADMISSION_MEMORY_FACTOR);
    let free = sample.memory_free;
    let admitted = free > required;
    let reason = if admitted {
        format!("{free} bytes free, {required} bytes required")
    } else {
        format!("only {free} bytes free, {required} bytes required")
    };

    Admission {
        admitted,
        reason,
        required_bytes: required,
        free_bytes: free,
        alerts: evaluate_thresholds(sample, thresholds),
    }
}

#[cfg(test)]
#[path = "tests/governor_tests.rs"]
mod tests;
