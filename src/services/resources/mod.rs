//! Side-band resource governance: sampling, admission, and monitoring.

pub mod governor;
pub mod monitor;

pub use governor::{
    admission_for, evaluate_thresholds, Admission, FixedProbe, ResourceAlert, ResourceGovernor,
    ResourceProbe, ResourceSample, SysinfoProbe,
};
pub use monitor::{MonitorTick, ResourceMonitor};
