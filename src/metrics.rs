//! Severity bands for the worker-pool metrics gauges.

use crate::model::Metrics;
use serde::Serialize;

/// Gauge capacity for active tasks; the pool runs at most this many at once.
pub const ACTIVE_TASK_CAPACITY: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warn,
    Danger,
}

fn band(value: f64, warn: f64, danger: f64) -> Severity {
    if value > danger {
        Severity::Danger
    } else if value > warn {
        Severity::Warn
    } else {
        Severity::Ok
    }
}

/// CPU and memory: warn above 60 %, danger above 80 %.
pub fn load_severity(percent: f64) -> Severity {
    band(percent, 60.0, 80.0)
}

/// Error rate: warn above 10 %, danger above 20 %.
pub fn error_rate_severity(percent: f64) -> Severity {
    band(percent, 10.0, 20.0)
}

/// Fraction of the active-task gauge that is filled, clamped to `0.0..=1.0`.
pub fn active_task_ratio(active: u64) -> f64 {
    (active as f64 / ACTIVE_TASK_CAPACITY as f64).clamp(0.0, 1.0)
}

/// Clamp a server-reported percentage into `0..=100` for gauges.
pub fn gauge_percent(value: f64) -> u16 {
    if value.is_finite() {
        value.clamp(0.0, 100.0).round() as u16
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub cpu: Severity,
    pub memory: Severity,
    pub error_rate: Severity,
    pub active_ratio: f64,
}

pub fn summarize(m: &Metrics) -> MetricsSummary {
    MetricsSummary {
        cpu: load_severity(m.cpu_percent),
        memory: load_severity(m.memory_percent),
        error_rate: error_rate_severity(m.error_rate),
        active_ratio: active_task_ratio(m.active_tasks),
    }
}
