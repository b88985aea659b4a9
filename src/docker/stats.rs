//! One-shot resource snapshot parsing.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// CPU and memory utilisation of a running container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

impl ResourceUsage {
    /// CPU rendered with one decimal place, e.g. `12.5%`.
    pub fn cpu_display(&self) -> String {
        format!("{:.1}%", self.cpu_percent)
    }

    /// Memory rendered as whole megabytes, e.g. `128MB`.
    pub fn memory_display(&self) -> String {
        format!("{:.0}MB", self.memory_mb)
    }
}

#[derive(Debug, Deserialize)]
struct StatsPayload {
    cpu_stats: CpuStats,
    precpu_stats: CpuStats,
    memory_stats: MemoryStats,
}

#[derive(Debug, Deserialize)]
struct CpuStats {
    cpu_usage: CpuUsage,
    #[serde(default)]
    system_cpu_usage: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CpuUsage {
    total_usage: u64,
}

#[derive(Debug, Deserialize)]
struct MemoryStats {
    #[serde(default)]
    usage: Option<u64>,
}

/// Compute utilisation from a runtime stats document.
///
/// CPU is the share of the system delta consumed by the container's delta
/// between the previous and current samples; any non-positive delta gives 0.
pub fn parse_stats(raw: &serde_json::Value) -> Result<ResourceUsage> {
    let payload = StatsPayload::deserialize(raw).map_err(|e| Error::StatsParse(e.to_string()))?;

    let cpu_delta =
        payload.cpu_stats.cpu_usage.total_usage as f64 - payload.precpu_stats.cpu_usage.total_usage as f64;
    let system_delta = payload.cpu_stats.system_cpu_usage.unwrap_or(0) as f64
        - payload.precpu_stats.system_cpu_usage.unwrap_or(0) as f64;

    let cpu_percent = if cpu_delta > 0.0 && system_delta > 0.0 {
        cpu_delta / system_delta * 100.0
    } else {
        0.0
    };

    let memory_mb = payload.memory_stats.usage.unwrap_or(0) as f64 / (1024.0 * 1024.0);

    Ok(ResourceUsage {
        cpu_percent,
        memory_mb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(cpu: u64, precpu: u64, system: u64, presystem: u64, mem: u64) -> serde_json::Value {
        json!({
            "cpu_stats": { "cpu_usage": { "total_usage": cpu }, "system_cpu_usage": system },
            "precpu_stats": { "cpu_usage": { "total_usage": precpu }, "system_cpu_usage": presystem },
            "memory_stats": { "usage": mem }
        })
    }

    #[test]
    fn test_cpu_and_memory() {
        let usage = parse_stats(&sample(300, 200, 2000, 1000, 64 * 1024 * 1024)).unwrap();
        assert_eq!(usage.cpu_display(), "10.0%");
        assert_eq!(usage.memory_display(), "64MB");
    }

    #[test]
    fn test_non_positive_deltas_yield_zero_cpu() {
        let usage = parse_stats(&sample(200, 300, 2000, 1000, 0)).unwrap();
        assert_eq!(usage.cpu_display(), "0.0%");

        let usage = parse_stats(&sample(300, 200, 1000, 1000, 0)).unwrap();
        assert_eq!(usage.cpu_percent, 0.0);
    }

    #[test]
    fn test_malformed_payload() {
        let err = parse_stats(&json!({ "cpu_stats": "nope" })).unwrap_err();
        assert!(matches!(err, Error::StatsParse(_)));
        assert_eq!(ResourceUsage::default().memory_display(), "0MB");
    }
}
