use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resource usage percentages; `None` when the probe cannot measure it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub memory_percent: Option<f64>,
    pub cpu_percent: Option<f64>,
    pub disk_percent: Option<f64>,
}

/// Source of system resource samples
#[async_trait]
pub trait ResourceProbe: Send + Sync {
    async fn sample(&self) -> ResourceSample;
}

/// Probe reading Linux procfs
///
/// Memory is `1 - MemAvailable / MemTotal`; CPU is the one-minute load
/// average over the logical CPU count. Disk is not measured.
#[derive(Debug, Clone)]
pub struct ProcfsProbe {
    root: PathBuf,
    cpus: usize,
}

impl Default for ProcfsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcfsProbe {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Probe reading `meminfo` and `loadavg` under `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            root: root.into(),
            cpus,
        }
    }

    pub fn with_cpus(mut self, cpus: usize) -> Self {
        self.cpus = cpus.max(1);
        self
    }

    async fn read(&self, name: &str) -> Option<String> {
        match tokio::fs::read_to_string(self.root.join(name)).await {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("Cannot read {}: {}", self.root.join(name).display(), e);
                None
            }
        }
    }
}

fn meminfo_kb(content: &str, field: &str) -> Option<f64> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix(field)?.strip_prefix(':')?;
        rest.split_whitespace().next()?.parse::<f64>().ok()
    })
}

/// Percent of memory in use from `/proc/meminfo` content
pub fn parse_meminfo(content: &str) -> Option<f64> {
    let total = meminfo_kb(content, "MemTotal")?;
    let available = meminfo_kb(content, "MemAvailable")?;
    if total <= 0.0 {
        return None;
    }
    Some(((total - available) / total * 100.0).clamp(0.0, 100.0))
}

/// One-minute load as a percent of `cpus` from `/proc/loadavg` content
pub fn parse_loadavg(content: &str, cpus: usize) -> Option<f64> {
    let load: f64 = content.split_whitespace().next()?.parse().ok()?;
    Some(load / cpus.max(1) as f64 * 100.0)
}

#[async_trait]
impl ResourceProbe for ProcfsProbe {
    async fn sample(&self) -> ResourceSample {
        let memory_percent = self.read("meminfo").await.as_deref().and_then(parse_meminfo);
        let cpu_percent = self
            .read("loadavg")
            .await
            .as_deref()
            .and_then(|c| parse_loadavg(c, self.cpus));

        ResourceSample {
            memory_percent,
            cpu_percent,
            disk_percent: None,
        }
    }
}
