//! CPU and memory sampling from the kernel's process-statistics
//! pseudofiles (`/proc/stat`, `/proc/meminfo`).

use std::sync::Mutex;

use tokio::fs;

#[derive(Debug, Clone, Copy, Default)]
struct CpuSample {
    idle_with_iowait: u64,
    total: u64,
}

/// Holds the previous `/proc/stat` sample so CPU% can be derived from a
/// delta between reads. One instance is shared process-wide; the first
/// call always reports 0.
pub struct CpuSampler {
    previous: Mutex<Option<CpuSample>>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self {
            previous: Mutex::new(None),
        }
    }

    pub async fn sample(&self) -> f64 {
        let current = match read_cpu_sample().await {
            Ok(sample) => sample,
            Err(_) => return 0.0,
        };

        let mut previous = self.previous.lock().unwrap();
        let cpu_percent = match *previous {
            None => 0.0,
            Some(prev) => cpu_percent_from_delta(prev, current),
        };
        *previous = Some(current);
        cpu_percent
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

fn cpu_percent_from_delta(prev: CpuSample, current: CpuSample) -> f64 {
    let delta_total = current.total.saturating_sub(prev.total);
    if delta_total == 0 {
        return 0.0;
    }

    let delta_idle = current
        .idle_with_iowait
        .saturating_sub(prev.idle_with_iowait);
    let pct = 100.0 * (1.0 - delta_idle as f64 / delta_total as f64);

    if pct.is_finite() && pct > 0.0 {
        pct
    } else {
        0.0
    }
}

async fn read_cpu_sample() -> std::io::Result<CpuSample> {
    let content = fs::read_to_string("/proc/stat").await?;
    parse_cpu_line(&content).ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "missing cpu line in /proc/stat")
    })
}

fn parse_cpu_line(stat: &str) -> Option<CpuSample> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    // user nice system idle iowait irq softirq steal [guest] [guest_nice]
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|f| f.parse().ok())
        .collect();

    let idle = *fields.get(3)?;
    let iowait = fields.get(4).copied().unwrap_or(0);
    // Sum only the 8 fields §4.1 names; kernels append `guest`/`guest_nice`
    // (already double-counted inside `user`/`nice`) which must not inflate
    // the total.
    let total: u64 = fields.iter().take(8).sum();

    Some(CpuSample {
        idle_with_iowait: idle + iowait,
        total,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemorySample {
    pub total_kb: u64,
    pub available_kb: u64,
    pub used_percent: f64,
}

pub async fn sample_memory() -> MemorySample {
    match read_meminfo().await {
        Some((total_kb, available_kb)) => {
            let used_percent = if total_kb == 0 {
                0.0
            } else {
                (100.0 * (1.0 - available_kb as f64 / total_kb as f64)).clamp(0.0, 100.0)
            };
            MemorySample {
                total_kb,
                available_kb,
                used_percent,
            }
        }
        None => MemorySample::default(),
    }
}

async fn read_meminfo() -> Option<(u64, u64)> {
    let content = fs::read_to_string("/proc/meminfo").await.ok()?;
    parse_meminfo(&content)
}

fn parse_meminfo(content: &str) -> Option<(u64, u64)> {
    let mut total = None;
    let mut available = None;

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total = parse_kb_field(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available = parse_kb_field(rest);
        }
    }

    Some((total?, available.unwrap_or(0)))
}

fn parse_kb_field(field: &str) -> Option<u64> {
    field.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_percent_zero_on_empty_delta() {
        let sample = CpuSample {
            idle_with_iowait: 100,
            total: 1000,
        };
        assert_eq!(cpu_percent_from_delta(sample, sample), 0.0);
    }

    #[test]
    fn cpu_percent_reflects_busier_window() {
        let prev = CpuSample {
            idle_with_iowait: 100,
            total: 1000,
        };
        let current = CpuSample {
            idle_with_iowait: 120,
            total: 1200,
        };
        // delta_total=200, delta_idle=20 -> 100 * (1 - 20/200) = 90
        assert!((cpu_percent_from_delta(prev, current) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn parses_proc_stat_cpu_line() {
        let stat = "cpu  100 0 200 600 50 0 0 0 0 0\ncpu0 50 0 100 300 25 0 0 0 0 0\n";
        let sample = parse_cpu_line(stat).unwrap();
        assert_eq!(sample.idle_with_iowait, 600 + 50);
        assert_eq!(sample.total, 100 + 200 + 600 + 50);
    }

    #[test]
    fn parses_meminfo() {
        let meminfo = "MemTotal:        1000 kB\nMemFree:          200 kB\nMemAvailable:     400 kB\n";
        let (total, available) = parse_meminfo(meminfo).unwrap();
        assert_eq!(total, 1000);
        assert_eq!(available, 400);
    }

    #[test]
    fn memory_percent_zero_when_total_zero() {
        let sample = MemorySample {
            total_kb: 0,
            available_kb: 0,
            used_percent: 0.0,
        };
        assert_eq!(sample.used_percent, 0.0);
    }
}
