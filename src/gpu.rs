//! Best-effort GPU memory reporting through `nvidia-smi`.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

const NVIDIA_SMI: &str = "nvidia-smi";

/// Memory figures for one device, in MiB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuMemory {
    pub index: usize,
    pub used_mib: u64,
    pub total_mib: u64,
}

/// Parse `nvidia-smi --query-gpu=memory.used,memory.total --format=csv,noheader,nounits`
///
/// Malformed lines are skipped.
pub fn parse_memory_report(report: &str) -> Vec<GpuMemory> {
    report
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split(',').map(str::trim);
            let used = fields.next()?.parse().ok()?;
            let total = fields.next()?.parse().ok()?;
            Some((used, total))
        })
        .enumerate()
        .map(|(index, (used_mib, total_mib))| GpuMemory {
            index,
            used_mib,
            total_mib,
        })
        .collect()
}

/// Query current usage; `None` without a working `nvidia-smi`
pub async fn query_memory() -> Option<Vec<GpuMemory>> {
    let output = Command::new(NVIDIA_SMI)
        .args(["--query-gpu=memory.used,memory.total", "--format=csv,noheader,nounits"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    Some(parse_memory_report(&String::from_utf8_lossy(&output.stdout)))
}

/// Log `"{prefix} VRAM used: X MiB / Y MiB"` per device
pub async fn log_memory_usage(prefix: &str) {
    match query_memory().await {
        Some(devices) => {
            for gpu in devices {
                let label = if gpu.index == 0 {
                    String::new()
                } else {
                    format!(" [GPU {}]", gpu.index)
                };
                info!("{}{} VRAM used: {} MiB / {} MiB", prefix, label, gpu.used_mib, gpu.total_mib);
            }
        }
        None => debug!("{} VRAM usage unavailable", prefix),
    }
}
