use parking_lot::Mutex;
use std::path::Path;
use std::time::Duration;
use sysinfo::{Disks, ProcessesToUpdate, System};

/// Point sample of utilisation, all in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceUsage {
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub disk_percent: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

/// Read-only view of the local machine.
pub trait SystemProbe: Send + Sync {
    /// CPU/RAM/disk utilisation. Blocks for `cpu_sample` to measure a CPU rate.
    fn usage(&self, cpu_sample: Duration) -> Result<ResourceUsage, String>;

    /// Every process visible to this user, ordered by pid.
    fn processes(&self) -> Result<Vec<ProcessEntry>, String>;

    /// One-line OS description, e.g. `Linux-6.8.0-x86_64 (Ubuntu 24.04)`.
    fn os_descriptor(&self) -> String;
}

/// `SystemProbe` on top of `sysinfo`.
pub struct SysinfoProbe {
    sys: Mutex<System>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for SysinfoProbe {
    fn usage(&self, cpu_sample: Duration) -> Result<ResourceUsage, String> {
        let mut sys = self.sys.lock();

        // CPU usage is a rate: two refreshes with a gap in between.
        sys.refresh_cpu_usage();
        std::thread::sleep(cpu_sample.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let cpu_percent = sys.global_cpu_usage();
        let ram_percent = percent(sys.used_memory(), sys.total_memory())
            .ok_or_else(|| "total memory reported as zero".to_string())?;
        drop(sys);

        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"));
        let (used, total) = match root {
            Some(d) => (d.total_space().saturating_sub(d.available_space()), d.total_space()),
            None => disks.list().iter().fold((0u64, 0u64), |(used, total), d| {
                (
                    used + d.total_space().saturating_sub(d.available_space()),
                    total + d.total_space(),
                )
            }),
        };
        let disk_percent =
            percent(used, total).ok_or_else(|| "no disks with a known size".to_string())?;

        tracing::debug!(
            "Resource sample: CPU {cpu_percent:.1}%, RAM {ram_percent:.1}%, disk {disk_percent:.1}%"
        );

        Ok(ResourceUsage {
            cpu_percent,
            ram_percent,
            disk_percent,
        })
    }

    fn processes(&self) -> Result<Vec<ProcessEntry>, String> {
        let mut sys = self.sys.lock();
        sys.refresh_processes(ProcessesToUpdate::All, true);

        let mut processes: Vec<ProcessEntry> = sys
            .processes()
            .values()
            .map(|p| ProcessEntry {
                pid: p.pid().as_u32(),
                name: p.name().to_string_lossy().to_string(),
            })
            .collect();
        processes.sort_by_key(|p| p.pid);

        if processes.is_empty() {
            return Err("process table is empty or unreadable".into());
        }
        tracing::debug!("Enumerated {} processes", processes.len());
        Ok(processes)
    }

    fn os_descriptor(&self) -> String {
        let name = System::name().unwrap_or_else(|| std::env::consts::OS.to_string());
        let kernel = System::kernel_version().unwrap_or_else(|| "unknown".into());
        let mut descriptor = format!("{name}-{kernel}-{}", std::env::consts::ARCH);
        if let Some(long) = System::long_os_version() {
            descriptor.push_str(&format!(" ({long})"));
        }
        descriptor
    }
}

fn percent(used: u64, total: u64) -> Option<f32> {
    if total == 0 {
        return None;
    }
    Some((used as f64 / total as f64 * 100.0) as f32)
}
