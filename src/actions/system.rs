use super::traits::{Action, ActionResult, TextOutput};
use crate::error::ActionError;
use crate::platform::{ProcessEntry, ResourceUsage, SystemProbe};
use crate::protocol::Verb;
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

/// Default CPU sampling window for `/status`.
pub const DEFAULT_STATUS_SAMPLE: Duration = Duration::from_secs(1);

/// `/status <target>`: CPU, RAM and disk utilisation.
pub struct StatusAction {
    probe: Arc<dyn SystemProbe>,
    sample: Duration,
}

impl StatusAction {
    pub fn new(probe: Arc<dyn SystemProbe>, sample: Duration) -> Self {
        Self { probe, sample }
    }
}

#[async_trait]
impl Action for StatusAction {
    fn verb(&self) -> Verb {
        Verb::Status
    }

    fn description(&self) -> &str {
        "Show CPU, RAM, and Disk usage"
    }

    async fn execute(&self, _argument: Option<&str>) -> ActionResult {
        let probe = Arc::clone(&self.probe);
        let sample = self.sample;
        let usage = tokio::task::spawn_blocking(move || probe.usage(sample)).await;

        match usage {
            Ok(Ok(usage)) => ActionResult::text(format_status(&usage)),
            Ok(Err(e)) => ActionResult::failure(ActionError::Probe(e)),
            Err(e) => ActionResult::failure(ActionError::Probe(e.to_string())),
        }
    }
}

pub fn format_status(usage: &ResourceUsage) -> String {
    format!(
        "System Status\nCPU Usage: {:.1}%\nRAM Usage: {:.1}%\nDisk Usage: {:.1}%",
        usage.cpu_percent, usage.ram_percent, usage.disk_percent
    )
}

/// `/processes <target>`: every process as `pid name`.
pub struct ProcessesAction {
    probe: Arc<dyn SystemProbe>,
}

impl ProcessesAction {
    pub fn new(probe: Arc<dyn SystemProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl Action for ProcessesAction {
    fn verb(&self) -> Verb {
        Verb::Processes
    }

    fn description(&self) -> &str {
        "List all running processes"
    }

    async fn execute(&self, _argument: Option<&str>) -> ActionResult {
        let probe = Arc::clone(&self.probe);
        match tokio::task::spawn_blocking(move || probe.processes()).await {
            Ok(Ok(processes)) => ActionResult::Text(
                TextOutput::new(format_processes(&processes))
                    .overflow_as("processes.txt", "Processes"),
            ),
            Ok(Err(e)) => ActionResult::failure(ActionError::Probe(e)),
            Err(e) => ActionResult::failure(ActionError::Probe(e.to_string())),
        }
    }
}

pub const PROCESSES_HEADER: &str = "Running Processes\n\n";

pub fn format_processes(processes: &[ProcessEntry]) -> String {
    let mut out = String::with_capacity(PROCESSES_HEADER.len() + processes.len() * 24);
    out.push_str(PROCESSES_HEADER);
    for (i, p) in processes.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{} {}", p.pid, p.name);
    }
    out
}

/// Inverse of [`format_processes`]; lines that do not start with a pid are skipped.
pub fn parse_processes(listing: &str) -> Vec<ProcessEntry> {
    listing
        .strip_prefix(PROCESSES_HEADER)
        .unwrap_or(listing)
        .lines()
        .filter_map(|line| {
            let (pid, name) = line.split_once(' ')?;
            Some(ProcessEntry {
                pid: pid.parse().ok()?,
                name: name.to_string(),
            })
        })
        .collect()
}
