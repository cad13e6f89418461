//! Diagnostic hint selection.
//!
//! Fixed threshold rules map the computed metrics to zero or more
//! messages. Selection is independent per metric, ordered CPU first, and
//! an undefined metric never fires.

use crate::metrics::EfficiencyMetrics;
use crate::model::Job;
use jobscope_slurm::NodeInfo;

/// Tunable thresholds for hint selection.
#[derive(Debug, Clone, Copy)]
pub struct HintThresholds {
    /// CPU efficiency below this fires a hint at all.
    pub cpu_low: f64,
    /// CPU efficiency below this reads as pathological.
    pub cpu_very_low: f64,
    /// Memory efficiency below this suggests the request was oversized.
    pub mem_overrequest: f64,
}

impl Default for HintThresholds {
    fn default() -> Self {
        Self {
            cpu_low: 0.75,
            cpu_very_low: 0.25,
            mem_overrequest: 0.5,
        }
    }
}

/// One diagnostic message for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// Cores were busy yet efficiency is low: likely I/O bound.
    CheckIoPattern,
    /// Cores sat idle and efficiency is pathological.
    VeryLowCpuEfficiency,
    /// Cores sat idle; the program does not use its allocation.
    IdleAssignedCores,
    /// Far more memory requested than the peak ever reached.
    MemoryOverRequested,
}

impl Hint {
    pub fn message(&self) -> &'static str {
        match self {
            Hint::CheckIoPattern => {
                "The program efficiency is low. \
                 Check the file in- and output pattern of your application."
            }
            Hint::VeryLowCpuEfficiency => "The program efficiency is very low.",
            Hint::IdleAssignedCores => {
                "The program efficiency is low. \
                 Your program is not using the assigned cores."
            }
            Hint::MemoryOverRequested => {
                "You requested much more memory than your program used."
            }
        }
    }
}

/// Select the hints for one job, CPU rule first, then memory.
pub fn select_hints(
    job: &Job,
    metrics: &EfficiencyMetrics,
    nodes: &[NodeInfo],
    thresholds: &HintThresholds,
) -> Vec<Hint> {
    let mut hints = Vec::new();
    if let Some(hint) = cpu_hint(job, metrics, thresholds) {
        hints.push(hint);
    }
    if let Some(hint) = memory_hint(job, metrics, nodes, thresholds) {
        hints.push(hint);
    }
    hints
}

fn cpu_hint(job: &Job, metrics: &EfficiencyMetrics, t: &HintThresholds) -> Option<Hint> {
    let eff = metrics.cpu_efficiency?;
    if eff >= t.cpu_low {
        return None;
    }

    // Unknown node count defaults to idle: the severity-based messages are
    // the safer guess when the I/O heuristic cannot be evaluated.
    let idle = cores_sat_idle(job).unwrap_or(true);
    if !idle {
        Some(Hint::CheckIoPattern)
    } else if eff < t.cpu_very_low {
        Some(Hint::VeryLowCpuEfficiency)
    } else {
        Some(Hint::IdleAssignedCores)
    }
}

/// Whether the job kept less than one core per node busy.
///
/// Used CPU-seconds below the job's node-seconds (nodes x elapsed) means
/// even a single continuously-busy core per node was not reached; the
/// cores sat idle. At or above it the cores were working, so low
/// efficiency points at an I/O pattern instead.
fn cores_sat_idle(job: &Job) -> Option<bool> {
    let total_cpu = job.total_cpu?.as_secs_f64();
    let elapsed = job.elapsed?.as_secs_f64();
    let n_nodes = job.n_nodes?;
    if n_nodes == 0 {
        return None;
    }
    Some(total_cpu < n_nodes as f64 * elapsed)
}

fn memory_hint(
    job: &Job,
    metrics: &EfficiencyMetrics,
    nodes: &[NodeInfo],
    t: &HintThresholds,
) -> Option<Hint> {
    let eff = metrics.mem_efficiency?;
    if eff >= t.mem_overrequest {
        return None;
    }

    // Requesting less memory only frees anything if the job shared its
    // nodes. Without a resolved node description there is nothing to
    // compare against, so the hint stays silent.
    let cpus = job.alloc_cpus?;
    let n_nodes = job.n_nodes.filter(|n| *n > 0)?;
    let cpus_per_node = cpus.div_ceil(n_nodes);

    let shared_node = nodes.iter().any(|node| {
        node.cpus_total
            .is_some_and(|total| cpus_per_node < total)
    });

    shared_node.then_some(Hint::MemoryOverRequested)
}
