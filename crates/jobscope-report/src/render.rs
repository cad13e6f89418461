//! Plain-text rendering of the assembled report.
//!
//! Aligned `Label : value` lines in the style of the scheduler's own
//! tools; `--` marks values no source could provide.

use crate::hints::{Hint, HintThresholds};
use crate::metrics::EfficiencyMetrics;
use crate::model::{Job, Peak};
use chrono::{DateTime, Utc};
use jobscope_parsers::{MemBasis, format_duration_hms, format_mem};
use std::fmt::Write;
use std::time::Duration;

/// Report-wide configuration, threaded in from the command line.
#[derive(Debug, Clone, Default)]
pub struct ReportConfig {
    /// Include per-step detail, the CPU time split and disk figures.
    pub long_output: bool,
    pub thresholds: HintThresholds,
}

const LABEL_WIDTH: usize = 21;
const UNAVAILABLE: &str = "--";

/// Render the report for one job.
pub fn render_report(
    job: &Job,
    metrics: &EfficiencyMetrics,
    hints: &[Hint],
    config: &ReportConfig,
) -> String {
    let mut out = String::new();

    line(&mut out, "Job ID", &job.id);
    line(&mut out, "Name", opt_str(job.name.as_deref()));
    line(&mut out, "User", opt_str(job.user.as_deref()));
    line(&mut out, "Partition", opt_str(job.partition.as_deref()));
    line(&mut out, "State", job.state.as_str());
    if let Some(reason) = &job.reason {
        line(&mut out, "Reason", reason);
    }
    if let Some(deps) = &job.dependencies {
        line(&mut out, "Dependencies", deps);
    }
    line(&mut out, "Node list", opt_str(job.nodelist.as_deref()));
    line(&mut out, "Nodes", opt_num(job.n_nodes));
    line(&mut out, "Cores", opt_num(job.alloc_cpus));
    if let Some(tasks) = job.n_tasks {
        line(&mut out, "Tasks", tasks.to_string());
    }
    if let Some(gpus) = job.gpus {
        line(&mut out, "GPUs", gpus.to_string());
    }
    line(&mut out, "Submit time", opt_time(job.submit));
    line(&mut out, "Start time", opt_time(job.start));
    line(&mut out, "End time", opt_time(job.end));
    line(&mut out, "Reserved walltime", opt_dur(job.time_limit));

    let walltime = match metrics.time_limit_ratio {
        Some(ratio) => format!("{} ({})", opt_dur(job.elapsed), percent(ratio)),
        None => opt_dur(job.elapsed),
    };
    line(&mut out, "Used walltime", walltime);

    let cpu_time = match metrics.cpu_efficiency {
        Some(eff) => format!("{} (efficiency {})", opt_dur(job.total_cpu), percent(eff)),
        None => opt_dur(job.total_cpu),
    };
    line(&mut out, "Used CPU time", cpu_time);

    if config.long_output {
        render_cpu_split(&mut out, job);
    }

    line(&mut out, "Memory reserved", mem_reserved(job));

    let mem_used = match (job.peak_rss(), metrics.mem_efficiency) {
        (Some(peak), Some(eff)) => format!("{} (efficiency {})", peak_at(peak), percent(eff)),
        (Some(peak), None) => peak_at(peak),
        _ => UNAVAILABLE.to_string(),
    };
    line(&mut out, "Max memory used", mem_used);

    if config.long_output {
        render_disk(&mut out, job);
        render_steps(&mut out, job);
    }

    render_gpu(&mut out, metrics, config.long_output);

    if let Some(comment) = &job.comment {
        line(&mut out, "Comment", comment);
    }

    if !hints.is_empty() {
        out.push_str("\nHints:\n");
        for hint in hints {
            let _ = writeln!(out, " * {}", hint.message());
        }
    }

    out
}

fn render_cpu_split(out: &mut String, job: &Job) {
    let split = |part: Option<Duration>| -> String {
        match (part, job.total_cpu) {
            (Some(p), Some(total)) if total.as_secs_f64() > 0.0 => {
                format!(
                    "{} ({})",
                    format_duration_hms(p.as_secs()),
                    percent(p.as_secs_f64() / total.as_secs_f64())
                )
            }
            (Some(p), _) => format_duration_hms(p.as_secs()),
            _ => UNAVAILABLE.to_string(),
        }
    };
    line(out, "% User (computation)", split(job.user_cpu));
    line(out, "% System (I/O)", split(job.system_cpu));
}

fn render_disk(out: &mut String, job: &Job) {
    let peak_or_dash = |peak: Option<&Peak>| match peak {
        Some(p) => peak_at(p),
        None => UNAVAILABLE.to_string(),
    };
    line(out, "Max disk read", peak_or_dash(job.peak_disk_read()));
    line(out, "Max disk write", peak_or_dash(job.peak_disk_write()));
    line(out, "Total disk read", opt_bytes(job.disk_read_total()));
    line(out, "Total disk write", opt_bytes(job.disk_write_total()));
}

fn render_steps(out: &mut String, job: &Job) {
    if job.steps.is_empty() {
        return;
    }
    out.push_str("\nSteps:\n");
    for step in &job.steps {
        let rss = match &step.max_rss {
            Some(peak) => format_mem(peak.bytes),
            None => UNAVAILABLE.to_string(),
        };
        let cpu = match step.total_cpu {
            Some(d) => format_duration_hms(d.as_secs()),
            None => UNAVAILABLE.to_string(),
        };
        let _ = writeln!(out, "  {:<8} cpu {:<12} peak rss {}", step.id.label(), cpu, rss);
    }
}

fn render_gpu(out: &mut String, metrics: &EfficiencyMetrics, long_output: bool) {
    let Some(gpu) = &metrics.gpu_utilization else {
        return;
    };

    let overall = match gpu.overall {
        Some(value) => format!("{:.1}%", value),
        None => UNAVAILABLE.to_string(),
    };
    line(out, "GPU utilization", overall);

    if long_output {
        for (device, mean) in &gpu.per_device {
            let value = match mean {
                Some(v) => format!("{:.1}%", v),
                None => UNAVAILABLE.to_string(),
            };
            let _ = writeln!(out, "  {} gpu {:<3} {}", device.node, device.index, value);
        }
    }
}

fn line(out: &mut String, label: &str, value: impl AsRef<str>) {
    let _ = writeln!(out, "{:<width$}: {}", label, value.as_ref(), width = LABEL_WIDTH);
}

fn opt_str(value: Option<&str>) -> String {
    value.unwrap_or(UNAVAILABLE).to_string()
}

fn opt_num(value: Option<u32>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |v| v.to_string())
}

fn opt_time(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || UNAVAILABLE.to_string(),
        |t| t.format("%Y-%m-%dT%H:%M:%S").to_string(),
    )
}

fn opt_dur(value: Option<Duration>) -> String {
    value.map_or_else(
        || UNAVAILABLE.to_string(),
        |d| format_duration_hms(d.as_secs()),
    )
}

fn opt_bytes(value: Option<u64>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), format_mem)
}

fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

fn peak_at(peak: &Peak) -> String {
    match &peak.node {
        Some(node) => format!("{} ({})", format_mem(peak.bytes), node),
        None => format_mem(peak.bytes),
    }
}

fn mem_reserved(job: &Job) -> String {
    let Some(req) = job.req_mem else {
        return UNAVAILABLE.to_string();
    };
    let basis = match req.basis {
        MemBasis::PerNode => "node",
        MemBasis::PerTask => "task",
    };
    match job.requested_mem_total() {
        Some(total) => format!(
            "{} per {} ({} total)",
            format_mem(req.bytes),
            basis,
            format_mem(total)
        ),
        None => format!("{} per {}", format_mem(req.bytes), basis),
    }
}
