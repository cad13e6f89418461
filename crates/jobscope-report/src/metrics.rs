//! Derived efficiency metrics.
//!
//! Every metric is recomputed fresh for the report and is `None` whenever
//! an input is unavailable or a divisor would be zero. "No data" never
//! reads as "no usage".

use crate::model::Job;
use jobscope_gpu::{DeviceId, DeviceSeries, overall_utilization};

/// Utilization of the job's accelerators over its time window.
#[derive(Debug, Clone)]
pub struct GpuUtilization {
    /// Mean utilization percent per device; None for devices without samples.
    pub per_device: Vec<(DeviceId, Option<f64>)>,
    /// Mean across devices that had samples.
    pub overall: Option<f64>,
}

/// The ratios the hints and the report are based on.
#[derive(Debug, Clone, Default)]
pub struct EfficiencyMetrics {
    /// Used CPU time over allocated CPU time, 0..=1.
    pub cpu_efficiency: Option<f64>,
    /// Peak resident memory over the requested memory, on the request's basis.
    pub mem_efficiency: Option<f64>,
    /// Elapsed wall time over the requested time limit.
    pub time_limit_ratio: Option<f64>,
    pub gpu_utilization: Option<GpuUtilization>,
}

/// Compute all metrics for one job.
///
/// `gpu_series` is the already-fetched utilization feed output; None when
/// the job requested no accelerators or the feed was unreachable.
pub fn compute_metrics(job: &Job, gpu_series: Option<&[DeviceSeries]>) -> EfficiencyMetrics {
    EfficiencyMetrics {
        cpu_efficiency: cpu_efficiency(job),
        mem_efficiency: mem_efficiency(job),
        time_limit_ratio: time_limit_ratio(job),
        gpu_utilization: gpu_series.map(gpu_utilization),
    }
}

fn cpu_efficiency(job: &Job) -> Option<f64> {
    let total_cpu = job.total_cpu?.as_secs_f64();
    let elapsed = job.elapsed?.as_secs_f64();
    let cpus = job.alloc_cpus?;
    if elapsed <= 0.0 || cpus == 0 {
        return None;
    }
    Some(total_cpu / (elapsed * cpus as f64))
}

fn mem_efficiency(job: &Job) -> Option<f64> {
    let req = job.req_mem?;
    if req.bytes == 0 {
        return None;
    }
    // The request basis and the peak agree: a per-node request compares
    // against the largest per-node residency, a per-task request against
    // the per-task peak.
    let peak = job.peak_rss()?;
    Some(peak.bytes as f64 / req.bytes as f64)
}

fn time_limit_ratio(job: &Job) -> Option<f64> {
    let elapsed = job.elapsed?.as_secs_f64();
    let limit = job.time_limit?.as_secs_f64();
    if limit <= 0.0 {
        return None;
    }
    Some(elapsed / limit)
}

fn gpu_utilization(series: &[DeviceSeries]) -> GpuUtilization {
    GpuUtilization {
        per_device: series
            .iter()
            .map(|s| (s.device.clone(), s.mean_utilization()))
            .collect(),
        overall: overall_utilization(series),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Peak, Step};
    use jobscope_parsers::{MemBasis, MemRequest};
    use jobscope_slurm::{JobState, StepId};
    use std::time::Duration;

    fn job_with(f: impl FnOnce(&mut Job)) -> Job {
        let mut job = Job {
            id: "123".to_string(),
            name: None,
            user: None,
            partition: None,
            state: JobState::Completed,
            submit: None,
            start: None,
            end: None,
            time_limit: None,
            elapsed: None,
            total_cpu: None,
            user_cpu: None,
            system_cpu: None,
            req_mem: None,
            nodelist: None,
            nodes: Vec::new(),
            n_nodes: None,
            alloc_cpus: None,
            n_tasks: None,
            gpus: None,
            dependencies: None,
            reason: None,
            comment: None,
            steps: Vec::new(),
        };
        f(&mut job);
        job
    }

    fn step_with_rss(bytes: u64) -> Step {
        let mut step = Step {
            id: StepId::Batch,
            name: None,
            total_cpu: None,
            user_cpu: None,
            system_cpu: None,
            max_rss: None,
            max_disk_read: None,
            max_disk_write: None,
            tres_in: Default::default(),
            tres_out: Default::default(),
        };
        step.max_rss = Some(Peak {
            bytes,
            node: None,
            task: None,
        });
        step
    }

    #[test]
    fn test_cpu_efficiency_fifteen_percent() {
        // 180s of CPU over 2 cores for 10 minutes
        let job = job_with(|j| {
            j.total_cpu = Some(Duration::from_secs(180));
            j.elapsed = Some(Duration::from_secs(600));
            j.alloc_cpus = Some(2);
        });
        let eff = compute_metrics(&job, None).cpu_efficiency.unwrap();
        assert!((eff - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_efficiency_undefined_without_elapsed() {
        // A job that never started computes nothing and must not divide.
        let job = job_with(|j| {
            j.state = JobState::Running;
            j.total_cpu = Some(Duration::ZERO);
            j.elapsed = Some(Duration::ZERO);
            j.alloc_cpus = Some(4);
        });
        assert!(compute_metrics(&job, None).cpu_efficiency.is_none());
    }

    #[test]
    fn test_cpu_efficiency_undefined_without_allocation() {
        let job = job_with(|j| {
            j.total_cpu = Some(Duration::from_secs(60));
            j.elapsed = Some(Duration::from_secs(600));
            j.alloc_cpus = Some(0);
        });
        assert!(compute_metrics(&job, None).cpu_efficiency.is_none());
    }

    #[test]
    fn test_mem_efficiency_against_per_node_request() {
        // 1 GiB per node requested, 950 MiB peak observed
        let job = job_with(|j| {
            j.req_mem = Some(MemRequest {
                bytes: 1 << 30,
                basis: MemBasis::PerNode,
            });
            j.n_nodes = Some(1);
            j.steps.push(step_with_rss(950 << 20));
        });
        let eff = compute_metrics(&job, None).mem_efficiency.unwrap();
        assert!((eff - 0.9277).abs() < 1e-3);
    }

    #[test]
    fn test_mem_efficiency_tiny_usage() {
        let job = job_with(|j| {
            j.req_mem = Some(MemRequest {
                bytes: 8 << 30,
                basis: MemBasis::PerNode,
            });
            j.steps.push(step_with_rss(100 << 20));
        });
        let eff = compute_metrics(&job, None).mem_efficiency.unwrap();
        assert!((eff - 0.0122).abs() < 1e-3);
    }

    #[test]
    fn test_mem_efficiency_undefined_without_peak() {
        let job = job_with(|j| {
            j.req_mem = Some(MemRequest {
                bytes: 1 << 30,
                basis: MemBasis::PerNode,
            });
        });
        assert!(compute_metrics(&job, None).mem_efficiency.is_none());
    }

    #[test]
    fn test_time_limit_ratio() {
        let job = job_with(|j| {
            j.elapsed = Some(Duration::from_secs(600));
            j.time_limit = Some(Duration::from_secs(3600));
        });
        let ratio = compute_metrics(&job, None).time_limit_ratio.unwrap();
        assert!((ratio - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_gpu_utilization_reduction() {
        let series = vec![
            DeviceSeries {
                device: DeviceId {
                    node: "n1".to_string(),
                    index: 0,
                },
                samples: vec![(0.0, 50.0), (60.0, 100.0)],
            },
            DeviceSeries {
                device: DeviceId {
                    node: "n1".to_string(),
                    index: 1,
                },
                samples: vec![(0.0, 25.0)],
            },
        ];
        let gpu = compute_metrics(&job_with(|_| {}), Some(&series))
            .gpu_utilization
            .unwrap();
        assert_eq!(gpu.per_device[0].1, Some(75.0));
        assert_eq!(gpu.per_device[1].1, Some(25.0));
        assert_eq!(gpu.overall, Some(50.0));
    }
}
