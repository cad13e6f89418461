//! Assembly of the scheduler sources into one job record.
//!
//! Accounting rows seed the job and its steps; the queue snapshot and the
//! live-stats feed overlay them. Which source wins a contested field is
//! keyed on job state, not on which source happens to be present.

use chrono::{DateTime, Utc};
use jobscope_parsers::{
    MemRequest, expand_nodelist, non_empty_string, parse_duration, parse_mem_bytes,
    parse_mem_request, parse_timestamp, parse_tres, tres_bytes, tres_count,
};
use jobscope_slurm::{AcctRecord, JobState, LiveRecord, QueueSnapshot, StepId};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("job {0} not found in accounting history")]
    NotFound(String),
}

/// A peak resource figure and where it was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peak {
    pub bytes: u64,
    pub node: Option<String>,
    pub task: Option<String>,
}

/// One execution unit within the job: the batch script, the extern step or
/// a user-launched step. Steps share the job's wall-clock window but carry
/// their own resource counters.
#[derive(Debug, Clone)]
pub struct Step {
    pub id: StepId,
    pub name: Option<String>,
    pub total_cpu: Option<Duration>,
    pub user_cpu: Option<Duration>,
    pub system_cpu: Option<Duration>,
    pub max_rss: Option<Peak>,
    pub max_disk_read: Option<Peak>,
    pub max_disk_write: Option<Peak>,
    /// Per-resource usage totals as reported (fs/disk, energy, ...).
    pub tres_in: BTreeMap<String, String>,
    pub tres_out: BTreeMap<String, String>,
}

impl Step {
    fn empty(id: StepId) -> Step {
        Step {
            id,
            name: None,
            total_cpu: None,
            user_cpu: None,
            system_cpu: None,
            max_rss: None,
            max_disk_read: None,
            max_disk_write: None,
            tres_in: BTreeMap::new(),
            tres_out: BTreeMap::new(),
        }
    }
}

/// One scheduler job with its steps, as far as the sources could tell.
///
/// Every field an individual source failed to deliver stays None; nothing
/// here coerces "no data" into zero.
#[derive(Debug, Clone)]
pub struct Job {
    /// Display id, may carry an array-task suffix ("1234_7").
    pub id: String,
    pub name: Option<String>,
    pub user: Option<String>,
    pub partition: Option<String>,
    pub state: JobState,
    pub submit: Option<DateTime<Utc>>,
    pub start: Option<DateTime<Utc>>,
    /// Absent while the job is still running.
    pub end: Option<DateTime<Utc>>,
    pub time_limit: Option<Duration>,
    pub elapsed: Option<Duration>,
    pub total_cpu: Option<Duration>,
    pub user_cpu: Option<Duration>,
    pub system_cpu: Option<Duration>,
    pub req_mem: Option<MemRequest>,
    /// Node list exactly as reported, compressed.
    pub nodelist: Option<String>,
    /// The compressed list expanded to individual names.
    pub nodes: Vec<String>,
    pub n_nodes: Option<u32>,
    pub alloc_cpus: Option<u32>,
    pub n_tasks: Option<u32>,
    /// Accelerators allocated to the job, from the TRES counters.
    pub gpus: Option<u64>,
    pub dependencies: Option<String>,
    pub reason: Option<String>,
    pub comment: Option<String>,
    pub steps: Vec<Step>,
}

impl Job {
    /// Highest peak resident memory across steps.
    pub fn peak_rss(&self) -> Option<&Peak> {
        self.steps
            .iter()
            .filter_map(|s| s.max_rss.as_ref())
            .max_by_key(|p| p.bytes)
    }

    pub fn peak_disk_read(&self) -> Option<&Peak> {
        self.steps
            .iter()
            .filter_map(|s| s.max_disk_read.as_ref())
            .max_by_key(|p| p.bytes)
    }

    pub fn peak_disk_write(&self) -> Option<&Peak> {
        self.steps
            .iter()
            .filter_map(|s| s.max_disk_write.as_ref())
            .max_by_key(|p| p.bytes)
    }

    /// Total bytes read across steps per the TRES counters.
    pub fn disk_read_total(&self) -> Option<u64> {
        sum_tres(self.steps.iter().map(|s| &s.tres_in))
    }

    /// Total bytes written across steps per the TRES counters.
    pub fn disk_write_total(&self) -> Option<u64> {
        sum_tres(self.steps.iter().map(|s| &s.tres_out))
    }

    /// Requested memory scaled to a job-wide total, using the divisor the
    /// request's basis calls for.
    pub fn requested_mem_total(&self) -> Option<u64> {
        let req = self.req_mem?;
        let factor = match req.basis {
            jobscope_parsers::MemBasis::PerNode => self.n_nodes? as u64,
            jobscope_parsers::MemBasis::PerTask => self.n_tasks.or(self.alloc_cpus)? as u64,
        };
        Some(req.bytes * factor)
    }
}

fn sum_tres<'a>(maps: impl Iterator<Item = &'a BTreeMap<String, String>>) -> Option<u64> {
    let mut total = None;
    for map in maps {
        if let Some(bytes) = tres_bytes(map, "fs/disk") {
            *total.get_or_insert(0) += bytes;
        }
    }
    total
}

/// Merge the sources for one job id into a [`Job`].
///
/// Accounting rows are grouped by step suffix: the suffix-less row seeds
/// the job, suffixed rows become steps. The queue snapshot contributes the
/// dependency spec and reason. Live-stats rows overlay steps under the
/// state precedence rule: while the job is RUNNING the live figures win
/// (accounting lags mid-flight); afterwards accounting is authoritative.
pub fn build_job(
    job_id: &str,
    acct: Vec<AcctRecord>,
    live: Vec<LiveRecord>,
    queue: Option<QueueSnapshot>,
) -> Result<Job, BuildError> {
    if acct.is_empty() {
        return Err(BuildError::NotFound(job_id.to_string()));
    }

    let job_row = acct.iter().find(|r| r.step.is_none());
    let mut job = match job_row {
        Some(row) => job_from_record(job_id, row),
        None => {
            tracing::warn!(job_id, "accounting returned step rows but no job-level row");
            empty_job(job_id)
        }
    };

    for record in &acct {
        if let Some(id) = record.step.clone() {
            job.steps.push(step_from_record(id, record));
        }
    }

    overlay_live(&mut job.steps, live, job.state.is_running());

    if let Some(snapshot) = queue {
        job.dependencies = snapshot.dependencies.or(job.dependencies.take());
        job.reason = snapshot.reason.or(job.reason.take());
    }

    check_invariants(&job);
    Ok(job)
}

fn job_from_record(job_id: &str, rec: &AcctRecord) -> Job {
    let nodelist = rec.get("NodeList").and_then(non_empty_string);
    let nodes = nodelist
        .as_deref()
        .map(expand_nodelist)
        .unwrap_or_default();
    let alloc_tres = rec.get("AllocTRES").map(parse_tres).unwrap_or_default();

    Job {
        id: job_id.to_string(),
        name: rec.get("JobName").and_then(non_empty_string),
        user: rec.get("User").and_then(non_empty_string),
        partition: rec.get("Partition").and_then(non_empty_string),
        state: rec
            .get("State")
            .map(JobState::parse)
            .unwrap_or(JobState::Unknown(String::new())),
        submit: rec.get("Submit").and_then(parse_timestamp),
        start: rec.get("Start").and_then(parse_timestamp),
        end: rec.get("End").and_then(parse_timestamp),
        time_limit: rec.get("Timelimit").and_then(parse_duration),
        elapsed: rec.get("Elapsed").and_then(parse_duration),
        total_cpu: rec.get("TotalCPU").and_then(parse_duration),
        user_cpu: rec.get("UserCPU").and_then(parse_duration),
        system_cpu: rec.get("SystemCPU").and_then(parse_duration),
        req_mem: rec.get("ReqMem").and_then(parse_mem_request),
        nodelist,
        nodes,
        n_nodes: rec.get("NNodes").and_then(|v| v.parse().ok()),
        alloc_cpus: rec.get("AllocCPUS").and_then(|v| v.parse().ok()),
        n_tasks: rec.get("NTasks").and_then(|v| v.parse().ok()),
        gpus: tres_count(&alloc_tres, "gres/gpu"),
        dependencies: None,
        reason: None,
        comment: rec.get("Comment").and_then(non_empty_string),
        steps: Vec::new(),
    }
}

fn empty_job(job_id: &str) -> Job {
    Job {
        id: job_id.to_string(),
        name: None,
        user: None,
        partition: None,
        state: JobState::Unknown(String::new()),
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
    }
}

fn step_from_record(id: StepId, rec: &AcctRecord) -> Step {
    Step {
        id,
        name: rec.get("JobName").and_then(non_empty_string),
        total_cpu: rec.get("TotalCPU").and_then(parse_duration),
        user_cpu: rec.get("UserCPU").and_then(parse_duration),
        system_cpu: rec.get("SystemCPU").and_then(parse_duration),
        max_rss: peak_from(|k| rec.get(k), "MaxRSS", "MaxRSSNode", "MaxRSSTask"),
        max_disk_read: peak_from(
            |k| rec.get(k),
            "MaxDiskRead",
            "MaxDiskReadNode",
            "MaxDiskReadTask",
        ),
        max_disk_write: peak_from(
            |k| rec.get(k),
            "MaxDiskWrite",
            "MaxDiskWriteNode",
            "MaxDiskWriteTask",
        ),
        tres_in: rec.get("TRESUsageInTot").map(parse_tres).unwrap_or_default(),
        tres_out: rec
            .get("TRESUsageOutTot")
            .map(parse_tres)
            .unwrap_or_default(),
    }
}

fn peak_from<'a>(
    get: impl Fn(&str) -> Option<&'a str>,
    value_key: &str,
    node_key: &str,
    task_key: &str,
) -> Option<Peak> {
    let bytes = parse_mem_bytes(get(value_key)?)?;
    Some(Peak {
        bytes,
        node: get(node_key).and_then(non_empty_string),
        task: get(task_key).and_then(non_empty_string),
    })
}

/// Overlay live-stats rows onto the accounting steps.
///
/// `live_wins` is true while the job is RUNNING: only the live feed sees an
/// in-progress process's real-time counters. Once the job has finished the
/// accounting figures take precedence and live data only fills gaps.
fn overlay_live(steps: &mut Vec<Step>, live: Vec<LiveRecord>, live_wins: bool) {
    for rec in live {
        let Some(id) = rec.step.clone() else {
            continue;
        };

        let step = match steps.iter_mut().position(|s| s.id == id) {
            Some(pos) => &mut steps[pos],
            None => {
                steps.push(Step::empty(id));
                steps.last_mut().expect("just pushed")
            }
        };

        merge_peak(
            &mut step.max_rss,
            peak_from(|k| rec.get(k), "MaxRSS", "MaxRSSNode", "MaxRSSTask"),
            live_wins,
        );
        merge_peak(
            &mut step.max_disk_read,
            peak_from(
                |k| rec.get(k),
                "MaxDiskRead",
                "MaxDiskReadNode",
                "MaxDiskReadTask",
            ),
            live_wins,
        );
        merge_peak(
            &mut step.max_disk_write,
            peak_from(
                |k| rec.get(k),
                "MaxDiskWrite",
                "MaxDiskWriteNode",
                "MaxDiskWriteTask",
            ),
            live_wins,
        );

        let tres_in = rec.get("TRESUsageInTot").map(parse_tres).unwrap_or_default();
        let tres_out = rec
            .get("TRESUsageOutTot")
            .map(parse_tres)
            .unwrap_or_default();
        if !tres_in.is_empty() && (live_wins || step.tres_in.is_empty()) {
            step.tres_in = tres_in;
        }
        if !tres_out.is_empty() && (live_wins || step.tres_out.is_empty()) {
            step.tres_out = tres_out;
        }
    }
}

fn merge_peak(current: &mut Option<Peak>, incoming: Option<Peak>, live_wins: bool) {
    if incoming.is_some() && (live_wins || current.is_none()) {
        *current = incoming;
    }
}

fn check_invariants(job: &Job) {
    if let (Some(start), Some(end)) = (job.start, job.end) {
        if start > end {
            tracing::warn!(job_id = %job.id, %start, %end, "start after end in accounting data");
        }
    }
    if let Some(n) = job.n_nodes {
        if !job.nodes.is_empty() && job.nodes.len() != n as usize {
            tracing::warn!(
                job_id = %job.id,
                reported = n,
                expanded = job.nodes.len(),
                "node count does not match expanded node list"
            );
        }
    }
}
