//! Scheduler-facing types: job state, step identity, node description.

/// Job state as reported by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    /// Cancelled, optionally recording who cancelled it ("CANCELLED by 1234").
    Cancelled { by: Option<String> },
    Timeout,
    OutOfMemory,
    NodeFail,
    Unknown(String),
}

impl JobState {
    /// Parse a raw state field. Only the leading word carries the state;
    /// suffixes like "by 1234" qualify it.
    pub fn parse(raw: &str) -> JobState {
        let base = raw.split_whitespace().next().unwrap_or(raw);
        match base.to_uppercase().as_str() {
            "PENDING" => JobState::Pending,
            "RUNNING" => JobState::Running,
            "COMPLETED" => JobState::Completed,
            "FAILED" => JobState::Failed,
            "CANCELLED" => {
                let by = raw
                    .split_once("by ")
                    .map(|(_, who)| who.trim().to_string())
                    .filter(|who| !who.is_empty());
                JobState::Cancelled { by }
            }
            "TIMEOUT" => JobState::Timeout,
            "OUT_OF_MEMORY" => JobState::OutOfMemory,
            "NODE_FAIL" => JobState::NodeFail,
            other => JobState::Unknown(other.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, JobState::Pending)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running)
    }

    /// True once the scheduler will no longer update the job's accounting.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobState::Completed
                | JobState::Failed
                | JobState::Cancelled { .. }
                | JobState::Timeout
                | JobState::OutOfMemory
                | JobState::NodeFail
        )
    }

    /// The scheduler's upper-case name for this state.
    pub fn as_str(&self) -> &str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
            JobState::Cancelled { .. } => "CANCELLED",
            JobState::Timeout => "TIMEOUT",
            JobState::OutOfMemory => "OUT_OF_MEMORY",
            JobState::NodeFail => "NODE_FAIL",
            JobState::Unknown(s) => s,
        }
    }
}

/// Identity of one execution unit within a job.
///
/// Accounting and live-stats rows carry a `.suffix` on the job id: the
/// implicit batch script, the implicit extern step, or a numbered
/// user-launched step.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum StepId {
    Batch,
    Extern,
    Numbered(u32),
    Named(String),
}

impl StepId {
    pub fn parse(suffix: &str) -> StepId {
        match suffix {
            "batch" => StepId::Batch,
            "extern" => StepId::Extern,
            other => match other.parse::<u32>() {
                Ok(n) => StepId::Numbered(n),
                Err(_) => StepId::Named(other.to_string()),
            },
        }
    }

    pub fn label(&self) -> String {
        match self {
            StepId::Batch => "batch".to_string(),
            StepId::Extern => "extern".to_string(),
            StepId::Numbered(n) => n.to_string(),
            StepId::Named(s) => s.clone(),
        }
    }
}

/// Split a row id ("123_4.batch") into its job part and step suffix.
pub fn split_row_id(raw: &str) -> (&str, Option<StepId>) {
    match raw.split_once('.') {
        Some((base, suffix)) => (base, Some(StepId::parse(suffix))),
        None => (raw, None),
    }
}

/// Description of one compute node, from the node-description source.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub name: String,
    pub cpus_total: Option<u32>,
    pub cpus_alloc: Option<u32>,
    /// Installed memory in bytes.
    pub real_memory: Option<u64>,
    /// Memory currently allocated to jobs, in bytes.
    pub alloc_memory: Option<u64>,
    pub state: Option<String>,
}
