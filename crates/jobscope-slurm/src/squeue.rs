//! Queue-snapshot source: dependency spec and pending/failure reason.
//!
//! Only pending and running jobs appear in the queue; a finished job yields
//! no line, which is unavailable data rather than an error.

use jobscope_parsers::{SourceError, capture_stdout_lenient, non_empty_string};
use tokio::process::Command;

/// Queue output format:
/// %i - job id
/// %E - dependency spec
/// %R - pending/failure reason or allocated nodes
const QUEUE_FORMAT: &str = "%i|%E|%R";

/// The queue's view of one job: what it waits on and why.
#[derive(Debug, Clone, Default)]
pub struct QueueSnapshot {
    pub dependencies: Option<String>,
    pub reason: Option<String>,
}

/// Query the queue snapshot for one job id.
pub async fn query_queue(job_id: &str) -> Result<Option<QueueSnapshot>, SourceError> {
    let mut cmd = Command::new("squeue");
    cmd.args(["-h", "-a", "-j", job_id, "-o", QUEUE_FORMAT]);

    // squeue exits non-zero for ids no longer in the queue
    let stdout = capture_stdout_lenient(&mut cmd, "squeue").await?;
    Ok(parse_queue_output(&stdout, job_id))
}

/// Select the line for `job_id` and split off its snapshot fields.
pub fn parse_queue_output(output: &str, job_id: &str) -> Option<QueueSnapshot> {
    for line in output.lines() {
        let line = line.trim();
        let Some((id, rest)) = line.split_once('|') else {
            continue;
        };
        if id != job_id {
            continue;
        }

        let (dependencies, reason) = match rest.split_once('|') {
            Some((deps, reason)) => (deps, reason),
            None => (rest, ""),
        };

        return Some(QueueSnapshot {
            dependencies: non_empty_string(dependencies).filter(|d| d != "(null)"),
            reason: non_empty_string(reason).filter(|r| r != "None"),
        });
    }
    None
}
