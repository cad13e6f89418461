//! Accounting-history source: one row per job plus one per step.

use crate::types::{StepId, split_row_id};
use jobscope_parsers::{FIELD_SENTINEL_STR, SourceError, capture_stdout_raw, split_sentinel};
use std::collections::BTreeMap;
use tokio::process::Command;

/// Accounting fields requested from the history source, in row order.
///
/// The first field must stay `JobID`: row selection keys on it.
pub const ACCT_FIELDS: &[&str] = &[
    "JobID",
    "JobName",
    "User",
    "Partition",
    "State",
    "Submit",
    "Start",
    "End",
    "Timelimit",
    "Elapsed",
    "NNodes",
    "NodeList",
    "AllocCPUS",
    "NTasks",
    "TotalCPU",
    "UserCPU",
    "SystemCPU",
    "ReqMem",
    "MaxRSS",
    "MaxRSSNode",
    "MaxRSSTask",
    "MaxDiskRead",
    "MaxDiskReadNode",
    "MaxDiskReadTask",
    "MaxDiskWrite",
    "MaxDiskWriteNode",
    "MaxDiskWriteTask",
    "TRESUsageInTot",
    "TRESUsageOutTot",
    "Comment",
    "AllocTRES",
];

/// One accounting row: the job-level row (no step suffix) or a step row.
#[derive(Debug, Clone)]
pub struct AcctRecord {
    /// Row id exactly as printed, e.g. "123_4.batch".
    pub raw_id: String,
    /// Step suffix; None marks the job-level row.
    pub step: Option<StepId>,
    /// Field name -> raw value, keyed by [`ACCT_FIELDS`].
    pub fields: BTreeMap<String, String>,
}

impl AcctRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Query accounting history for one job id.
pub async fn query_acct(job_id: &str) -> Result<Vec<AcctRecord>, SourceError> {
    let mut cmd = Command::new("sacct");
    cmd.args([
        "-j",
        job_id,
        "--noheader",
        "-P",
        "--delimiter",
        FIELD_SENTINEL_STR,
        "--format",
        &ACCT_FIELDS.join(","),
    ]);

    let raw = capture_stdout_raw(&mut cmd, "sacct").await?;
    Ok(parse_acct_output(&raw, job_id))
}

/// Parse raw accounting output, keeping only rows belonging to `job_id`.
///
/// Rows are split on the exact sentinel byte sequence and decoded one field
/// at a time. Structurally broken rows are skipped with a warning; zero
/// matching rows is a valid, empty result.
pub fn parse_acct_output(raw: &[u8], job_id: &str) -> Vec<AcctRecord> {
    let mut records = Vec::new();

    for line in raw.split(|&b| b == b'\n') {
        let line = match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        };
        if line.is_empty() {
            continue;
        }

        let values = split_sentinel(line);
        if values.len() != ACCT_FIELDS.len() {
            tracing::warn!(
                expected = ACCT_FIELDS.len(),
                got = values.len(),
                "skipping malformed accounting row"
            );
            continue;
        }

        let raw_id = values[0].clone();
        let (base, step) = split_row_id(&raw_id);
        if base != job_id {
            continue;
        }

        let fields = ACCT_FIELDS
            .iter()
            .map(|name| name.to_string())
            .zip(values)
            .collect();

        records.push(AcctRecord {
            raw_id,
            step,
            fields,
        });
    }

    records
}
