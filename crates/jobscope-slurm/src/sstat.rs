//! Live-stats source: real-time counters for steps still executing.
//!
//! Accounting lags behind for a running step; only this source exposes the
//! in-progress peaks.

use crate::types::{StepId, split_row_id};
use jobscope_parsers::{SourceError, capture_stdout_lenient};
use std::collections::BTreeMap;
use tokio::process::Command;

/// Live-stats fields, pipe-delimited in row order. `JobID` stays first for
/// row selection.
pub const LIVE_FIELDS: &[&str] = &[
    "JobID",
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
];

/// One live-stats row for a currently-running step.
#[derive(Debug, Clone)]
pub struct LiveRecord {
    pub step: Option<StepId>,
    /// Field name -> raw value, keyed by [`LIVE_FIELDS`].
    pub fields: BTreeMap<String, String>,
}

impl LiveRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Query live statistics for one job id.
///
/// The command exits non-zero when the job has no running steps or belongs
/// to another user; both mean "no live data", so the lenient runner is used
/// and empty output yields an empty record set.
pub async fn query_live(job_id: &str) -> Result<Vec<LiveRecord>, SourceError> {
    let mut cmd = Command::new("sstat");
    cmd.args([
        "-a",
        "-n",
        "-p",
        "-j",
        job_id,
        "--format",
        &LIVE_FIELDS.join(","),
    ]);

    let stdout = capture_stdout_lenient(&mut cmd, "sstat").await?;
    Ok(parse_live_output(&stdout, job_id))
}

/// Parse pipe-delimited live-stats lines, keeping rows for `job_id`.
pub fn parse_live_output(output: &str, job_id: &str) -> Vec<LiveRecord> {
    let mut records = Vec::new();

    for line in output.lines() {
        // -p terminates the row with one extra delimiter; empty trailing
        // fields must survive, so exactly one is stripped
        let line = line.trim_end();
        let line = line.strip_suffix('|').unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        let values: Vec<&str> = line.split('|').collect();
        if values.len() != LIVE_FIELDS.len() {
            tracing::warn!(
                expected = LIVE_FIELDS.len(),
                got = values.len(),
                "skipping malformed live-stats row"
            );
            continue;
        }

        let (base, step) = split_row_id(values[0]);
        if base != job_id {
            continue;
        }

        let fields = LIVE_FIELDS
            .iter()
            .map(|name| name.to_string())
            .zip(values.iter().map(|v| v.to_string()))
            .collect();

        records.push(LiveRecord { step, fields });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, rss: &str) -> String {
        let mut fields = vec![id.to_string(), rss.to_string()];
        fields.resize(LIVE_FIELDS.len(), String::new());
        format!("{}|", fields.join("|"))
    }

    #[test]
    fn test_parse_selects_job_rows() {
        let text = [row("123.batch", "950M"), row("456.batch", "1G")].join("\n");
        let records = parse_live_output(&text, "123");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].step, Some(StepId::Batch));
        assert_eq!(records[0].get("MaxRSS"), Some("950M"));
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_live_output("", "123").is_empty());
        assert!(parse_live_output("\n\n", "123").is_empty());
    }

    #[test]
    fn test_parse_numbered_step() {
        let text = row("123.0", "10M");
        let records = parse_live_output(&text, "123");
        assert_eq!(records[0].step, Some(StepId::Numbered(0)));
    }
}
