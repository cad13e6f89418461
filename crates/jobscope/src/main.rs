//! jobscope - resource usage and efficiency report for one cluster job.

use chrono::Utc;
use clap::Parser;
use jobscope_cli::Args;
use jobscope_gpu::{DeviceSeries, MetricsFeed, allocated_devices};
use jobscope_report::{Job, ReportConfig, build_job, compute_metrics, render_report, select_hints};
use jobscope_slurm::{JobState, NodeInfo, query_acct, query_live, query_node, query_queue};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ReportConfig {
        long_output: args.long,
        thresholds: args.thresholds(),
    };

    // Accounting is the backbone of the report: if it cannot be reached
    // there is nothing to assemble.
    let acct = query_acct(&args.job_id).await.into_diagnostic()?;

    let state = acct
        .iter()
        .find(|r| r.step.is_none())
        .and_then(|r| r.get("State"))
        .map(JobState::parse);
    let in_queue = state
        .as_ref()
        .is_some_and(|s| s.is_running() || s.is_pending());

    // Only a running job has live counters, only a queued one has a
    // queue entry; skip the sources that cannot contribute.
    let live = if state.as_ref().is_some_and(JobState::is_running) {
        query_live(&args.job_id).await.into_diagnostic()?
    } else {
        Vec::new()
    };
    let queue = if in_queue {
        query_queue(&args.job_id).await.into_diagnostic()?
    } else {
        None
    };

    let job = build_job(&args.job_id, acct, live, queue).into_diagnostic()?;

    let gpu_series = fetch_gpu_series(&job, args.gpu_feed.as_deref()).await;
    let metrics = compute_metrics(&job, gpu_series.as_deref());

    // Node descriptions are looked up only when the memory rule could
    // fire; a node without a description simply contributes nothing.
    let mut nodes: Vec<NodeInfo> = Vec::new();
    if metrics
        .mem_efficiency
        .is_some_and(|eff| eff < config.thresholds.mem_overrequest)
    {
        for name in &job.nodes {
            if let Some(info) = query_node(name).await.into_diagnostic()? {
                nodes.push(info);
            }
        }
    }

    let hints = select_hints(&job, &metrics, &nodes, &config.thresholds);
    print!("{}", render_report(&job, &metrics, &hints, &config));
    Ok(())
}

/// Fetch accelerator utilization for the job's window, when a feed is
/// configured and the job holds accelerators. A feed failure degrades to
/// "utilization unavailable" rather than losing the report.
async fn fetch_gpu_series(job: &Job, feed_url: Option<&str>) -> Option<Vec<DeviceSeries>> {
    let url = feed_url?;
    let gpus = job.gpus.filter(|count| *count > 0)?;
    let start = job.start?;
    let end = job.end.unwrap_or_else(Utc::now);

    let devices = allocated_devices(&job.nodes, gpus);
    match MetricsFeed::new(url)
        .fetch_utilization(&devices, start, end)
        .await
    {
        Ok(series) => Some(series),
        Err(error) => {
            tracing::warn!(%error, "accelerator metrics feed unavailable");
            None
        }
    }
}
