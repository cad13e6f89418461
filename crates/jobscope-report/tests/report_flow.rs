//! End-to-end flow over raw source text: parse, build, compute, select,
//! render. The fixtures mirror what the scheduler commands print for a
//! small cluster.

use jobscope_parsers::FIELD_SENTINEL_STR;
use jobscope_report::{
    Hint, ReportConfig, build_job, compute_metrics, render_report, select_hints,
};
use jobscope_slurm::{
    JobState, parse_acct_output, parse_live_output, parse_node_line, parse_queue_output,
};

/// Accounting fixture with two jobs, one of them multi-step.
fn acct_text() -> Vec<u8> {
    let rows = [
        // completed two-core job that mostly idled
        concat!(
            "123☃align☃jdoe☃cpu☃COMPLETED☃2024-01-15T10:00:00☃2024-01-15T10:05:00☃",
            "2024-01-15T10:15:00☃01:00:00☃00:10:00☃1☃node001☃2☃☃00:03:00☃00:02:30☃",
            "00:00:30☃1Gn☃☃☃☃☃☃☃☃☃☃☃☃☃cpu=2,mem=1G,node=1"
        ),
        concat!(
            "123.batch☃batch☃☃☃COMPLETED☃☃☃☃☃00:10:00☃1☃node001☃2☃1☃00:03:00☃00:02:30☃",
            "00:00:30☃☃950M☃node001☃0☃10M☃node001☃0☃2M☃node001☃0☃fs/disk=1048576☃",
            "fs/disk=524288☃☃"
        ),
        concat!(
            "123.extern☃extern☃☃☃COMPLETED☃☃☃☃☃00:10:00☃1☃node001☃2☃1☃00:00:00☃00:00:00☃",
            "00:00:00☃☃4K☃node001☃0☃☃☃☃☃☃☃☃☃☃"
        ),
        // running job, accounting has not caught up with its peaks
        concat!(
            "456☃simulate☃jdoe☃gpu☃RUNNING☃2024-01-15T11:00:00☃2024-01-15T11:01:00☃",
            "Unknown☃04:00:00☃00:30:00☃2☃node[001-002]☃8☃☃00:55:00☃00:50:00☃00:05:00☃",
            "8Gn☃☃☃☃☃☃☃☃☃☃☃☃☃cpu=8,gres/gpu=2,mem=16G,node=2"
        ),
        concat!(
            "456.batch☃batch☃☃☃RUNNING☃☃☃☃☃00:30:00☃2☃node[001-002]☃8☃2☃00:55:00☃00:50:00☃",
            "00:05:00☃☃50M☃node001☃0☃☃☃☃☃☃☃☃☃☃"
        ),
    ];
    rows.join("\n").into_bytes()
}

const SSTAT_TEXT: &str = "456.batch|100M|node002|1|5M|node002|1|1M|node002|1|fs/disk=4096|fs/disk=2048|\n";

const SQUEUE_TEXT: &str = "456|(null)|None\n789|afterok:456|Dependency\n";

const SCONTROL_TEXT: &str = "NodeName=node001 CPUAlloc=2 CPUTot=16 RealMemory=64000 AllocMem=9000 State=MIXED\n\
                             NodeName=node002 CPUAlloc=8 CPUTot=16 RealMemory=64000 AllocMem=8000 State=MIXED\n";

#[test]
fn completed_job_report_fires_both_hints() {
    let acct = parse_acct_output(&acct_text(), "123");
    let live = parse_live_output(SSTAT_TEXT, "123");
    let queue = parse_queue_output(SQUEUE_TEXT, "123");
    assert!(live.is_empty());
    assert!(queue.is_none());

    let job = build_job("123", acct, live, queue).unwrap();
    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.steps.len(), 2);

    let metrics = compute_metrics(&job, None);
    // 180s over 2 cores x 600s
    assert!((metrics.cpu_efficiency.unwrap() - 0.15).abs() < 1e-9);
    // 950M peak of 1G requested
    assert!((metrics.mem_efficiency.unwrap() - 0.9277).abs() < 1e-3);

    let nodes: Vec<_> = job
        .nodes
        .iter()
        .filter_map(|name| parse_node_line(SCONTROL_TEXT, name))
        .collect();
    let config = ReportConfig::default();
    let hints = select_hints(&job, &metrics, &nodes, &config.thresholds);
    // memory efficiency is healthy, only the CPU hint fires
    assert_eq!(hints, vec![Hint::VeryLowCpuEfficiency]);

    let report = render_report(&job, &metrics, &hints, &config);
    assert!(report.contains("State                : COMPLETED"));
    assert!(report.contains("efficiency 15.0%"));
    assert!(report.contains("The program efficiency is very low."));
}

#[test]
fn running_job_takes_peaks_from_live_stats() {
    let acct = parse_acct_output(&acct_text(), "456");
    let live = parse_live_output(SSTAT_TEXT, "456");
    let queue = parse_queue_output(SQUEUE_TEXT, "456");

    let job = build_job("456", acct, live, queue).unwrap();
    assert!(job.state.is_running());
    assert!(job.end.is_none());
    assert_eq!(job.nodes, vec!["node001", "node002"]);
    assert_eq!(job.gpus, Some(2));

    // live 100M beats the stale accounting 50M while RUNNING
    let peak = job.peak_rss().unwrap();
    assert_eq!(peak.bytes, 100 << 20);
    assert_eq!(peak.node.as_deref(), Some("node002"));

    let metrics = compute_metrics(&job, None);
    // 3300s over 8 cores x 1800s
    assert!((metrics.cpu_efficiency.unwrap() - 3300.0 / 14400.0).abs() < 1e-9);

    let nodes: Vec<_> = job
        .nodes
        .iter()
        .filter_map(|name| parse_node_line(SCONTROL_TEXT, name))
        .collect();
    let config = ReportConfig::default();
    let hints = select_hints(&job, &metrics, &nodes, &config.thresholds);
    // 100M of 8G requested on shared nodes, and 3300s of CPU time keeps
    // less than one core per node busy
    assert_eq!(
        hints,
        vec![Hint::VeryLowCpuEfficiency, Hint::MemoryOverRequested]
    );
}

#[test]
fn pending_job_from_queue_overlay() {
    let row = [
        "789", "waiting", "jdoe", "cpu", "PENDING", "2024-01-15T12:00:00", "", "", "02:00:00", "",
        "", "", "", "", "", "", "", "2G", "", "", "", "", "", "", "", "", "", "", "", "", "",
    ]
    .join(FIELD_SENTINEL_STR);

    let acct = parse_acct_output(row.as_bytes(), "789");
    let queue = parse_queue_output(SQUEUE_TEXT, "789");

    let job = build_job("789", acct, Vec::new(), queue).unwrap();
    assert!(job.state.is_pending());
    assert!(job.steps.is_empty());
    assert_eq!(job.dependencies.as_deref(), Some("afterok:456"));
    assert_eq!(job.reason.as_deref(), Some("Dependency"));

    // nothing to compute for a job that never started: no metric, no hint
    let metrics = compute_metrics(&job, None);
    assert!(metrics.cpu_efficiency.is_none());
    assert!(metrics.mem_efficiency.is_none());

    let config = ReportConfig::default();
    let hints = select_hints(&job, &metrics, &[], &config.thresholds);
    assert!(hints.is_empty());

    let report = render_report(&job, &metrics, &hints, &config);
    assert!(report.contains("PENDING"));
    assert!(report.contains("Dependency"));
}

#[test]
fn unknown_node_lookup_omits_node_hints() {
    let acct = parse_acct_output(&acct_text(), "456");
    let job = build_job("456", acct, Vec::new(), None).unwrap();
    let metrics = compute_metrics(&job, None);

    let nodes: Vec<_> = job
        .nodes
        .iter()
        .filter_map(|name| parse_node_line("", name))
        .collect();
    assert!(nodes.is_empty());

    let config = ReportConfig::default();
    let hints = select_hints(&job, &metrics, &nodes, &config.thresholds);
    // the memory hint needs node context; only the CPU hint can fire
    assert!(!hints.contains(&Hint::MemoryOverRequested));

    // the report still completes
    let report = render_report(&job, &metrics, &hints, &config);
    assert!(report.contains("Job ID"));
}
