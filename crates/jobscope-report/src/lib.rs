//! Report assembly for jobscope.
//!
//! Merges the scheduler sources into one job record, derives efficiency
//! metrics, selects diagnostic hints and renders the report.

pub mod hints;
pub mod metrics;
pub mod model;
pub mod render;

pub use hints::{Hint, HintThresholds, select_hints};
pub use metrics::{EfficiencyMetrics, GpuUtilization, compute_metrics};
pub use model::{BuildError, Job, Peak, Step, build_job};
pub use render::{ReportConfig, render_report};
