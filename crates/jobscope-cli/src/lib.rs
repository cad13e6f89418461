//! CLI argument parsing for jobscope.

use clap::Parser;
use jobscope_report::HintThresholds;

#[derive(Parser, Debug)]
#[command(name = "jobscope")]
#[command(about = "Report resource usage and efficiency of one cluster job")]
pub struct Args {
    /// Job id to report on (array tasks as <id>_<index>)
    pub job_id: String,

    /// Include per-step detail, the CPU time split and disk figures
    #[arg(short, long)]
    pub long: bool,

    /// Base URL of the accelerator metrics feed
    #[arg(long)]
    pub gpu_feed: Option<String>,

    /// Override the CPU efficiency below which a hint fires
    #[arg(long)]
    pub cpu_low: Option<f64>,

    /// Override the CPU efficiency below which usage reads as pathological
    #[arg(long)]
    pub cpu_very_low: Option<f64>,

    /// Override the memory efficiency below which the request reads as oversized
    #[arg(long)]
    pub mem_overrequest: Option<f64>,
}

impl Args {
    /// Hint thresholds with any command-line overrides applied.
    pub fn thresholds(&self) -> HintThresholds {
        let mut thresholds = HintThresholds::default();
        if let Some(value) = self.cpu_low {
            thresholds.cpu_low = value;
        }
        if let Some(value) = self.cpu_very_low {
            thresholds.cpu_very_low = value;
        }
        if let Some(value) = self.mem_overrequest {
            thresholds.mem_overrequest = value;
        }
        thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_overrides() {
        let args = Args::parse_from(["jobscope", "123", "--cpu-low", "0.9"]);
        let thresholds = args.thresholds();
        assert_eq!(thresholds.cpu_low, 0.9);
        assert_eq!(thresholds.cpu_very_low, HintThresholds::default().cpu_very_low);
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["jobscope", "123"]);
        assert!(!args.long);
        assert!(args.gpu_feed.is_none());
    }
}
