//! Accelerator utilization feed.
//!
//! Per-device utilization samples come from a Prometheus-compatible
//! endpoint: one range query per allocated device over the job's time
//! window, reduced to a mean utilization percentage per device.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Metric exported by the node-level accelerator exporter.
const UTILIZATION_METRIC: &str = "nvidia_gpu_duty_cycle";

/// Sample resolution requested from the feed.
const SAMPLE_STEP_SECONDS: u64 = 60;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("metrics feed request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("metrics feed returned status {status}")]
    Status { status: u16 },
    #[error("unexpected feed response: {0}")]
    Malformed(String),
}

/// One accelerator within a job allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId {
    pub node: String,
    pub index: u32,
}

/// Time-ordered utilization samples for one device.
#[derive(Debug, Clone)]
pub struct DeviceSeries {
    pub device: DeviceId,
    /// (unix timestamp, utilization percent) pairs.
    pub samples: Vec<(f64, f64)>,
}

impl DeviceSeries {
    /// Mean utilization over the sampled window; None without samples.
    pub fn mean_utilization(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().map(|(_, value)| value).sum();
        Some(sum / self.samples.len() as f64)
    }
}

/// Mean across devices of the per-device means; None when no device has
/// any samples.
pub fn overall_utilization(series: &[DeviceSeries]) -> Option<f64> {
    let means: Vec<f64> = series
        .iter()
        .filter_map(DeviceSeries::mean_utilization)
        .collect();
    if means.is_empty() {
        return None;
    }
    Some(means.iter().sum::<f64>() / means.len() as f64)
}

/// Enumerate per-node device indices for a job allocation.
///
/// The accounting TRES counter is a job-wide total; devices are assumed
/// spread evenly across the allocated nodes.
pub fn allocated_devices(nodes: &[String], total: u64) -> Vec<DeviceId> {
    if nodes.is_empty() || total == 0 {
        return Vec::new();
    }
    let per_node = (total as usize).div_ceil(nodes.len());
    nodes
        .iter()
        .flat_map(|node| {
            (0..per_node).map(move |index| DeviceId {
                node: node.clone(),
                index: index as u32,
            })
        })
        .collect()
}

#[derive(Deserialize)]
struct PromResponse {
    status: String,
    data: PromData,
}

#[derive(Deserialize)]
struct PromData {
    result: Vec<PromResult>,
}

#[derive(Deserialize)]
struct PromResult {
    values: Vec<(f64, String)>,
}

/// Client for the utilization feed.
#[derive(Debug, Clone)]
pub struct MetricsFeed {
    base_url: String,
    client: reqwest::Client,
}

impl MetricsFeed {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the utilization series of every allocated device over the
    /// job's time window, sequentially.
    pub async fn fetch_utilization(
        &self,
        devices: &[DeviceId],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DeviceSeries>, FeedError> {
        let mut series = Vec::with_capacity(devices.len());
        for device in devices {
            series.push(self.fetch_device(device, start, end).await?);
        }
        Ok(series)
    }

    async fn fetch_device(
        &self,
        device: &DeviceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DeviceSeries, FeedError> {
        let query = format!(
            "{}{{instance=\"{}\",minor_number=\"{}\"}}",
            UTILIZATION_METRIC, device.node, device.index
        );
        let url = format!(
            "{}/api/v1/query_range",
            self.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", query),
                ("start", start.timestamp().to_string()),
                ("end", end.timestamp().to_string()),
                ("step", SAMPLE_STEP_SECONDS.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let samples = parse_sample_body(&body)?;

        Ok(DeviceSeries {
            device: device.clone(),
            samples,
        })
    }
}

/// Decode the feed's JSON envelope into utilization samples.
///
/// Sample values arrive as strings; unparseable samples are dropped rather
/// than failing the whole series.
fn parse_sample_body(body: &str) -> Result<Vec<(f64, f64)>, FeedError> {
    let response: PromResponse =
        serde_json::from_str(body).map_err(|e| FeedError::Malformed(e.to_string()))?;

    if response.status != "success" {
        return Err(FeedError::Malformed(format!(
            "feed status {}",
            response.status
        )));
    }

    Ok(response
        .data
        .result
        .into_iter()
        .flat_map(|r| r.values)
        .filter_map(|(ts, value)| value.parse::<f64>().ok().map(|v| (ts, v)))
        .collect())
}
