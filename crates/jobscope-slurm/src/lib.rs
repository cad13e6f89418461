//! Scheduler integration for jobscope.
//!
//! Four read-only sources feed the report: accounting history (sacct),
//! live per-step statistics (sstat), the queue snapshot (squeue) and node
//! descriptions (scontrol).

pub mod sacct;
pub mod scontrol;
pub mod squeue;
pub mod sstat;
pub mod types;

pub use sacct::{ACCT_FIELDS, AcctRecord, parse_acct_output, query_acct};
pub use scontrol::{parse_node_line, query_node};
pub use squeue::{QueueSnapshot, parse_queue_output, query_queue};
pub use sstat::{LIVE_FIELDS, LiveRecord, parse_live_output, query_live};
pub use types::{JobState, NodeInfo, StepId, split_row_id};
