//! Node-description source: capacity and allocation of one compute node.

use crate::types::NodeInfo;
use jobscope_parsers::{SourceError, capture_stdout_lenient};
use tokio::process::Command;

/// Query the description of one node by name.
///
/// An unknown name makes the command exit non-zero with no usable output;
/// that is unavailable data, so the lenient runner is used and the result
/// is None.
pub async fn query_node(name: &str) -> Result<Option<NodeInfo>, SourceError> {
    let mut cmd = Command::new("scontrol");
    cmd.args(["-o", "show", "node", name]);

    let stdout = capture_stdout_lenient(&mut cmd, "scontrol").await?;
    Ok(parse_node_line(&stdout, name))
}

/// Locate the line describing `name` and tokenize it into a node record.
///
/// Node descriptions are single space-separated `Key=Value` lines; the line
/// is selected by its `NodeName=` prefix. No matching line yields None.
pub fn parse_node_line(output: &str, name: &str) -> Option<NodeInfo> {
    let prefix = format!("NodeName={}", name);
    let line = output.lines().map(str::trim).find(|l| {
        l.strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
    })?;

    let mut info = NodeInfo {
        name: name.to_string(),
        cpus_total: None,
        cpus_alloc: None,
        real_memory: None,
        alloc_memory: None,
        state: None,
    };

    for token in line.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        match key {
            "CPUTot" => info.cpus_total = value.parse().ok(),
            "CPUAlloc" => info.cpus_alloc = value.parse().ok(),
            // RealMemory and AllocMem are reported in MiB
            "RealMemory" => info.real_memory = value.parse::<u64>().ok().map(|mb| mb << 20),
            "AllocMem" => info.alloc_memory = value.parse::<u64>().ok().map(|mb| mb << 20),
            "State" => info.state = Some(value.to_string()),
            _ => {}
        }
    }

    Some(info)
}
