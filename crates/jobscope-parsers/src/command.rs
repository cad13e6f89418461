//! Invocation of the scheduler's inspection commands.

use thiserror::Error;
use tokio::process::Command;

/// Failure to obtain any output from a scheduler command.
///
/// This is the one fatal condition in the report pipeline: without the
/// command's output there is no job data to assemble. Missing rows inside
/// successful output are unavailable data and handled downstream.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to invoke {command}: {error}")]
    Unreachable { command: String, error: String },
    #[error("{command} exited with an error: {stderr}")]
    Failed { command: String, stderr: String },
}

/// Run a command and capture stdout as raw bytes.
///
/// Accounting rows are split on a multi-byte sentinel before any decoding,
/// so their reader wants the undecoded stream.
pub async fn capture_stdout_raw(cmd: &mut Command, name: &str) -> Result<Vec<u8>, SourceError> {
    let output = cmd.output().await.map_err(|e| SourceError::Unreachable {
        command: name.to_string(),
        error: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SourceError::Failed {
            command: name.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(output.stdout)
}

/// Run a command, treating a non-zero exit as empty output.
///
/// sstat exits non-zero for jobs without running steps and for jobs owned
/// by another user; both cases are unavailable data, not failures.
pub async fn capture_stdout_lenient(cmd: &mut Command, name: &str) -> Result<String, SourceError> {
    let output = cmd.output().await.map_err(|e| SourceError::Unreachable {
        command: name.to_string(),
        error: e.to_string(),
    })?;

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
