//! Error types for external tool invocation.

use thiserror::Error;

/// Failures when shelling out to the debug bridge or flasher binaries.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} binary not found in bundled tools or PATH")]
    NotFound { tool: &'static str },

    #[error("{tool} command timed out after {seconds}s")]
    Timeout { tool: &'static str, seconds: u64 },

    #[error("{tool} exited with status {code:?}: {stderr}")]
    CommandFailed {
        tool: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
