//! Structured errors for the worker surface.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Errors raised by the tool layer itself.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Tool output could not be serialized.
    #[error("OUTPUT_ERROR: {0}")]
    Output(String),
}

impl From<WorkerError> for McpError {
    fn from(err: WorkerError) -> Self {
        let code = match &err {
            WorkerError::Output(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
