//! Error types for VOC client operations

use std::sync::Arc;

use thiserror::Error;

use crate::types::RemoteCommand;

/// Result type alias for VOC client operations
pub type Result<T> = std::result::Result<T, VocError>;

/// Errors that can occur during VOC client operations
///
/// Cloneable so a single remote-operation outcome can be handed to every
/// caller waiting on it.
#[derive(Error, Debug, Clone)]
pub enum VocError {
    /// A request was attempted before a credential was set
    #[error("No credential set on session; authenticate before sending requests")]
    Unauthenticated,

    /// Server answered with a status outside 2xx
    #[error("HTTP {status} returned for {path}")]
    HttpError { status: u16, path: String },

    /// Server explicitly reported the operation as failed
    #[error("Remote operation {operation_id} failed{}", reason_suffix(.reason))]
    OperationFailed {
        operation_id: String,
        reason: Option<serde_json::Value>,
    },

    /// Server reported a state outside the known set
    #[error("Unexpected service operation status '{state}' for operation {operation_id}")]
    UnexpectedState { operation_id: String, state: String },

    /// Another remote command is still running for the vehicle
    #[error("Vehicle {vehicle_id} is busy running {running}")]
    Busy {
        vehicle_id: String,
        running: RemoteCommand,
    },

    /// Operation did not reach a terminal state within the configured limit
    #[error("Timed out waiting for operation {operation_id}")]
    Timeout { operation_id: String },

    /// Operation was cancelled before reaching a terminal state
    #[error("Operation cancelled")]
    Cancelled,

    /// Network-level request failure
    #[error("HTTP request failed: {0}")]
    Request(#[source] Arc<reqwest::Error>),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Header name or value could not be used
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Background operation task ended abnormally
    #[error("Operation task failed: {0}")]
    TaskFailed(String),
}

fn reason_suffix(reason: &Option<serde_json::Value>) -> String {
    match reason {
        Some(reason) => format!(": {}", reason),
        None => String::new(),
    }
}

impl From<reqwest::Error> for VocError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(Arc::new(err))
    }
}

impl VocError {
    /// Create an HTTP status error for a request path
    pub fn http_error(status: u16, path: impl Into<String>) -> Self {
        Self::HttpError {
            status,
            path: path.into(),
        }
    }

    /// Whether the error came from the server's verdict on a remote operation
    /// rather than from transport or local state
    pub fn is_operation_outcome(&self) -> bool {
        matches!(
            self,
            Self::OperationFailed { .. } | Self::UnexpectedState { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = VocError::http_error(500, "vehicles/ABC/status");
        assert_eq!(err.to_string(), "HTTP 500 returned for vehicles/ABC/status");
    }

    #[test]
    fn test_operation_failed_display_includes_reason() {
        let err = VocError::OperationFailed {
            operation_id: "42".into(),
            reason: Some(serde_json::json!({"code": "CarOffline"})),
        };
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("CarOffline"));

        let bare = VocError::OperationFailed {
            operation_id: "42".into(),
            reason: None,
        };
        assert_eq!(bare.to_string(), "Remote operation 42 failed");
    }

    #[test]
    fn test_operation_outcome_classification() {
        assert!(VocError::UnexpectedState {
            operation_id: "1".into(),
            state: "SomethingNew".into()
        }
        .is_operation_outcome());
        assert!(!VocError::Unauthenticated.is_operation_outcome());
        assert!(!VocError::Cancelled.is_operation_outcome());
    }

    #[test]
    fn test_busy_display_names_running_command() {
        let err = VocError::Busy {
            vehicle_id: "YV1ABC".into(),
            running: RemoteCommand::Lock,
        };
        assert_eq!(err.to_string(), "Vehicle YV1ABC is busy running lock");
        assert!(!err.is_operation_outcome());
    }
}
