//! Error types shared by nodes and the runtime that hosts them.

use thiserror::Error;

/// Primary error type for node operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Parameter error in '{node}': {message}")]
    ParameterError {
        node: String,
        message: String,
        item_index: Option<usize>,
    },

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Node operation error in '{node}': {message}")]
    NodeOperationError { node: String, message: String },

    #[error("API error in '{node}': {message}")]
    NodeApiError {
        node: String,
        message: String,
        status_code: Option<u16>,
    },
}

impl WorkflowError {
    /// Missing or unusable parameter for a given item.
    pub fn parameter(node: impl Into<String>, message: impl Into<String>, item_index: usize) -> Self {
        WorkflowError::ParameterError {
            node: node.into(),
            message: message.into(),
            item_index: Some(item_index),
        }
    }

    /// HTTP status carried by an API error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            WorkflowError::NodeApiError { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(e: serde_json::Error) -> Self {
        WorkflowError::SerializationError(e.to_string())
    }
}

/// Where a failure happened.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
}

/// Execution error as reported back to the caller of a failed batch.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExecutionError {
    pub message: String,
    pub context: ExecutionErrorContext,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: ExecutionErrorContext::default(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.context.node_name = Some(node.into());
        self
    }

    pub fn with_item_index(mut self, index: usize) -> Self {
        self.context.item_index = Some(index);
        self
    }

    pub fn with_http_code(mut self, code: Option<u16>) -> Self {
        self.context.http_code = code;
        self
    }
}

impl From<&WorkflowError> for ExecutionError {
    fn from(e: &WorkflowError) -> Self {
        let error = ExecutionError::new(e.to_string()).with_http_code(e.status_code());
        match e {
            WorkflowError::ParameterError {
                node,
                item_index: Some(index),
                ..
            } => error.with_node(node.clone()).with_item_index(*index),
            WorkflowError::ParameterError { node, .. }
            | WorkflowError::NodeOperationError { node, .. }
            | WorkflowError::NodeApiError { node, .. } => error.with_node(node.clone()),
            _ => error,
        }
    }
}

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(index) = self.context.item_index {
            write!(f, " (item: {})", index)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_carries_item_index() {
        let err = WorkflowError::parameter("FriendGrid", "email is required", 1);
        let reported = ExecutionError::from(&err);

        assert_eq!(reported.context.item_index, Some(1));
        assert_eq!(reported.context.node_name.as_deref(), Some("FriendGrid"));
        assert_eq!(
            reported.to_string(),
            "Parameter error in 'FriendGrid': email is required (item: 1)"
        );
    }

    #[test]
    fn test_execution_error_carries_http_code() {
        let err = WorkflowError::NodeApiError {
            node: "FriendGrid".into(),
            message: "invalid email".into(),
            status_code: Some(400),
        };
        let value = serde_json::to_value(ExecutionError::from(&err)).unwrap();

        assert_eq!(value["context"]["httpCode"], 400);
        assert_eq!(value["context"]["nodeName"], "FriendGrid");
        assert!(value["context"].get("itemIndex").is_none());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_status_code() {
        let err = WorkflowError::NodeApiError {
            node: "FriendGrid".into(),
            message: "unauthorized".into(),
            status_code: Some(401),
        };
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(WorkflowError::CredentialError("x".into()).status_code(), None);
    }
}
