//! Error types for the execution runtime.

use friendgrid_workflow::{ExecutionError, WorkflowError};
use thiserror::Error;

use crate::expression::ExpressionError;

/// Errors that can occur while a node executes.
#[derive(Error, Debug)]
pub enum ExecutionEngineError {
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Node type not found: {0}")]
    NodeTypeNotFound(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Expression evaluation error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("Request failed with status code {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ExecutionEngineError {
    /// HTTP status of a rejected request, if the remote answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ExecutionEngineError::HttpStatus { status, .. } => Some(*status),
            ExecutionEngineError::Workflow(e) => e.status_code(),
            ExecutionEngineError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<&ExecutionEngineError> for ExecutionError {
    fn from(e: &ExecutionEngineError) -> Self {
        match e {
            ExecutionEngineError::Workflow(inner) => inner.into(),
            other => ExecutionError::new(other.to_string()).with_http_code(other.status_code()),
        }
    }
}
