//! A test double for `RequestHelper`.
//!
//! Records every request it receives and answers from a queue of canned
//! responses, so node logic can be tested without a network.

use async_trait::async_trait;
use friendgrid_workflow::CredentialTypeDescription;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::credentials::{authenticate, DecryptedCredentialData};
use crate::error::ExecutionEngineError;
use crate::request::{CredentialTestResult, RequestHelper, RequestOptions};

/// One request seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub credential_type: String,
    /// Options as they would be sent, after authentication was applied.
    pub options: RequestOptions,
}

/// Failure injected at a given call index.
#[derive(Debug, Clone)]
struct InjectedFailure {
    call_index: usize,
    status: u16,
    message: String,
}

/// A mock request helper.
pub struct MockRequestHelper {
    responses: Mutex<VecDeque<Value>>,
    failure: Option<InjectedFailure>,
    credential: Option<(CredentialTypeDescription, DecryptedCredentialData)>,
    test_result: CredentialTestResult,
    /// Every request seen, in call order.
    pub calls: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockRequestHelper {
    /// A mock answering `{"job_id": "job-<n>"}` for the n-th call.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            failure: None,
            credential: None,
            test_result: CredentialTestResult::ok("Connection successful"),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer calls with these responses, in order, before falling back to
    /// the default response.
    pub fn responding(responses: Vec<Value>) -> Self {
        let mock = Self::new();
        *mock.responses.lock() = responses.into();
        mock
    }

    /// Reject the call with zero-based index `call_index` with `status`.
    pub fn failing_on(mut self, call_index: usize, status: u16, message: impl Into<String>) -> Self {
        self.failure = Some(InjectedFailure {
            call_index,
            status,
            message: message.into(),
        });
        self
    }

    /// Apply this credential type's authentication to recorded requests.
    pub fn with_credentials(
        mut self,
        description: CredentialTypeDescription,
        data: DecryptedCredentialData,
    ) -> Self {
        self.credential = Some((description, data));
        self
    }

    /// Result returned by `test_credential`.
    pub fn with_test_result(mut self, result: CredentialTestResult) -> Self {
        self.test_result = result;
        self
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Snapshot of the recorded requests.
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.calls.lock().clone()
    }
}

impl Default for MockRequestHelper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestHelper for MockRequestHelper {
    async fn request_with_authentication(
        &self,
        credential_type: &str,
        options: RequestOptions,
    ) -> Result<Value, ExecutionEngineError> {
        let options = match &self.credential {
            Some((description, data)) if description.name == credential_type => {
                authenticate(description, data, options)?
            }
            Some(_) => {
                return Err(ExecutionEngineError::Credential(format!(
                    "unknown credential type '{credential_type}'"
                )))
            }
            None => options,
        };

        let call_index = {
            let mut calls = self.calls.lock();
            calls.push(RecordedRequest {
                credential_type: credential_type.to_string(),
                options,
            });
            calls.len() - 1
        };

        if let Some(failure) = &self.failure {
            if failure.call_index == call_index {
                return Err(ExecutionEngineError::HttpStatus {
                    status: failure.status,
                    message: failure.message.clone(),
                });
            }
        }

        Ok(self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| json!({ "job_id": format!("job-{call_index}") })))
    }

    async fn test_credential(
        &self,
        _credential_type: &str,
    ) -> Result<CredentialTestResult, ExecutionEngineError> {
        Ok(self.test_result.clone())
    }
}
