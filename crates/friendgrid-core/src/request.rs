//! Authenticated HTTP requests on behalf of nodes.
//!
//! Nodes never touch credentials. They describe a request with
//! [`RequestOptions`] and hand it to a [`RequestHelper`] together with the
//! credential type name; the helper looks up the stored values, applies the
//! credential type's authentication and sends the request.

use async_trait::async_trait;
use friendgrid_workflow::{join_url, HttpMethod};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::credentials::{authenticate, CredentialStore, CredentialTypeRegistry};
use crate::error::ExecutionEngineError;
use crate::runtime::RuntimeConfig;

/// Longest remote error body echoed back in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Description of one outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub url: String,
    #[serde(rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub qs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Send the body as JSON and parse the response as JSON.
    #[serde(default)]
    pub json: bool,
}

impl RequestOptions {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            base_url: None,
            headers: BTreeMap::new(),
            qs: BTreeMap::new(),
            body: None,
            json: false,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.qs.insert(name.into(), value.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Attach a JSON body and switch to JSON mode.
    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self.json = true;
        self
    }

    /// Absolute URL, combining `base_url` and `url` when a base is set.
    pub fn full_url(&self) -> String {
        match &self.base_url {
            Some(base) => join_url(base, &self.url),
            None => self.url.clone(),
        }
    }
}

/// Outcome of a credential connectivity test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialTestResult {
    pub status: CredentialTestStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CredentialTestStatus {
    Ok,
    Error,
}

impl CredentialTestResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: CredentialTestStatus::Ok,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: CredentialTestStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == CredentialTestStatus::Ok
    }
}

/// Capability to send requests authenticated with a named credential type.
#[async_trait]
pub trait RequestHelper: Send + Sync {
    /// Send `options` authenticated with the stored `credential_type`
    /// credentials and return the parsed response body.
    ///
    /// A non-success status is an [`ExecutionEngineError::HttpStatus`].
    async fn request_with_authentication(
        &self,
        credential_type: &str,
        options: RequestOptions,
    ) -> Result<Value, ExecutionEngineError>;

    /// Run the credential type's test request. Rejections and transport
    /// failures are reported in the result, not as an `Err`.
    async fn test_credential(
        &self,
        credential_type: &str,
    ) -> Result<CredentialTestResult, ExecutionEngineError>;
}

/// [`RequestHelper`] backed by `reqwest`.
#[derive(Clone)]
pub struct HttpRequestHelper {
    client: reqwest::Client,
    credential_types: Arc<CredentialTypeRegistry>,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpRequestHelper {
    /// Create a helper with a client built from `config`.
    pub fn new(
        config: &RuntimeConfig,
        credential_types: Arc<CredentialTypeRegistry>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ExecutionEngineError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::with_client(client, credential_types, credentials))
    }

    pub fn with_client(
        client: reqwest::Client,
        credential_types: Arc<CredentialTypeRegistry>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            client,
            credential_types,
            credentials,
        }
    }

    /// Apply the credential type's authentication to `options`.
    pub async fn authenticate(
        &self,
        credential_type: &str,
        options: RequestOptions,
    ) -> Result<RequestOptions, ExecutionEngineError> {
        let description = self.credential_types.get(credential_type).ok_or_else(|| {
            ExecutionEngineError::Credential(format!("unknown credential type '{credential_type}'"))
        })?;
        let data = self
            .credentials
            .get_credentials(credential_type)
            .await?
            .ok_or_else(|| {
                ExecutionEngineError::Credential(format!(
                    "no credentials stored for '{credential_type}'"
                ))
            })?;

        Ok(authenticate(description, &data, options)?)
    }

    /// Turn `options` into a ready-to-send request without sending it.
    pub fn build_request(&self, options: &RequestOptions) -> Result<reqwest::Request, ExecutionEngineError> {
        let method = reqwest::Method::from_bytes(options.method.as_str().as_bytes())
            .map_err(|e| ExecutionEngineError::InvalidRequest(e.to_string()))?;
        let url = options.full_url();

        let mut builder = self.client.request(method, url.as_str());
        if !options.qs.is_empty() {
            builder = builder.query(&options.qs);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            builder = if options.json {
                builder.json(body)
            } else {
                match body {
                    Value::String(text) => builder.body(text.clone()),
                    other => builder.body(other.to_string()),
                }
            };
        }

        Ok(builder.build()?)
    }

    /// Send an already authenticated request and parse the response.
    async fn send(&self, options: &RequestOptions) -> Result<Value, ExecutionEngineError> {
        let request = self.build_request(options)?;
        debug!(method = %options.method, url = %request.url(), "sending request");

        let response = self.client.execute(request).await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(method = %options.method, status = status.as_u16(), "request rejected");
            return Err(ExecutionEngineError::HttpStatus {
                status: status.as_u16(),
                message: error_message(&text, status),
            });
        }

        Ok(parse_body(&text))
    }
}

#[async_trait]
impl RequestHelper for HttpRequestHelper {
    async fn request_with_authentication(
        &self,
        credential_type: &str,
        options: RequestOptions,
    ) -> Result<Value, ExecutionEngineError> {
        let options = self.authenticate(credential_type, options).await?;
        self.send(&options).await
    }

    async fn test_credential(
        &self,
        credential_type: &str,
    ) -> Result<CredentialTestResult, ExecutionEngineError> {
        let description = self.credential_types.get(credential_type).ok_or_else(|| {
            ExecutionEngineError::Credential(format!("unknown credential type '{credential_type}'"))
        })?;
        let Some(test) = description.test_request() else {
            return Ok(CredentialTestResult::error(format!(
                "credential type '{credential_type}' has no test request"
            )));
        };

        let options = RequestOptions::new(test.method, test.url.clone()).base_url(test.base_url.clone());
        let outcome = match self.authenticate(credential_type, options).await {
            Ok(options) => self.send(&options).await,
            Err(e) => Err(e),
        };

        Ok(match outcome {
            Ok(_) => CredentialTestResult::ok("Connection successful"),
            Err(e) => {
                debug!(credential_type, error = %e, "credential test failed");
                CredentialTestResult::error(e.to_string())
            }
        })
    }
}

/// Parse a response body. Empty bodies become `{}`, non-JSON bodies a string.
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Best human-readable message for a rejected request.
///
/// Prefers the `errors[].message` entries many JSON APIs return, then the raw
/// body, then the status reason.
pub fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::Array(errors)) = obj.get("errors") {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            if !messages.is_empty() {
                return messages.join("; ");
            }
        }
        if let Some(message) = obj.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{DecryptedCredentialData, MemoryCredentialStore};
    use friendgrid_workflow::{
        Authentication, CredentialTestRequest, CredentialTestWrapper, CredentialTypeDescription,
    };
    use reqwest::StatusCode;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn registry() -> Arc<CredentialTypeRegistry> {
        let mut registry = CredentialTypeRegistry::new();
        registry.register(CredentialTypeDescription {
            name: "exampleApi".into(),
            display_name: "Example API".into(),
            properties: Vec::new(),
            authenticate: Some(Authentication::header(
                "Authorization",
                "=Bearer {{$credentials.apiKey}}",
            )),
            test: None,
        });
        Arc::new(registry)
    }

    async fn helper_with_key(key: Option<&str>) -> HttpRequestHelper {
        let store = MemoryCredentialStore::new();
        if let Some(key) = key {
            store
                .insert(
                    "exampleApi",
                    DecryptedCredentialData::from_value(json!({"apiKey": key})),
                )
                .await;
        }
        HttpRequestHelper::new(&RuntimeConfig::default(), registry(), Arc::new(store)).unwrap()
    }

    #[tokio::test]
    async fn test_built_request_carries_auth_and_json_body() {
        let helper = helper_with_key(Some("SG.abc123")).await;
        let options = RequestOptions::new(HttpMethod::Put, "https://api.example.com/v3/items")
            .header("Accept", "application/json")
            .json_body(json!({"items": [{"id": 1}]}));

        let options = helper.authenticate("exampleApi", options).await.unwrap();
        let request = helper.build_request(&options).unwrap();

        assert_eq!(request.method(), &reqwest::Method::PUT);
        assert_eq!(request.url().as_str(), "https://api.example.com/v3/items");
        assert_eq!(request.headers()["authorization"], "Bearer SG.abc123");
        assert_eq!(request.headers()["accept"], "application/json");
        assert_eq!(request.headers()["content-type"], "application/json");

        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let sent: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(sent, json!({"items": [{"id": 1}]}));
    }

    #[tokio::test]
    async fn test_built_request_with_base_url_and_query() {
        let helper = helper_with_key(Some("k")).await;
        let options = RequestOptions::new(HttpMethod::Get, "/ping")
            .base_url("https://api.example.com/v3")
            .query("page_size", "1");

        let request = helper.build_request(&options).unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://api.example.com/v3/ping?page_size=1"
        );
        assert!(request.body().is_none());
    }

    #[tokio::test]
    async fn test_authenticate_without_stored_credentials() {
        let helper = helper_with_key(None).await;
        let err = helper
            .authenticate("exampleApi", RequestOptions::new(HttpMethod::Get, "https://x.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionEngineError::Credential(_)));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_type() {
        let helper = helper_with_key(Some("k")).await;
        let err = helper
            .authenticate("otherApi", RequestOptions::new(HttpMethod::Get, "https://x.test"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown credential type"));
    }

    #[tokio::test]
    async fn test_credential_without_test_request_reports_error() {
        let helper = helper_with_key(Some("k")).await;
        let result = helper.test_credential("exampleApi").await.unwrap();
        assert!(!result.is_ok());
    }

    fn registry_with_test(base_url: &str) -> Arc<CredentialTypeRegistry> {
        let mut registry = CredentialTypeRegistry::new();
        registry.register(CredentialTypeDescription {
            name: "exampleApi".into(),
            display_name: "Example API".into(),
            properties: Vec::new(),
            authenticate: Some(Authentication::header(
                "Authorization",
                "=Bearer {{$credentials.apiKey}}",
            )),
            test: Some(CredentialTestWrapper {
                request: CredentialTestRequest {
                    base_url: base_url.to_string(),
                    url: "/marketing/contacts".into(),
                    method: HttpMethod::Get,
                },
            }),
        });
        Arc::new(registry)
    }

    async fn helper_for(base_url: &str, key: &str) -> HttpRequestHelper {
        let store = MemoryCredentialStore::new();
        store
            .insert(
                "exampleApi",
                DecryptedCredentialData::from_value(json!({"apiKey": key})),
            )
            .await;
        HttpRequestHelper::new(
            &RuntimeConfig::default(),
            registry_with_test(base_url),
            Arc::new(store),
        )
        .unwrap()
    }

    /// Answer a single connection with `status` and a JSON `body`, returning
    /// the base URL and a handle yielding the raw request head.
    async fn serve_once(status: &str, body: Value) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let body = body.to_string();
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            let head_end = loop {
                if let Some(pos) = received.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed before request head");
                received.extend_from_slice(&buf[..n]);
            };

            let head = String::from_utf8_lossy(&received[..head_end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while received.len() < head_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }

            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            head
        });

        (base_url, handle)
    }

    #[tokio::test]
    async fn test_credential_transport_failure_is_a_result() {
        let helper = helper_for("http://127.0.0.1:1", "SG.abc123").await;

        let result = helper.test_credential("exampleApi").await.unwrap();

        assert_eq!(result.status, CredentialTestStatus::Error);
        assert!(!result.message.is_empty());
    }

    #[tokio::test]
    async fn test_credential_rejected_key_is_a_result() {
        let (base_url, server) = serve_once(
            "401 Unauthorized",
            json!({"errors": [{"field": null, "message": "authorization required"}]}),
        )
        .await;
        let helper = helper_for(&base_url, "SG.bad").await;

        let result = helper.test_credential("exampleApi").await.unwrap();

        assert_eq!(result.status, CredentialTestStatus::Error);
        assert!(result.message.contains("authorization required"));

        let head = server.await.unwrap();
        assert!(head.starts_with("get /marketing/contacts "));
        assert!(head.contains("authorization: bearer sg.bad"));
    }

    #[tokio::test]
    async fn test_credential_accepted_key() {
        let (base_url, server) = serve_once("200 OK", json!({"result": []})).await;
        let helper = helper_for(&base_url, "SG.good").await;

        let result = helper.test_credential("exampleApi").await.unwrap();

        assert!(result.is_ok());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_request_carries_status_and_api_message() {
        let (base_url, server) = serve_once(
            "401 Unauthorized",
            json!({"errors": [{"field": null, "message": "authorization required"}]}),
        )
        .await;
        let helper = helper_for(&base_url, "SG.bad").await;
        let options = RequestOptions::new(HttpMethod::Put, format!("{base_url}/marketing/contacts"))
            .header("Accept", "application/json")
            .json_body(json!({"contacts": [{"email": "a@example.com"}]}));

        let err = helper
            .request_with_authentication("exampleApi", options)
            .await
            .unwrap_err();

        match err {
            ExecutionEngineError::HttpStatus { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "authorization required");
            }
            other => panic!("unexpected error: {other}"),
        }
        let head = server.await.unwrap();
        assert!(head.starts_with("put /marketing/contacts "));
    }

    #[tokio::test]
    async fn test_accepted_request_returns_parsed_body() {
        let (base_url, server) = serve_once("202 Accepted", json!({"job_id": "j1"})).await;
        let helper = helper_for(&base_url, "SG.good").await;
        let options = RequestOptions::new(HttpMethod::Put, format!("{base_url}/marketing/contacts"))
            .json_body(json!({"contacts": [{"email": "a@example.com"}]}));

        let value = helper
            .request_with_authentication("exampleApi", options)
            .await
            .unwrap();

        assert_eq!(value, json!({"job_id": "j1"}));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_transport_failure_is_an_error() {
        let helper = helper_for("http://127.0.0.1:1", "SG.abc123").await;
        let options = RequestOptions::new(HttpMethod::Put, "http://127.0.0.1:1/marketing/contacts");

        let err = helper
            .request_with_authentication("exampleApi", options)
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionEngineError::Http(_)));
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), json!({}));
        assert_eq!(parse_body("{\"job_id\":\"1\"}"), json!({"job_id": "1"}));
        assert_eq!(parse_body("accepted"), json!("accepted"));
    }

    #[test]
    fn test_error_message_prefers_api_errors() {
        let body = r#"{"errors":[{"field":"email","message":"invalid email"},{"message":"second"}]}"#;
        assert_eq!(
            error_message(body, StatusCode::BAD_REQUEST),
            "invalid email; second"
        );
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message("", StatusCode::UNAUTHORIZED), "Unauthorized");
        assert_eq!(
            error_message("upstream down", StatusCode::BAD_GATEWAY),
            "upstream down"
        );
        assert_eq!(
            error_message(r#"{"message":"bad key"}"#, StatusCode::FORBIDDEN),
            "bad key"
        );
    }

    #[test]
    fn test_request_options_wire_shape() {
        let options = RequestOptions::new(HttpMethod::Put, "https://x.test")
            .json_body(json!({"a": 1}));
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["method"], "PUT");
        assert_eq!(value["json"], true);
        assert!(value.get("baseURL").is_none());
    }
}
