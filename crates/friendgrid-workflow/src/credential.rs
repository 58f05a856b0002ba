//! Credential type descriptions.
//!
//! A credential type declares which secret fields a user stores, how those
//! fields are turned into request authentication, and which request proves the
//! stored values are valid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::node::NodeProperty;

/// HTTP methods used by request descriptions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How stored credential values are applied to an outgoing request.
///
/// Values are templates: a leading `=` marks an expression and
/// `{{$credentials.<field>}}` placeholders are replaced with stored values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Authentication {
    Generic { properties: GenericAuthProperties },
}

/// Request parts a generic authentication writes to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenericAuthProperties {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub qs: BTreeMap<String, String>,
}

impl Authentication {
    /// Generic authentication that only sets one header.
    pub fn header(name: impl Into<String>, template: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(name.into(), template.into());
        Authentication::Generic {
            properties: GenericAuthProperties {
                headers,
                qs: BTreeMap::new(),
            },
        }
    }
}

/// Request issued to check that stored credentials work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialTestRequest {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
}

impl CredentialTestRequest {
    /// Absolute URL of the test request.
    pub fn full_url(&self) -> String {
        join_url(&self.base_url, &self.url)
    }
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base_url: &str, url: &str) -> String {
    if base_url.is_empty() {
        return url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

/// Declarative metadata about a credential type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialTypeDescription {
    /// Unique credential type identifier.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Fields the user fills in.
    pub properties: Vec<NodeProperty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticate: Option<Authentication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<CredentialTestWrapper>,
}

/// Wire shape of the `test` entry: `{ "request": { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialTestWrapper {
    pub request: CredentialTestRequest,
}

impl CredentialTypeDescription {
    pub fn test_request(&self) -> Option<&CredentialTestRequest> {
        self.test.as_ref().map(|t| &t.request)
    }
}
