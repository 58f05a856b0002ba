//! Credential types, stored credential data, and credential application.
//!
//! Storage and encryption of secrets belong to the host. The runtime only
//! needs to look up decrypted values by credential type and apply the type's
//! authentication rule to outgoing requests.

use async_trait::async_trait;
use friendgrid_workflow::{Authentication, CredentialTypeDescription};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ExecutionEngineError;
use crate::expression::{self, lookup_path, ExpressionError, ExpressionResult};
use crate::request::RequestOptions;

/// Decrypted credential data structure.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct DecryptedCredentialData {
    /// The actual credential values.
    #[serde(flatten)]
    pub data: serde_json::Map<String, Value>,
}

impl DecryptedCredentialData {
    pub fn new(data: serde_json::Map<String, Value>) -> Self {
        Self { data }
    }

    /// Build from a JSON object. Anything else yields empty data.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(data) => Self { data },
            _ => Self {
                data: serde_json::Map::new(),
            },
        }
    }

    /// Get a string value from the credential data.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}

impl std::fmt::Debug for DecryptedCredentialData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedCredentialData")
            .field("fields", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Apply a credential type's authentication rule to a request.
///
/// Header and query templates are resolved against `$credentials`. A missing
/// field renders as an empty string, so `=Bearer {{$credentials.apiKey}}`
/// with no stored key still yields `Bearer `.
pub fn authenticate(
    description: &CredentialTypeDescription,
    credentials: &DecryptedCredentialData,
    mut options: RequestOptions,
) -> ExpressionResult<RequestOptions> {
    let Some(Authentication::Generic { properties }) = &description.authenticate else {
        return Ok(options);
    };

    let values = Value::Object(credentials.data.clone());
    let resolver = |root: &str, path: &str| -> ExpressionResult<Option<Value>> {
        match root {
            "credentials" => Ok(lookup_path(&values, path).cloned()),
            other => Err(ExpressionError::UndefinedVariable(other.to_string())),
        }
    };

    for (name, template) in &properties.headers {
        let value = resolve_auth_template(template, &resolver)?;
        options.headers.insert(name.clone(), value);
    }
    for (name, template) in &properties.qs {
        let value = resolve_auth_template(template, &resolver)?;
        options.qs.insert(name.clone(), value);
    }

    Ok(options)
}

fn resolve_auth_template(
    template: &str,
    resolver: &dyn expression::VariableResolver,
) -> ExpressionResult<String> {
    match template.strip_prefix('=') {
        Some(expression) => expression::resolve_template(expression, resolver),
        None => Ok(template.to_string()),
    }
}

/// Known credential types, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CredentialTypeRegistry {
    types: HashMap<String, CredentialTypeDescription>,
}

impl CredentialTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a credential type. A later registration replaces an earlier one.
    pub fn register(&mut self, description: CredentialTypeDescription) {
        self.types.insert(description.name.clone(), description);
    }

    pub fn get(&self, name: &str) -> Option<&CredentialTypeDescription> {
        self.types.get(name)
    }

    pub fn descriptions(&self) -> Vec<&CredentialTypeDescription> {
        let mut all: Vec<_> = self.types.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

/// Trait for looking up decrypted credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Get the credentials stored for a credential type.
    async fn get_credentials(
        &self,
        credential_type: &str,
    ) -> Result<Option<DecryptedCredentialData>, ExecutionEngineError>;
}

/// In-memory credential store (for testing and the command line runner).
pub struct MemoryCredentialStore {
    credentials: Arc<RwLock<HashMap<String, DecryptedCredentialData>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            credentials: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store credentials for a credential type.
    pub async fn insert(&self, credential_type: impl Into<String>, data: DecryptedCredentialData) {
        self.credentials
            .write()
            .await
            .insert(credential_type.into(), data);
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_credentials(
        &self,
        credential_type: &str,
    ) -> Result<Option<DecryptedCredentialData>, ExecutionEngineError> {
        Ok(self.credentials.read().await.get(credential_type).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friendgrid_workflow::HttpMethod;
    use serde_json::json;

    fn bearer_type() -> CredentialTypeDescription {
        CredentialTypeDescription {
            name: "exampleApi".into(),
            display_name: "Example API".into(),
            properties: Vec::new(),
            authenticate: Some(Authentication::header(
                "Authorization",
                "=Bearer {{$credentials.apiKey}}",
            )),
            test: None,
        }
    }

    #[test]
    fn test_authenticate_sets_bearer_header() {
        let data = DecryptedCredentialData::from_value(json!({"apiKey": "SG.abc123"}));
        let options = RequestOptions::new(HttpMethod::Get, "https://api.example.com");

        let options = authenticate(&bearer_type(), &data, options).unwrap();
        assert_eq!(options.headers["Authorization"], "Bearer SG.abc123");
    }

    #[test]
    fn test_authenticate_with_empty_key() {
        let data = DecryptedCredentialData::from_value(json!({"apiKey": ""}));
        let options = RequestOptions::new(HttpMethod::Get, "https://api.example.com");

        let options = authenticate(&bearer_type(), &data, options).unwrap();
        assert_eq!(options.headers["Authorization"], "Bearer ");
    }

    #[test]
    fn test_authenticate_with_missing_key() {
        let data = DecryptedCredentialData::from_value(json!({}));
        let options = RequestOptions::new(HttpMethod::Get, "https://api.example.com");

        let options = authenticate(&bearer_type(), &data, options).unwrap();
        assert_eq!(options.headers["Authorization"], "Bearer ");
    }

    #[test]
    fn test_authenticate_literal_query_value() {
        let mut description = bearer_type();
        if let Some(Authentication::Generic { properties }) = description.authenticate.as_mut() {
            properties.qs.insert("source".into(), "friendgrid".into());
        }
        let data = DecryptedCredentialData::from_value(json!({"apiKey": "k"}));
        let options = RequestOptions::new(HttpMethod::Get, "https://api.example.com");

        let options = authenticate(&description, &data, options).unwrap();
        assert_eq!(options.qs["source"], "friendgrid");
    }

    #[test]
    fn test_debug_hides_secret_values() {
        let data = DecryptedCredentialData::from_value(json!({"apiKey": "SG.secret"}));
        let printed = format!("{:?}", data);
        assert!(printed.contains("apiKey"));
        assert!(!printed.contains("SG.secret"));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        assert!(store.get_credentials("exampleApi").await.unwrap().is_none());

        store
            .insert(
                "exampleApi",
                DecryptedCredentialData::from_value(json!({"apiKey": "k"})),
            )
            .await;
        let found = store.get_credentials("exampleApi").await.unwrap().unwrap();
        assert_eq!(found.get_string("apiKey"), Some("k"));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = CredentialTypeRegistry::new();
        registry.register(bearer_type());
        assert!(registry.get("exampleApi").is_some());
        assert!(registry.get("other").is_none());
        assert_eq!(registry.descriptions().len(), 1);
    }
}
