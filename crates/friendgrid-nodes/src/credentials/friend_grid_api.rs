//! `friendGridApi` credential type: a single SendGrid API key sent as a
//! bearer token.

use friendgrid_workflow::{
    Authentication, CredentialTestRequest, CredentialTestWrapper, CredentialTypeDescription,
    HttpMethod, NodeParameterValue, NodeProperty, NodePropertyType,
};

/// Credential type name nodes refer to.
pub const FRIEND_GRID_API: &str = "friendGridApi";

/// Base URL of the SendGrid v3 API.
pub const SENDGRID_API_BASE: &str = "https://api.sendgrid.com/v3";

pub fn friend_grid_api() -> CredentialTypeDescription {
    CredentialTypeDescription {
        name: FRIEND_GRID_API.to_string(),
        display_name: "FriendGrid API".to_string(),
        properties: vec![NodeProperty::new("apiKey", "API Key", NodePropertyType::String)
            .with_default(NodeParameterValue::String(String::new()))
            .password()],
        authenticate: Some(Authentication::header(
            "Authorization",
            "=Bearer {{$credentials.apiKey}}",
        )),
        test: Some(CredentialTestWrapper {
            request: CredentialTestRequest {
                base_url: SENDGRID_API_BASE.to_string(),
                url: "/marketing/contacts".to_string(),
                method: HttpMethod::Get,
            },
        }),
    }
}
