//! FriendGrid node: creates (upserts) SendGrid marketing contacts.
//!
//! One authenticated `PUT /marketing/contacts` is issued per input item, in
//! input order. The first failing item fails the whole batch; responses of
//! earlier items are dropped.

use async_trait::async_trait;
use friendgrid_core::{ExecuteContext, ExecutionEngineError, NodeExecutor, NodeOutput, RequestOptions};
use friendgrid_workflow::{
    return_json_array, DataObject, DisplayOptions, HttpMethod, NodeConnectionConfig,
    NodeCredentialDescription, NodeDefaults, NodeParameterValue, NodeProperty,
    NodePropertyOption, NodePropertyType, NodeTypeDescription, NodeVersion, WorkflowError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::credentials::{FRIEND_GRID_API, SENDGRID_API_BASE};

/// Node type name.
pub const FRIEND_GRID: &str = "friendGrid";

/// Endpoint that upserts marketing contacts.
pub fn contacts_url() -> String {
    format!("{SENDGRID_API_BASE}/marketing/contacts")
}

/// Resources the node can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Contact,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Contact => "contact",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "contact" => Some(Resource::Contact),
            _ => None,
        }
    }
}

/// Operations on the `contact` resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOperation {
    Create,
}

impl ContactOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactOperation::Create => "create",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(ContactOperation::Create),
            _ => None,
        }
    }
}

/// A resolved resource/operation pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Contact(ContactOperation),
}

impl Selector {
    /// Combine the two selector parameters. Any unknown value yields `None`.
    pub fn parse(resource: &str, operation: &str) -> Option<Self> {
        match Resource::parse(resource)? {
            Resource::Contact => ContactOperation::parse(operation).map(Selector::Contact),
        }
    }
}

/// Build the contact object for one item.
///
/// The base object holds `email`; additional fields are assigned on top, so
/// a colliding key in `additional_fields` wins. Blank strings are left out.
pub fn build_contact_payload(email: &str, additional_fields: DataObject) -> DataObject {
    let mut contact = DataObject::new();
    contact.insert("email".to_string(), Value::String(email.to_string()));

    for (key, value) in additional_fields {
        if matches!(&value, Value::String(s) if s.is_empty()) {
            continue;
        }
        contact.insert(key, value);
    }
    contact
}

/// The FriendGrid node executor.
pub struct FriendGridNode;

impl FriendGridNode {
    async fn create_contact(
        &self,
        context: &ExecuteContext,
        item_index: usize,
    ) -> Result<Value, ExecutionEngineError> {
        let email = context.string_parameter("email", item_index)?;
        if email.is_empty() {
            return Err(WorkflowError::parameter(
                &context.node().name,
                "Parameter 'email' is required",
                item_index,
            )
            .into());
        }
        let additional_fields = context.collection_parameter("additionalFields", item_index)?;
        let contact = build_contact_payload(&email, additional_fields);

        let options = RequestOptions::new(HttpMethod::Put, contacts_url())
            .header("Accept", "application/json")
            .json_body(json!({ "contacts": [contact] }));

        debug!(item_index, "upserting contact");
        context
            .request_with_authentication(FRIEND_GRID_API, options)
            .await
    }
}

#[async_trait]
impl NodeExecutor for FriendGridNode {
    fn node_type(&self) -> &str {
        FRIEND_GRID
    }

    fn description(&self) -> NodeTypeDescription {
        friend_grid_description()
    }

    async fn execute(&self, context: &ExecuteContext) -> Result<NodeOutput, ExecutionEngineError> {
        let items = context.input_data();

        // Selectors are batch-level: read once, from item 0.
        let resource = context.string_parameter("resource", 0)?;
        let operation = context.string_parameter("operation", 0)?;
        let selector = Selector::parse(&resource, &operation);
        if selector.is_none() && !items.is_empty() {
            warn!(%resource, %operation, "unsupported resource/operation, no requests issued");
        }

        let mut responses = Vec::with_capacity(items.len());
        for item_index in 0..items.len() {
            match selector {
                Some(Selector::Contact(ContactOperation::Create)) => {
                    responses.push(self.create_contact(context, item_index).await?);
                }
                None => {}
            }
        }

        Ok(vec![return_json_array(responses)])
    }
}

/// Declarative description of the node's fields.
pub fn friend_grid_description() -> NodeTypeDescription {
    let contact_create = DisplayOptions::show("resource", &[Resource::Contact.as_str()])
        .and_show("operation", &[ContactOperation::Create.as_str()]);

    NodeTypeDescription {
        name: FRIEND_GRID.to_string(),
        display_name: "FriendGrid".to_string(),
        icon: Some("file:friendGrid.svg".to_string()),
        group: vec!["transform".to_string()],
        version: NodeVersion::Single(1),
        description: "Consume SendGrid API".to_string(),
        defaults: NodeDefaults {
            name: "FriendGrid".to_string(),
        },
        inputs: vec![NodeConnectionConfig::main()],
        outputs: vec![NodeConnectionConfig::main()],
        credentials: Some(vec![NodeCredentialDescription {
            name: FRIEND_GRID_API.to_string(),
            required: true,
        }]),
        properties: vec![
            NodeProperty::new("resource", "Resource", NodePropertyType::Options)
                .with_values(vec![NodePropertyOption::new("Contact", Resource::Contact.as_str())])
                .with_default(Resource::Contact.as_str().into())
                .no_data_expression()
                .required()
                .with_description("Create a new contact"),
            NodeProperty::new("operation", "Operation", NodePropertyType::Options)
                .with_display_options(DisplayOptions::show("resource", &[Resource::Contact.as_str()]))
                .with_values(vec![NodePropertyOption::new("Create", ContactOperation::Create.as_str())
                    .with_description("Create a contact")
                    .with_action("Create a contact")])
                .with_default(ContactOperation::Create.as_str().into())
                .no_data_expression(),
            NodeProperty::new("email", "Email", NodePropertyType::String)
                .required()
                .with_display_options(contact_create.clone())
                .with_default(NodeParameterValue::String(String::new()))
                .with_placeholder("name@email.com")
                .with_description("Primary email for the contact"),
            NodeProperty::new("additionalFields", "Additional Fields", NodePropertyType::Collection)
                .with_placeholder("Add Field")
                .with_default(NodeParameterValue::Object(HashMap::new()))
                .with_display_options(contact_create)
                .with_properties(vec![
                    NodeProperty::new("firstName", "First Name", NodePropertyType::String)
                        .with_default(NodeParameterValue::String(String::new())),
                    NodeProperty::new("lastName", "Last Name", NodePropertyType::String)
                        .with_default(NodeParameterValue::String(String::new())),
                ]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friendgrid_workflow::{NodeParameters, PropertyOptions};

    fn object(value: Value) -> DataObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_payload_merges_additional_fields() {
        let payload = build_contact_payload(
            "a@example.com",
            object(json!({"firstName": "Ada", "lastName": "Lovelace"})),
        );
        assert_eq!(
            Value::Object(payload),
            json!({"email": "a@example.com", "firstName": "Ada", "lastName": "Lovelace"})
        );
    }

    #[test]
    fn test_payload_additional_fields_win_on_collision() {
        let payload = build_contact_payload("a@example.com", object(json!({"email": "b@example.com"})));
        assert_eq!(payload["email"], "b@example.com");
    }

    #[test]
    fn test_payload_omits_blank_fields() {
        let payload = build_contact_payload("a@example.com", object(json!({"firstName": "", "lastName": "L"})));
        assert!(payload.get("firstName").is_none());
        assert_eq!(payload["lastName"], "L");
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!(
            Selector::parse("contact", "create"),
            Some(Selector::Contact(ContactOperation::Create))
        );
        assert_eq!(Selector::parse("list", "create"), None);
        assert_eq!(Selector::parse("contact", "delete"), None);
    }

    #[test]
    fn test_description_fields() {
        let description = friend_grid_description();
        let names: Vec<_> = description.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["resource", "operation", "email", "additionalFields"]);

        let email = description.property("email").unwrap();
        assert!(email.required);
        assert_eq!(email.placeholder.as_deref(), Some("name@email.com"));

        match &description.property("additionalFields").unwrap().options {
            Some(PropertyOptions::Properties(fields)) => {
                let names: Vec<_> = fields.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["firstName", "lastName"]);
            }
            other => panic!("unexpected options: {other:?}"),
        }
    }

    #[test]
    fn test_description_visibility() {
        let description = friend_grid_description();
        let visible: Vec<_> = description
            .visible_properties(&NodeParameters::new())
            .into_iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(visible.len(), 4);

        let mut params = NodeParameters::new();
        params.insert("resource".into(), "list".into());
        let visible: Vec<_> = description
            .visible_properties(&params)
            .into_iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(visible, vec!["resource"]);
    }

    #[test]
    fn test_description_wire_shape() {
        let value = serde_json::to_value(friend_grid_description()).unwrap();
        assert_eq!(value["name"], "friendGrid");
        assert_eq!(value["credentials"][0]["name"], "friendGridApi");
        assert_eq!(value["properties"][1]["displayOptions"]["show"]["resource"][0], "contact");
        assert_eq!(value["properties"][1]["options"][0]["action"], "Create a contact");
    }
}
