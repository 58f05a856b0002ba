//! Node types and definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::data::{NodeParameterValue, NodeParameters};

/// A configured node instance inside a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier for this node instance.
    pub id: String,
    /// Display name (unique within workflow).
    pub name: String,
    /// Node type identifier (e.g., "friendGrid").
    #[serde(rename = "type")]
    pub node_type: String,
    /// Version of the node type.
    pub type_version: u32,
    /// Node configuration parameters.
    #[serde(default)]
    pub parameters: NodeParameters,
}

impl Node {
    /// Create a new node with default settings.
    pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            node_type: node_type.into(),
            type_version: 1,
            parameters: NodeParameters::new(),
        }
    }

    /// Set a parameter value.
    pub fn set_parameter(&mut self, key: impl Into<String>, value: NodeParameterValue) {
        self.parameters.insert(key.into(), value);
    }

    /// Builder form of [`Node::set_parameter`].
    pub fn with_parameter(mut self, key: impl Into<String>, value: NodeParameterValue) -> Self {
        self.set_parameter(key, value);
        self
    }

    /// Get a parameter value.
    pub fn get_parameter(&self, key: &str) -> Option<&NodeParameterValue> {
        self.parameters.get(key)
    }
}

/// Node type connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConnectionConfig {
    /// Connection type name.
    #[serde(rename = "type")]
    pub connection_type: String,
    /// Display label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether this connection is required.
    #[serde(default)]
    pub required: bool,
}

impl NodeConnectionConfig {
    /// The default `main` connection.
    pub fn main() -> Self {
        Self {
            connection_type: "main".to_string(),
            display_name: None,
            required: false,
        }
    }
}

/// Conditions that decide whether a property is shown in the editor.
///
/// Every `show` key must currently hold one of its listed values, and no
/// `hide` key may.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DisplayOptions {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub show: HashMap<String, Vec<Value>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub hide: HashMap<String, Vec<Value>>,
}

impl DisplayOptions {
    /// Show only when `parameter` equals one of `values`.
    pub fn show(parameter: impl Into<String>, values: &[&str]) -> Self {
        Self::default().and_show(parameter, values)
    }

    pub fn and_show(mut self, parameter: impl Into<String>, values: &[&str]) -> Self {
        self.show.insert(
            parameter.into(),
            values.iter().map(|v| Value::String(v.to_string())).collect(),
        );
        self
    }

    /// Evaluate against the current parameters. Missing parameters fall back
    /// to the default declared on the sibling property of the same name.
    pub fn is_visible(&self, parameters: &NodeParameters, properties: &[NodeProperty]) -> bool {
        let current = |name: &str| -> Option<Value> {
            parameters
                .get(name)
                .or_else(|| {
                    properties
                        .iter()
                        .find(|p| p.name == name)
                        .and_then(|p| p.default.as_ref())
                })
                .map(NodeParameterValue::to_json)
        };

        let shown = self.show.iter().all(|(name, allowed)| {
            current(name).map_or(false, |value| allowed.contains(&value))
        });
        let hidden = self.hide.iter().any(|(name, blocked)| {
            current(name).map_or(false, |value| blocked.contains(&value))
        });

        shown && !hidden
    }
}

/// Node property definition for configuration UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeProperty {
    /// Property name/key.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Property type.
    #[serde(rename = "type")]
    pub property_type: NodePropertyType,
    /// Default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<NodeParameterValue>,
    /// Description/help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the property is required.
    #[serde(default)]
    pub required: bool,
    /// Placeholder text for inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Disallow expressions for this property.
    #[serde(default)]
    pub no_data_expression: bool,
    /// Mask the value in the editor (secrets).
    #[serde(default)]
    pub password: bool,
    /// Visibility conditions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_options: Option<DisplayOptions>,
    /// Choices for `options` properties, sub-fields for `collection` ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<PropertyOptions>,
}

impl NodeProperty {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        property_type: NodePropertyType,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            property_type,
            default: None,
            description: None,
            required: false,
            placeholder: None,
            no_data_expression: false,
            password: false,
            display_options: None,
            options: None,
        }
    }

    pub fn with_default(mut self, default: NodeParameterValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn no_data_expression(mut self) -> Self {
        self.no_data_expression = true;
        self
    }

    pub fn password(mut self) -> Self {
        self.password = true;
        self
    }

    pub fn with_display_options(mut self, display_options: DisplayOptions) -> Self {
        self.display_options = Some(display_options);
        self
    }

    pub fn with_values(mut self, values: Vec<NodePropertyOption>) -> Self {
        self.options = Some(PropertyOptions::Values(values));
        self
    }

    pub fn with_properties(mut self, properties: Vec<NodeProperty>) -> Self {
        self.options = Some(PropertyOptions::Properties(properties));
        self
    }

    /// Whether the property is shown for the given parameters.
    pub fn is_visible(&self, parameters: &NodeParameters, siblings: &[NodeProperty]) -> bool {
        self.display_options
            .as_ref()
            .map_or(true, |d| d.is_visible(parameters, siblings))
    }
}

/// Node property types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NodePropertyType {
    String,
    Number,
    Boolean,
    Options,
    MultiOptions,
    Collection,
    FixedCollection,
    Json,
    Notice,
}

/// Choice list of an `options` property or sub-fields of a `collection`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyOptions {
    Values(Vec<NodePropertyOption>),
    Properties(Vec<NodeProperty>),
}

/// Option for select properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodePropertyOption {
    /// Option display name.
    pub name: String,
    /// Option value.
    pub value: NodeParameterValue,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Action label shown in the node picker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl NodePropertyOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: NodeParameterValue::String(value.into()),
            description: None,
            action: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// Default values applied to a new node instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeDefaults {
    pub name: String,
}

/// Node type description - declarative metadata about node capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeDescription {
    /// Unique node type identifier.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Icon identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Node group/category.
    pub group: Vec<String>,
    /// Node version(s).
    pub version: NodeVersion,
    /// Description text.
    pub description: String,
    pub defaults: NodeDefaults,
    /// Input connections.
    pub inputs: Vec<NodeConnectionConfig>,
    /// Output connections.
    pub outputs: Vec<NodeConnectionConfig>,
    /// Credential requirements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Vec<NodeCredentialDescription>>,
    /// Node properties.
    pub properties: Vec<NodeProperty>,
}

impl NodeTypeDescription {
    /// Find a top-level property by name.
    pub fn property(&self, name: &str) -> Option<&NodeProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Parameters map holding every declared default.
    pub fn default_parameters(&self) -> NodeParameters {
        self.properties
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect()
    }

    /// Properties shown for the given parameters, in declaration order.
    pub fn visible_properties(&self, parameters: &NodeParameters) -> Vec<&NodeProperty> {
        self.properties
            .iter()
            .filter(|p| p.is_visible(parameters, &self.properties))
            .collect()
    }
}

/// Node version can be single or multiple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NodeVersion {
    Single(u32),
    Multiple(Vec<u32>),
}

/// Credential description for node type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCredentialDescription {
    /// Credential type name.
    pub name: String,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
}
