//! Data types for items flowing into and out of a node.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A map of string keys to JSON values (equivalent to IDataObject in the host).
pub type DataObject = serde_json::Map<String, Value>;

/// Paired item data for tracking which input item produced an output item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairedItemData {
    /// Index of the item in the source node's output.
    pub item: usize,
    /// Index of the input connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<usize>,
}

/// Individual execution data item flowing through nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionData {
    /// Primary JSON data payload.
    pub json: DataObject,
    /// Data lineage tracking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paired_item: Option<Vec<PairedItemData>>,
}

impl NodeExecutionData {
    /// Create new execution data with just JSON.
    pub fn new(json: DataObject) -> Self {
        Self {
            json,
            paired_item: None,
        }
    }

    /// Create from a raw JSON value. Anything but an object is rejected.
    pub fn from_json_value(value: Value) -> Result<Self, serde_json::Error> {
        let json: DataObject = serde_json::from_value(value)?;
        Ok(Self::new(json))
    }
}

impl Default for NodeExecutionData {
    fn default() -> Self {
        Self::new(DataObject::new())
    }
}

/// Turn raw response values into output items, one item per value, in order.
///
/// Objects become the item's `json` unchanged. Anything else (arrays, strings,
/// numbers, null) lands under a `data` key. No lineage is attached.
pub fn return_json_array(values: Vec<Value>) -> Vec<NodeExecutionData> {
    values
        .into_iter()
        .map(|value| {
            let json = match value {
                Value::Object(map) => map,
                other => {
                    let mut map = DataObject::new();
                    map.insert("data".to_string(), other);
                    map
                }
            };
            NodeExecutionData::new(json)
        })
        .collect()
}

/// Node parameter value types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NodeParameterValue {
    Boolean(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<NodeParameterValue>),
    Object(HashMap<String, NodeParameterValue>),
}

impl Default for NodeParameterValue {
    fn default() -> Self {
        NodeParameterValue::String(String::new())
    }
}

impl NodeParameterValue {
    /// Expressions are strings that start with `=`.
    pub fn is_expression(&self) -> bool {
        matches!(self, NodeParameterValue::String(s) if s.starts_with('='))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NodeParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, NodeParameterValue>> {
        match self {
            NodeParameterValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Convert into a plain JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            NodeParameterValue::Boolean(b) => Value::Bool(*b),
            NodeParameterValue::Number(n) => Value::Number(n.clone()),
            NodeParameterValue::String(s) => Value::String(s.clone()),
            NodeParameterValue::Array(arr) => {
                Value::Array(arr.iter().map(NodeParameterValue::to_json).collect())
            }
            NodeParameterValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Convert from a plain JSON value. `null` becomes an empty string.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => NodeParameterValue::String(String::new()),
            Value::Bool(b) => NodeParameterValue::Boolean(*b),
            Value::Number(n) => NodeParameterValue::Number(n.clone()),
            Value::String(s) => NodeParameterValue::String(s.clone()),
            Value::Array(arr) => {
                NodeParameterValue::Array(arr.iter().map(NodeParameterValue::from_json).collect())
            }
            Value::Object(map) => NodeParameterValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), NodeParameterValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for NodeParameterValue {
    fn from(v: &str) -> Self {
        NodeParameterValue::String(v.to_string())
    }
}

impl From<String> for NodeParameterValue {
    fn from(v: String) -> Self {
        NodeParameterValue::String(v)
    }
}

impl From<bool> for NodeParameterValue {
    fn from(v: bool) -> Self {
        NodeParameterValue::Boolean(v)
    }
}

/// Node parameters map.
pub type NodeParameters = HashMap<String, NodeParameterValue>;
