//! The context a node's `execute` runs against.

use friendgrid_workflow::{
    DataObject, Node, NodeExecutionData, NodeParameterValue, NodeTypeDescription, WorkflowError,
};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ExecutionEngineError;
use crate::expression::{self, lookup_path, ExpressionError, ExpressionResult};
use crate::request::{RequestHelper, RequestOptions};

/// Everything a node can see while processing one batch.
///
/// Parameter reads always name the item index explicitly; there is no
/// implicit "current item".
pub struct ExecuteContext {
    node: Node,
    description: NodeTypeDescription,
    items: Vec<NodeExecutionData>,
    helpers: Arc<dyn RequestHelper>,
}

impl ExecuteContext {
    pub fn new(
        node: Node,
        description: NodeTypeDescription,
        items: Vec<NodeExecutionData>,
        helpers: Arc<dyn RequestHelper>,
    ) -> Self {
        Self {
            node,
            description,
            items,
            helpers,
        }
    }

    /// The configured node instance.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// The ordered input batch.
    pub fn input_data(&self) -> &[NodeExecutionData] {
        &self.items
    }

    /// Resolve a parameter for item `item_index`.
    ///
    /// The node's configured value wins over the description default.
    /// Expressions are evaluated against the item's JSON. Index `0` is always
    /// accepted, so batch-level parameters can be read from an empty batch.
    pub fn node_parameter(
        &self,
        name: &str,
        item_index: usize,
    ) -> Result<NodeParameterValue, ExecutionEngineError> {
        let item = self.item(item_index)?;

        let raw = self
            .node
            .get_parameter(name)
            .or_else(|| self.description.property(name).and_then(|p| p.default.as_ref()))
            .ok_or_else(|| {
                WorkflowError::parameter(
                    &self.node.name,
                    format!("Could not get parameter '{name}'"),
                    item_index,
                )
            })?;

        if !contains_expression(raw) {
            return Ok(raw.clone());
        }

        let item_json = Value::Object(item.map(|i| i.json.clone()).unwrap_or_default());
        let resolver = |root: &str, path: &str| -> ExpressionResult<Option<Value>> {
            match root {
                "json" => Ok(lookup_path(&item_json, path).cloned()),
                "itemIndex" => Ok(Some(Value::from(item_index))),
                other => Err(ExpressionError::UndefinedVariable(other.to_string())),
            }
        };

        let resolved = expression::resolve_parameter(&raw.to_json(), &resolver)?;
        Ok(NodeParameterValue::from_json(&resolved))
    }

    /// Resolve a parameter that must be a scalar, rendered as a string.
    pub fn string_parameter(&self, name: &str, item_index: usize) -> Result<String, ExecutionEngineError> {
        match self.node_parameter(name, item_index)? {
            NodeParameterValue::String(s) => Ok(s),
            NodeParameterValue::Number(n) => Ok(n.to_string()),
            NodeParameterValue::Boolean(b) => Ok(b.to_string()),
            _ => Err(WorkflowError::parameter(
                &self.node.name,
                format!("Parameter '{name}' must be a string"),
                item_index,
            )
            .into()),
        }
    }

    /// Resolve a `collection` parameter as a JSON object.
    pub fn collection_parameter(&self, name: &str, item_index: usize) -> Result<DataObject, ExecutionEngineError> {
        match self.node_parameter(name, item_index)?.to_json() {
            Value::Object(map) => Ok(map),
            _ => Err(WorkflowError::parameter(
                &self.node.name,
                format!("Parameter '{name}' must be a collection"),
                item_index,
            )
            .into()),
        }
    }

    /// Send an authenticated request through the host helper.
    ///
    /// A rejected request becomes a [`WorkflowError::NodeApiError`] naming
    /// this node.
    pub async fn request_with_authentication(
        &self,
        credential_type: &str,
        options: RequestOptions,
    ) -> Result<Value, ExecutionEngineError> {
        self.helpers
            .request_with_authentication(credential_type, options)
            .await
            .map_err(|e| match e {
                ExecutionEngineError::HttpStatus { status, message } => {
                    WorkflowError::NodeApiError {
                        node: self.node.name.clone(),
                        message,
                        status_code: Some(status),
                    }
                    .into()
                }
                other => other,
            })
    }

    fn item(&self, item_index: usize) -> Result<Option<&NodeExecutionData>, ExecutionEngineError> {
        match self.items.get(item_index) {
            Some(item) => Ok(Some(item)),
            None if item_index == 0 => Ok(None),
            None => Err(WorkflowError::parameter(
                &self.node.name,
                format!(
                    "Item index {item_index} is out of range for {} input items",
                    self.items.len()
                ),
                item_index,
            )
            .into()),
        }
    }
}

fn contains_expression(value: &NodeParameterValue) -> bool {
    match value {
        NodeParameterValue::String(_) => value.is_expression(),
        NodeParameterValue::Array(values) => values.iter().any(contains_expression),
        NodeParameterValue::Object(map) => map.values().any(contains_expression),
        _ => false,
    }
}
