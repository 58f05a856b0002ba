//! Node executor trait and registry.

use crate::context::ExecuteContext;
use crate::error::ExecutionEngineError;
use crate::request::RequestHelper;
use async_trait::async_trait;
use friendgrid_workflow::{Node, NodeExecutionData, NodeTypeDescription};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Result of node execution: one item list per output connection.
pub type NodeOutput = Vec<Vec<NodeExecutionData>>;

/// Trait for executing nodes.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Get the node type this executor handles.
    fn node_type(&self) -> &str;

    /// Declarative description of the node's fields and connections.
    fn description(&self) -> NodeTypeDescription;

    /// Execute the node over the context's input batch.
    async fn execute(&self, context: &ExecuteContext) -> Result<NodeOutput, ExecutionEngineError>;
}

/// Registry of node executors.
pub struct NodeExecutorRegistry {
    executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl NodeExecutorRegistry {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Register a node executor.
    pub fn register(&mut self, executor: Arc<dyn NodeExecutor>) {
        self.executors
            .insert(executor.node_type().to_string(), executor);
    }

    /// Get an executor for a node type.
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.executors.get(node_type).cloned()
    }

    /// Descriptions of every registered node type, sorted by name.
    pub fn descriptions(&self) -> Vec<NodeTypeDescription> {
        let mut all: Vec<_> = self.executors.values().map(|e| e.description()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Run `node` over `items` with the executor registered for its type.
    #[instrument(skip(self, node, items, helpers), fields(node = %node.name, node_type = %node.node_type))]
    pub async fn run_node(
        &self,
        node: &Node,
        items: Vec<NodeExecutionData>,
        helpers: Arc<dyn RequestHelper>,
    ) -> Result<NodeOutput, ExecutionEngineError> {
        let executor = self
            .get(&node.node_type)
            .ok_or_else(|| ExecutionEngineError::NodeTypeNotFound(node.node_type.clone()))?;

        let input_count = items.len();
        let context = ExecuteContext::new(node.clone(), executor.description(), items, helpers);
        let output = executor.execute(&context).await?;

        info!(
            input_items = input_count,
            output_items = output.iter().map(Vec::len).sum::<usize>(),
            "node finished"
        );
        Ok(output)
    }
}

impl Default for NodeExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
