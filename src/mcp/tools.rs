//! Tool registry for MCP tools.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::models::Effort;
use crate::research::AgentInvoker;

/// Name the deep search tool is registered under
pub const DEEP_SEARCH_TOOL: &str = "deep_search";

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "deep_search")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Errors a tool handler reports back to the MCP client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// The arguments did not match the tool's schema
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// The tool failed internally
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Set of tools a server exposes
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Tool>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the `deep_search` tool backed by `invoker`
    pub fn deep_search(invoker: AgentInvoker) -> Self {
        let mut registry = Self::new();
        registry.register(deep_search_tool(invoker));
        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools, ordered by name
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Names of all registered tools
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::InvalidParams(format!("Tool '{}' not found", name)))?;

        tool.handler.execute(args).await
    }
}

/// Build the `deep_search` tool definition
pub fn deep_search_tool(invoker: AgentInvoker) -> Tool {
    Tool {
        name: DEEP_SEARCH_TOOL.to_string(),
        description: "Perform a deep search on a given query using an advanced web research agent. \
             Returns an object containing the answer to the query and a list of sources used."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query string"
                },
                "effort": {
                    "type": "string",
                    "description": "Search effort: how many queries and research loops to run, and which model tier to use",
                    "enum": ["low", "medium", "high"],
                    "default": "low"
                }
            },
            "required": ["query"]
        }),
        handler: Arc::new(DeepSearchHandler { invoker }),
    }
}

/// Arguments accepted by `deep_search`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeepSearchArgs {
    pub query: String,

    #[serde(default)]
    pub effort: Option<Effort>,
}

impl DeepSearchArgs {
    /// Parse and validate raw tool arguments
    pub fn parse(args: Value) -> Result<Self, ToolError> {
        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args
        };

        let parsed: Self =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidParams(e.to_string()))?;

        if parsed.query.is_empty() {
            return Err(ToolError::InvalidParams(
                "'query' must not be empty".to_string(),
            ));
        }

        Ok(parsed)
    }

    /// Requested effort, defaulting to low
    pub fn effort(&self) -> Effort {
        self.effort.unwrap_or_default()
    }
}

/// Handler for the `deep_search` tool
#[derive(Debug)]
pub struct DeepSearchHandler {
    pub invoker: AgentInvoker,
}

#[async_trait::async_trait]
impl ToolHandler for DeepSearchHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args = DeepSearchArgs::parse(args)?;
        let response = self.invoker.deep_search(&args.query, args.effort()).await;

        serde_json::to_value(response).map_err(|e| ToolError::Internal(e.to_string()))
    }
}
