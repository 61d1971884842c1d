//! Tool registry and built-in tools for the cligate tool-call protocol.
//!
//! This crate re-exposes the relay's two operations to calling agents:
//!
//! - [`Tool`]: Trait implemented by every callable tool
//! - [`ToolRegistry`]: Ordered registry used by `tools/list` and `tools/call`
//! - [`ToolSchema`]: Descriptor returned by `tools/list`
//! - [`PromptTool`]: `prompt`: run a prompt, return its text
//! - [`ListModelsTool`]: `list_models`: list available models
//!
//! # Using the Registry
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cligate_relay::Relay;
//! use cligate_tools::ToolRegistry;
//!
//! let registry = ToolRegistry::with_defaults(Arc::new(Relay::default()));
//! let text = registry.call("prompt", serde_json::json!({ "prompt": "hi" })).await?;
//! ```

mod list_models;
mod prompt;

pub use list_models::ListModelsTool;
pub use prompt::PromptTool;

use std::sync::Arc;

use async_trait::async_trait;
use cligate_core::RelayError;
use cligate_relay::Relay;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors that can occur during tool execution.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Requested tool was not found in the registry.
    #[error("Unknown tool: {0}")]
    NotFound(String),

    /// Invalid arguments were passed to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The underlying invocation failed.
    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Descriptor of a tool as listed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique name of the tool (e.g., "prompt", "list_models").
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema for the arguments, omitted for tools that take none.
    #[serde(rename = "inputSchema", default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

/// Trait for tools that can be called through the tool-call protocol.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name of this tool.
    fn name(&self) -> &str;

    /// Returns a description of what this tool does.
    fn description(&self) -> &str;

    /// Returns the JSON Schema for this tool's arguments, if it takes any.
    fn input_schema(&self) -> Option<serde_json::Value> {
        None
    }

    /// Executes the tool with the given arguments and returns its text output.
    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError>;

    /// Generates the descriptor for this tool.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Registry of callable tools, listed in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with `prompt` and `list_models` bound to `relay`.
    pub fn with_defaults(relay: Arc<Relay>) -> Self {
        let mut registry = Self::new();
        registry.register(PromptTool::new(relay.clone()));
        registry.register(ListModelsTool::new(relay));
        registry
    }

    /// Registers a tool, replacing any existing tool with the same name in place.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        let tool: Arc<dyn Tool> = Arc::new(tool);
        match self.tools.iter_mut().find(|t| t.name() == name) {
            Some(slot) => *slot = tool,
            None => self.tools.push(tool),
        }
    }

    /// Gets a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Returns descriptors for all registered tools.
    pub fn list(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    /// Returns true if a tool with the given name is registered.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Looks up and executes a tool. Unknown names fail before anything runs.
    pub async fn call(&self, name: &str, args: serde_json::Value) -> Result<String, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        info!("Calling tool: {}", name);
        tool.execute(args).await
    }
}
