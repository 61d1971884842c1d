use std::sync::Arc;

use async_trait::async_trait;
use cligate_core::{PromptRequest, DEFAULT_MODEL};
use cligate_relay::Relay;
use serde_json::json;

use crate::{Tool, ToolError};

/// Prompt tool - sends a prompt through the relay and returns the model's text
pub struct PromptTool {
    relay: Arc<Relay>,
}

impl PromptTool {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl Tool for PromptTool {
    fn name(&self) -> &str {
        "prompt"
    }

    fn description(&self) -> &str {
        "Send a prompt to an LLM model"
    }

    fn input_schema(&self) -> Option<serde_json::Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "prompt": { "type": "string" },
                "model": { "type": "string", "default": DEFAULT_MODEL },
                "system": { "type": "string" },
                "temperature": { "type": "number" },
                "max_tokens": { "type": "number" }
            },
            "required": ["prompt"]
        }))
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let request: PromptRequest = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        Ok(self.relay.prompt(&request).await?)
    }
}
