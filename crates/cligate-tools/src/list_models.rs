use std::sync::Arc;

use async_trait::async_trait;
use cligate_relay::Relay;

use crate::{Tool, ToolError};

/// List models tool - returns the external tool's models, one per line
pub struct ListModelsTool {
    relay: Arc<Relay>,
}

impl ListModelsTool {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl Tool for ListModelsTool {
    fn name(&self) -> &str {
        "list_models"
    }

    fn description(&self) -> &str {
        "List available LLM models"
    }

    async fn execute(&self, _args: serde_json::Value) -> Result<String, ToolError> {
        let models = self.relay.list_models().await?;
        Ok(models.join("\n"))
    }
}
