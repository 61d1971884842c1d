//! Data transfer objects for HTTP message serialization.

use cligate_tools::ToolSchema;
use serde::{Deserialize, Serialize};

// === REST Types ===

/// Response from the buffered prompt endpoint.
#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub response: String,
}

/// Response from the model listing endpoint.
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

/// Response from the health check.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// === SSE Types ===

/// Payload of one `data:` line on the prompt stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SseData {
    Text { text: String },
    Error { error: String },
    Done { done: bool, code: i32 },
}

impl SseData {
    pub fn done(code: i32) -> Self {
        SseData::Done { done: true, code }
    }
}

// === Tool-Call Types ===

/// Response from `tools/list`.
#[derive(Debug, Serialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolSchema>,
}

/// Request body for `tools/call`.
#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// One block of tool output.
#[derive(Debug, Clone, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Response from `tools/call`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResponse {
    pub content: Vec<ContentBlock>,
}

impl ToolCallResponse {
    /// Wraps tool output as a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock { kind: "text", text: text.into() }],
        }
    }
}

// === JSON-RPC Types ===

pub const JSONRPC_VERSION: &str = "2.0";

/// Incoming JSON-RPC message on `/sse`.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: serde_json::Value,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Parameters of a JSON-RPC `tools/call`.
#[derive(Debug, Default, Deserialize)]
pub struct RpcToolCallParams {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Outgoing JSON-RPC response.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn result(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, id, result: Some(result), error: None }
    }

    pub fn error(id: serde_json::Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(RpcError { code, message: message.into() }),
        }
    }
}

/// Outgoing JSON-RPC notification.
#[derive(Debug, Clone, Serialize)]
pub struct RpcNotification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: serde_json::Value,
}

impl RpcNotification {
    /// Sent first on every `/sse` connection.
    pub fn ready() -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: "connection/ready",
            params: serde_json::json!({}),
        }
    }
}
