//! JSON-RPC dispatch for the `/sse` tool protocol.

use cligate_tools::{ToolError, ToolRegistry};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::dto::{RpcRequest, RpcResponse, RpcToolCallParams, ToolCallResponse, ToolListResponse};

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

const PROTOCOL_VERSION: &str = "1.0.0";
const SERVER_NAME: &str = "cligate";

/// Tool names used by older JSON-RPC clients, mapped to registered names.
const TOOL_ALIASES: &[(&str, &str)] = &[("llm_prompt", "prompt"), ("llm_models", "list_models")];

/// Parses a raw `/sse` body. An empty body carries no message.
pub fn parse_message(body: &[u8]) -> Result<Option<RpcRequest>, RpcResponse> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| RpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)))
}

/// Handles one JSON-RPC request against the tool registry.
pub async fn dispatch(tools: &ToolRegistry, request: RpcRequest) -> RpcResponse {
    let RpcRequest { id, method, params } = request;
    info!("JSON-RPC request: {}", method);

    match method.as_str() {
        "initialize" => RpcResponse::result(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
            }),
        ),
        "tools/list" => RpcResponse::result(id, to_value(&ToolListResponse { tools: tools.list() })),
        "tools/call" => call_tool(tools, id, params).await,
        other => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
    }
}

async fn call_tool(tools: &ToolRegistry, id: Value, params: Value) -> RpcResponse {
    let params: RpcToolCallParams = match params {
        Value::Null => RpcToolCallParams::default(),
        other => match serde_json::from_value(other) {
            Ok(params) => params,
            Err(e) => return RpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        },
    };

    match tools.call(canonical_tool_name(&params.name), params.arguments).await {
        Ok(text) => RpcResponse::result(id, to_value(&ToolCallResponse::text(text))),
        Err(e) => {
            warn!("Tool call '{}' failed: {}", params.name, e);
            let code = match e {
                ToolError::NotFound(_) => METHOD_NOT_FOUND,
                ToolError::InvalidArguments(_) => INVALID_PARAMS,
                ToolError::Relay(_) => INTERNAL_ERROR,
            };
            RpcResponse::error(id, code, e.to_string())
        }
    }
}

fn canonical_tool_name(name: &str) -> &str {
    TOOL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |&(_, canonical)| canonical)
}

fn to_value(body: &impl serde::Serialize) -> Value {
    serde_json::to_value(body).unwrap_or(Value::Null)
}
