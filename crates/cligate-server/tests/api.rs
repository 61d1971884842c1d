#![cfg(unix)]

use std::sync::Arc;

use axum::body::Body;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use cligate_config::GatewayConfig;
use cligate_core::ToolCommand;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use cligate_server::{build_router, ServerState};

/// An app whose external tool is `sh -c <prompt>`; listing runs `list_script`.
fn app_with(program: &str, list_script: &str) -> axum::Router {
    let config = GatewayConfig {
        command: ToolCommand {
            program: program.to_string(),
            subcommand: "-c".to_string(),
            list_args: vec![list_script.to_string()],
        },
        ..GatewayConfig::default()
    };
    build_router(Arc::new(ServerState::new(config)))
}

fn app() -> axum::Router {
    app_with("sh", "printf 'gpt-4o-mini\\n\\ngpt-4o\\n'")
}

/// Send a request and return (status, headers, body text).
async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8_lossy(&body).into_owned())
}

async fn send_json(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, text) = send(app, method, uri, body).await;
    (status, serde_json::from_str(&text).unwrap_or(Value::Null))
}

/// Parses every `data:` line of an SSE body as JSON.
fn sse_payloads(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

#[tokio::test]
async fn health_reports_healthy() {
    let (status, body) = send_json(app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn prompt_returns_stdout() {
    let (status, body) = send_json(app(), "POST", "/prompt", Some(json!({ "prompt": "printf 'Hello!\\n'" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "response": "Hello!\n" }));
}

#[tokio::test]
async fn prompt_failure_returns_stderr_as_500() {
    let (status, body) = send_json(
        app(),
        "POST",
        "/prompt",
        Some(json!({ "prompt": "echo 'Unknown model: nope' >&2; exit 1", "model": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Unknown model: nope\n" }));
}

#[tokio::test]
async fn prompt_failure_without_stderr_uses_fallback() {
    let (status, body) = send_json(app(), "POST", "/prompt", Some(json!({ "prompt": "exit 9" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Command failed" }));
}

#[tokio::test]
async fn prompt_without_prompt_field_is_rejected() {
    let (status, _, _) = send(app(), "POST", "/prompt", Some(json!({ "model": "gpt-4o" }))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn models_lists_non_empty_lines() {
    let (status, body) = send_json(app(), "GET", "/models", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "models": ["gpt-4o-mini", "gpt-4o"] }));
}

#[tokio::test]
async fn models_failure_is_500() {
    let app = app_with("sh", "echo 'plugin error' >&2; exit 1");
    let (status, body) = send_json(app, "GET", "/models", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "plugin error\n" }));
}

#[tokio::test]
async fn sse_prompt_streams_text_errors_and_done() {
    let (status, headers, body) = send(
        app(),
        "POST",
        "/sse/prompt",
        Some(json!({ "prompt": "printf 'partial'; echo 'warning' >&2; exit 3" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "text/event-stream");
    assert_eq!(headers["x-accel-buffering"], "no");

    let payloads = sse_payloads(&body);
    assert!(payloads.contains(&json!({ "text": "partial" })), "body: {body}");
    assert!(payloads.contains(&json!({ "error": "warning\n" })), "body: {body}");
    assert_eq!(payloads.last(), Some(&json!({ "done": true, "code": 3 })));
    assert_eq!(payloads.iter().filter(|p| p.get("done").is_some()).count(), 1);
}

#[tokio::test]
async fn sse_prompt_spawn_failure_still_ends_with_done() {
    let app = app_with("cligate-no-such-binary", "true");
    let (status, _, body) = send(app, "POST", "/sse/prompt", Some(json!({ "prompt": "hi" }))).await;
    assert_eq!(status, StatusCode::OK);

    let payloads = sse_payloads(&body);
    assert_eq!(payloads.len(), 2, "body: {body}");
    assert!(payloads[0]["error"].as_str().unwrap().contains("cligate-no-such-binary"));
    assert_eq!(payloads[1], json!({ "done": true, "code": -1 }));
}

#[tokio::test]
async fn sse_prompt_disconnect_kills_child() {
    let request = Request::builder()
        .method("POST")
        .uri("/sse/prompt")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "prompt": "echo $$; exec sleep 30" }).to_string()))
        .unwrap();
    let resp = app().oneshot(request).await.unwrap();
    let mut body = resp.into_body();

    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let data = frame.into_data().unwrap();
    let payload = sse_payloads(std::str::from_utf8(&data).unwrap());
    let pid = payload[0]["text"].as_str().unwrap().trim().to_string();
    drop(body);

    let mut gone = false;
    for _ in 0..50 {
        let status = std::process::Command::new("kill")
            .args(["-0", &pid])
            .stderr(std::process::Stdio::null())
            .status()
            .unwrap();
        if !status.success() {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(gone, "child {} survived client disconnect", pid);
}

#[tokio::test]
async fn tools_list_describes_both_tools() {
    let (status, body) = send_json(app(), "POST", "/mcp/tools/list", None).await;
    assert_eq!(status, StatusCode::OK);

    let tools = body["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["name"], "prompt");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["prompt"]));
    assert_eq!(tools[1], json!({ "name": "list_models", "description": "List available LLM models" }));
}

#[tokio::test]
async fn tools_call_prompt_matches_prompt_endpoint() {
    let args = json!({ "prompt": "printf 'same text'" });
    let (_, direct) = send_json(app(), "POST", "/prompt", Some(args.clone())).await;
    let (status, body) = send_json(
        app(),
        "POST",
        "/mcp/tools/call",
        Some(json!({ "name": "prompt", "arguments": args })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "content": [{ "type": "text", "text": direct["response"] }] }));
}

#[tokio::test]
async fn tools_call_list_models_joins_lines() {
    let (status, body) = send_json(app(), "POST", "/mcp/tools/call", Some(json!({ "name": "list_models" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"][0]["text"], "gpt-4o-mini\ngpt-4o");
}

#[tokio::test]
async fn tools_call_unknown_is_400_without_spawning() {
    // A missing binary would turn any spawn into a 500.
    let app = app_with("cligate-no-such-binary", "true");
    let (status, body) = send_json(app, "POST", "/mcp/tools/call", Some(json!({ "name": "unknown", "arguments": {} }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Unknown tool: unknown" }));
}

#[tokio::test]
async fn tools_call_without_name_is_400() {
    let app = app_with("cligate-no-such-binary", "true");
    let (status, body) = send_json(app, "POST", "/mcp/tools/call", Some(json!({ "arguments": {} }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Unknown tool: " }));
}

#[tokio::test]
async fn tools_call_failure_is_500() {
    let (status, body) = send_json(
        app(),
        "POST",
        "/mcp/tools/call",
        Some(json!({ "name": "prompt", "arguments": { "prompt": "echo quota >&2; exit 1" } })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "quota\n" }));
}

#[tokio::test]
async fn rpc_get_sends_ready_only() {
    let (status, _, body) = send(app(), "GET", "/sse", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        sse_payloads(&body),
        [json!({ "jsonrpc": "2.0", "method": "connection/ready", "params": {} })]
    );
}

#[tokio::test]
async fn rpc_tools_call_runs_prompt() {
    let message = json!({
        "jsonrpc": "2.0",
        "id": 42,
        "method": "tools/call",
        "params": { "name": "prompt", "arguments": { "prompt": "printf rpc" } }
    });
    let (_, _, body) = send(app(), "POST", "/sse", Some(message)).await;

    let payloads = sse_payloads(&body);
    assert_eq!(payloads.len(), 2, "body: {body}");
    assert_eq!(payloads[0]["method"], "connection/ready");
    assert_eq!(
        payloads[1],
        json!({ "jsonrpc": "2.0", "id": 42, "result": { "content": [{ "type": "text", "text": "rpc" }] } })
    );
}

#[tokio::test]
async fn rpc_accepts_legacy_tool_names() {
    let message = json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": { "name": "llm_models" } });
    let (_, _, body) = send(app(), "POST", "/sse", Some(message)).await;

    let payloads = sse_payloads(&body);
    assert_eq!(payloads[1]["result"]["content"][0]["text"], "gpt-4o-mini\ngpt-4o");
}

#[tokio::test]
async fn rpc_unknown_tool_is_method_not_found() {
    let message = json!({ "jsonrpc": "2.0", "id": "a", "method": "tools/call", "params": { "name": "llm_nope" } });
    let (_, _, body) = send(app(), "POST", "/sse", Some(message)).await;

    let payloads = sse_payloads(&body);
    assert_eq!(payloads[1]["error"]["code"], -32601);
    assert_eq!(payloads[1]["id"], "a");
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/prompt")
        .header("origin", "http://example.com")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let resp = app().oneshot(request).await.unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}
