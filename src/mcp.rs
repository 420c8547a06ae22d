//! MCP relay: exposes the tool registry over JSON-RPC 2.0.

use crate::constants::*;
use crate::registry::ToolRegistry;
use crate::specs::mcp::*;
use serde_json::{json, Value};

/// Answers one JSON-RPC message. Notifications (no `id`) produce no response.
pub async fn handle_rpc(registry: &ToolRegistry, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = match request.id {
        Some(id) => id,
        None => {
            tracing::debug!("[🔌] MCP notification: {}", request.method);
            return None;
        }
    };

    if request.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::failure(
            id,
            JSONRPC_INVALID_REQUEST,
            "Invalid Request: jsonrpc must be \"2.0\"",
        ));
    }

    tracing::debug!("[🔌] MCP {} (id: {})", request.method, id);
    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        ),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => {
            let tools: Vec<_> = registry.definitions().map(|d| d.listing()).collect();
            match serde_json::to_value(tools) {
                Ok(list) => JsonRpcResponse::success(id, json!({ "tools": list })),
                Err(e) => JsonRpcResponse::failure(id, -32603, format!("Internal error: {}", e)),
            }
        }
        "tools/call" => call_tool(registry, id, request.params).await,
        other => JsonRpcResponse::failure(
            id,
            JSONRPC_METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        ),
    };
    Some(response)
}

async fn call_tool(registry: &ToolRegistry, id: Value, params: Value) -> JsonRpcResponse {
    let params: CallToolParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => {
            return JsonRpcResponse::failure(
                id,
                JSONRPC_INVALID_PARAMS,
                format!("Invalid params: {}", e),
            )
        }
    };

    let arguments = match params.arguments {
        Value::Null => json!({}),
        other => other,
    };
    let result = registry.invoke(&params.name, &arguments).await;
    let body = CallToolResult {
        content: vec![TextContent::new(result.text())],
        is_error: !result.success,
    };

    match serde_json::to_value(body) {
        Ok(v) => JsonRpcResponse::success(id, v),
        Err(e) => JsonRpcResponse::failure(id, -32603, format!("Internal error: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{tool_fn, ToolDefinition};
    use crate::tool_schema::{FieldType, InputSchema};

    fn registry() -> ToolRegistry {
        let mut r = ToolRegistry::new();
        r.register(
            ToolDefinition::new(
                "echo",
                "Echoes text.",
                InputSchema::new().required("text", FieldType::String),
            )
            .with_title("Echo"),
            tool_fn(|p| async move { Ok(p["text"].clone()) }),
        )
        .unwrap();
        r
    }

    fn req(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: Some(json!(1)),
        }
    }

    #[tokio::test]
    async fn test_tools_list() {
        let resp = handle_rpc(&registry(), req("tools/list", Value::Null)).await.unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["tools"][0]["name"], "echo");
        assert_eq!(result["tools"][0]["title"], "Echo");
        assert_eq!(result["tools"][0]["inputSchema"]["required"], json!(["text"]));
    }

    #[tokio::test]
    async fn test_tools_call_success_and_failure() {
        let r = registry();
        let ok = handle_rpc(&r, req("tools/call", json!({ "name": "echo", "arguments": { "text": "hi" } })))
            .await
            .unwrap()
            .result
            .unwrap();
        assert_eq!(ok, json!({ "content": [{ "type": "text", "text": "hi" }], "isError": false }));

        let bad = handle_rpc(&r, req("tools/call", json!({ "name": "echo", "arguments": {} })))
            .await
            .unwrap()
            .result
            .unwrap();
        assert_eq!(bad["isError"], true);
        assert!(bad["content"][0]["text"].as_str().unwrap().starts_with("Invalid input:"));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let r = registry();
        let unknown = handle_rpc(&r, req("resources/list", Value::Null)).await.unwrap();
        assert_eq!(unknown.error.unwrap().code, JSONRPC_METHOD_NOT_FOUND);

        let malformed = handle_rpc(&r, req("tools/call", json!({ "arguments": {} }))).await.unwrap();
        assert_eq!(malformed.error.unwrap().code, JSONRPC_INVALID_PARAMS);

        let mut note = req("notifications/initialized", Value::Null);
        note.id = None;
        assert!(handle_rpc(&r, note).await.is_none());
    }
}
