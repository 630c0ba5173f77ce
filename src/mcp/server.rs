//! MCP stdio server

use super::tools::{get_tool_definitions, handle_tool_call};
use super::types::{ErrorCode, McpError, McpMessage, McpNotification, McpRequest, McpResponse};
use crate::tools::ToolContext;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use tracing::{debug, error, info, warn};

/// One server per conversation; the tool context carries the session state
pub struct McpServer {
    ctx: ToolContext,
}

impl McpServer {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    /// Serve requests from stdin until it closes
    pub async fn run(&self) -> Result<(), McpError> {
        info!("MCP server starting on stdio");
        let stdin = io::stdin();
        self.serve(stdin.lock(), io::stdout()).await?;
        info!("MCP server shutting down");
        Ok(())
    }

    /// Line-delimited JSON-RPC loop over any reader/writer pair
    pub async fn serve<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> Result<(), McpError> {
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!("Failed to read line: {}", e);
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            debug!("Received: {}", line);

            let message: McpMessage = match serde_json::from_str(&line) {
                Ok(m) => m,
                Err(e) => {
                    error!("Failed to parse message: {}", e);
                    let response =
                        McpResponse::error(None, ErrorCode::ParseError, format!("Parse error: {}", e));
                    writeln!(writer, "{}", serde_json::to_string(&response)?)?;
                    writer.flush()?;
                    continue;
                }
            };

            match message {
                McpMessage::Request(request) => {
                    let response = self.handle_request(request).await;
                    let encoded = serde_json::to_string(&response)?;
                    debug!("Sending: {}", encoded);
                    writeln!(writer, "{}", encoded)?;
                    writer.flush()?;
                }
                McpMessage::Notification(notification) => {
                    self.handle_notification(notification);
                }
                McpMessage::Response(_) => {
                    warn!("Unexpected response message received");
                }
            }
        }
        Ok(())
    }

    async fn handle_request(&self, request: McpRequest) -> McpResponse {
        let id = request.id;

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => McpResponse::success(id, json!({})),
            "tools/list" => McpResponse::success(id, json!({ "tools": get_tool_definitions() })),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            "resources/list" => McpResponse::success(id, json!({ "resources": [] })),
            "prompts/list" => McpResponse::success(id, json!({ "prompts": [] })),
            other => McpResponse::error(
                id,
                ErrorCode::MethodNotFound,
                format!("Method not found: {}", other),
            ),
        }
    }

    fn handle_notification(&self, notification: McpNotification) {
        match notification.method.as_str() {
            "notifications/initialized" => info!("Client initialized"),
            "notifications/cancelled" => info!("Request cancelled"),
            other => debug!("Unknown notification: {}", other),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> McpResponse {
        McpResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": { "listChanged": false },
                    "resources": { "subscribe": false, "listChanged": false },
                    "prompts": { "listChanged": false }
                },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> McpResponse {
        let Some(params) = params else {
            return McpResponse::error(id, ErrorCode::InvalidParams, "Missing params");
        };

        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return McpResponse::error(id, ErrorCode::InvalidParams, "Missing tool name");
        };

        let arguments: HashMap<String, Value> = params
            .get("arguments")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        debug!("Calling tool: {} with args: {:?}", name, arguments);
        let result = handle_tool_call(name, &arguments, &self.ctx).await;

        McpResponse::success(
            id,
            json!({
                "content": result.content,
                "isError": result.is_error.unwrap_or(false)
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hsn::CodeTable;
    use crate::tools::testing::{context, FakeCorpusService};
    use std::io::Cursor;
    use std::sync::Arc;

    fn server() -> McpServer {
        let table: CodeTable = [("01", "LIVE ANIMALS"), ("0102", "LIVE BOVINE ANIMALS")]
            .into_iter()
            .collect();
        McpServer::new(context(Arc::new(FakeCorpusService::default()), table))
    }

    async fn exchange(server: &McpServer, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        server
            .serve(Cursor::new(input.to_string()), &mut output)
            .await
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let responses = exchange(&server(), input).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let input = r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"validate_hsn_code","arguments":{"codes":"0102 12"}}}"#;
        let responses = exchange(&server(), input).await;

        let result = &responses[0]["result"];
        assert_eq!(result["isError"], false);
        let body: Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(body["results"][0]["status"], "valid");
        assert_eq!(body["results"][1]["status"], "not_found");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"does/not/exist"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call"}"#,
            "\n"
        );
        let responses = exchange(&server(), input).await;

        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["error"]["code"], -32601);
        assert_eq!(responses[2]["error"]["code"], -32602);
    }
}
