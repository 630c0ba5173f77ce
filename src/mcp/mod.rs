//! MCP (Model Context Protocol) server
//!
//! Exposes the HSN and corpus tools to an LLM client over stdio.

mod server;
mod tools;
mod types;

pub use server::McpServer;
pub use tools::{get_tool_definitions, handle_tool_call};
pub use types::{McpError, McpRequest, McpResponse, ToolDefinition, ToolResult};
