//! hsn-agent: HSN code validation and document-corpus tools for LLM agents
//!
//! The tool functions in [`tools`] are the public surface; the CLI and the
//! MCP server in [`mcp`] are thin wrappers around them.

pub mod chunk;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod error;
pub mod hsn;
pub mod mcp;
pub mod parse;
pub mod progress;
pub mod session;
pub mod store;
pub mod tools;
