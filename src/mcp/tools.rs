//! MCP tool definitions and dispatch

use super::types::{ToolDefinition, ToolResult};
use crate::tools::{corpus, documents, hsn, ToolContext, ToolResponse};
use serde_json::{json, Value};
use std::collections::HashMap;

fn definition(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn corpus_name_property(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

/// Every tool the server exposes
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        definition(
            "load_hsn_master",
            "Load (or reload) the HSN master table from a CSV/TSV file or spreadsheet with HSNCode and Description columns.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path to the master file (default: the configured hsn.master_path)"
                    }
                }
            }),
        ),
        definition(
            "validate_hsn_code",
            "Validate one or more HSN codes. Returns the description and 2/4/6/8-digit hierarchy for valid codes and close matches for unknown ones.",
            json!({
                "type": "object",
                "properties": {
                    "codes": {
                        "type": "string",
                        "description": "Codes separated by spaces and/or commas, e.g. \"01021090, 8517\""
                    }
                },
                "required": ["codes"]
            }),
        ),
        definition(
            "rag_query",
            "Answer a question. Requests like \"codes ending with 99\" are answered from the HSN table; anything else is searched in the corpus.",
            json!({
                "type": "object",
                "properties": {
                    "corpus_name": corpus_name_property("Corpus to search (empty: the current corpus)"),
                    "query": {
                        "type": "string",
                        "description": "Natural language question or code pattern request"
                    }
                },
                "required": ["query"]
            }),
        ),
        definition(
            "list_corpora",
            "List all available corpora.",
            json!({ "type": "object", "properties": {} }),
        ),
        definition(
            "create_corpus",
            "Create a new corpus. Characters outside A-Z, a-z, 0-9, '_' and '-' are replaced with '_'.",
            json!({
                "type": "object",
                "properties": {
                    "corpus_name": corpus_name_property("Name of the corpus to create")
                },
                "required": ["corpus_name"]
            }),
        ),
        definition(
            "get_corpus_info",
            "Show a corpus and the documents it contains.",
            json!({
                "type": "object",
                "properties": {
                    "corpus_name": corpus_name_property("Corpus to describe (empty: the current corpus)")
                }
            }),
        ),
        definition(
            "delete_corpus",
            "Delete a corpus and all of its documents. Requires confirm=true.",
            json!({
                "type": "object",
                "properties": {
                    "corpus_name": corpus_name_property("Corpus to delete"),
                    "confirm": {
                        "type": "boolean",
                        "description": "Must be true to actually delete",
                        "default": false
                    }
                },
                "required": ["corpus_name", "confirm"]
            }),
        ),
        definition(
            "add_data",
            "Import documents into a corpus. Accepts Google Drive/Docs links and gs:// URIs (Vertex) or local paths and http(s) URLs (local store).",
            json!({
                "type": "object",
                "properties": {
                    "corpus_name": corpus_name_property("Target corpus (empty: the current corpus)"),
                    "paths": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Documents to import"
                    }
                },
                "required": ["paths"]
            }),
        ),
        definition(
            "delete_document",
            "Remove one document from a corpus.",
            json!({
                "type": "object",
                "properties": {
                    "corpus_name": corpus_name_property("Corpus holding the document (empty: the current corpus)"),
                    "document_id": {
                        "type": "string",
                        "description": "Document id as shown by get_corpus_info"
                    }
                },
                "required": ["document_id"]
            }),
        ),
    ]
}

fn string_arg<'a>(arguments: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str)
}

/// Accept either an array of strings or a single string
fn string_list_arg(arguments: &HashMap<String, Value>, key: &str) -> Option<Vec<String>> {
    match arguments.get(key)? {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(ToString::to_string))
                .collect(),
        ),
        _ => None,
    }
}

fn missing(parameter: &str) -> ToolResult {
    ToolResult::error(format!("Missing required parameter: {}", parameter))
}

fn into_tool_result(response: ToolResponse) -> ToolResult {
    let text = serde_json::to_string_pretty(&response)
        .unwrap_or_else(|_| response.message.clone());
    if response.is_error() {
        ToolResult::error(text)
    } else {
        ToolResult::text(text)
    }
}

/// Run one tool call
pub async fn handle_tool_call(
    name: &str,
    arguments: &HashMap<String, Value>,
    ctx: &ToolContext,
) -> ToolResult {
    let corpus_name = string_arg(arguments, "corpus_name").unwrap_or("");

    let response = match name {
        "load_hsn_master" => hsn::load_hsn_master(ctx, string_arg(arguments, "path")),
        "validate_hsn_code" => match string_arg(arguments, "codes") {
            Some(codes) => hsn::validate_hsn_code(ctx, codes),
            None => return missing("codes"),
        },
        "rag_query" => match string_arg(arguments, "query") {
            Some(query) => documents::rag_query(ctx, corpus_name, query).await,
            None => return missing("query"),
        },
        "list_corpora" => corpus::list_corpora(ctx).await,
        "create_corpus" => corpus::create_corpus(ctx, corpus_name).await,
        "get_corpus_info" => corpus::get_corpus_info(ctx, corpus_name).await,
        "delete_corpus" => {
            let confirm = arguments
                .get("confirm")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            corpus::delete_corpus(ctx, corpus_name, confirm).await
        }
        "add_data" => match string_list_arg(arguments, "paths") {
            Some(paths) => documents::add_data(ctx, corpus_name, &paths).await,
            None => return missing("paths"),
        },
        "delete_document" => match string_arg(arguments, "document_id") {
            Some(document_id) => documents::delete_document(ctx, corpus_name, document_id).await,
            None => return missing("document_id"),
        },
        _ => return ToolResult::error(format!("Unknown tool: {}", name)),
    };

    into_tool_result(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hsn::CodeTable;
    use crate::mcp::types::ToolContent;
    use crate::tools::testing::{context, FakeCorpusService};
    use std::sync::Arc;

    fn args(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    fn text(result: &ToolResult) -> Value {
        let ToolContent::Text { text } = &result.content[0];
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let names: Vec<String> = get_tool_definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "load_hsn_master",
                "validate_hsn_code",
                "rag_query",
                "list_corpora",
                "create_corpus",
                "get_corpus_info",
                "delete_corpus",
                "add_data",
                "delete_document",
            ]
        );
    }

    #[tokio::test]
    async fn test_validate_call_returns_json_text() {
        let table: CodeTable = [("0102", "LIVE BOVINE ANIMALS")].into_iter().collect();
        let ctx = context(Arc::new(FakeCorpusService::default()), table);

        let result =
            handle_tool_call("validate_hsn_code", &args(json!({"codes": "0102"})), &ctx).await;
        assert_eq!(result.is_error, None);
        let body = text(&result);
        assert_eq!(body["status"], "success");
        assert_eq!(body["results"][0]["description"], "LIVE BOVINE ANIMALS");
    }

    #[tokio::test]
    async fn test_missing_parameter_and_unknown_tool() {
        let ctx = context(Arc::new(FakeCorpusService::default()), CodeTable::new());

        let result = handle_tool_call("rag_query", &HashMap::new(), &ctx).await;
        assert_eq!(result.is_error, Some(true));

        let result = handle_tool_call("rag_search", &HashMap::new(), &ctx).await;
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_add_data_accepts_single_path() {
        let service = Arc::new(FakeCorpusService::with_corpus("tariffs"));
        let ctx = context(service.clone(), CodeTable::new());

        let result = handle_tool_call(
            "add_data",
            &args(json!({"corpus_name": "tariffs", "paths": "gs://bucket/a.pdf"})),
            &ctx,
        )
        .await;
        assert_eq!(text(&result)["files_added"], 1);
    }

    #[tokio::test]
    async fn test_error_responses_flag_is_error() {
        let service = Arc::new(FakeCorpusService::with_corpus("tariffs"));
        let ctx = context(service, CodeTable::new());

        let result = handle_tool_call(
            "delete_corpus",
            &args(json!({"corpus_name": "tariffs"})),
            &ctx,
        )
        .await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text(&result)["status"], "error");
    }
}
