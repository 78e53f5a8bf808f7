//! Stdio tool server.
//!
//! Reads one JSON-RPC request per line from stdin and writes one response per
//! line to stdout. Logging goes to stderr so it never mixes with responses.

mod protocol;
mod tools;

pub use protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    PROTOCOL_VERSION,
};
pub use tools::{ToolCallError, ToolOutput, definitions, call};

use crate::config::AppConfig;
use protocol::{failure, read_message, success, write_message};
use serde_json::{Value, json};
use std::io::{self, BufRead, Write};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Server {
    config: AppConfig,
}

impl Server {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Response for one raw line, or `None` for notifications.
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        match serde_json::from_str::<Value>(line) {
            Ok(request) => self.handle_request(&request),
            Err(err) => {
                warn!("Discarding unparsable request: {err}");
                Some(failure(Value::Null, PARSE_ERROR, format!("parse error: {err}")))
            }
        }
    }

    pub fn handle_request(&self, request: &Value) -> Option<Value> {
        let id = request.get("id").cloned();
        let Some(method) = request.get("method").and_then(Value::as_str) else {
            return Some(failure(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "request has no method",
            ));
        };
        let Some(id) = id else {
            debug!(method, "Notification received");
            return None;
        };
        let params = request.get("params").cloned().unwrap_or(Value::Null);

        let response = match method {
            "initialize" => success(id, self.initialize_result()),
            "ping" => success(id, json!({})),
            "tools/list" => success(id, json!({ "tools": definitions() })),
            "tools/call" => self.call_tool(id, params),
            other => {
                debug!(method = other, "Unknown method");
                failure(id, METHOD_NOT_FOUND, format!("method not found: {other}"))
            }
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": self.config.server_name,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn call_tool(&self, id: Value, params: Value) -> Value {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return failure(id, INVALID_PARAMS, "tools/call requires a tool name");
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let started = Instant::now();
        let outcome = call(&self.config, name, arguments);
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                info!(tool = name, duration_ms, "Tool call completed");
                success(
                    id,
                    json!({ "content": [{ "type": "text", "text": output.render() }] }),
                )
            }
            Err(ToolCallError::Book(err)) => {
                warn!(
                    tool = name,
                    duration_ms,
                    error_kind = %err.kind(),
                    operation = %err.operation(),
                    file_path = %err.path().display(),
                    "Tool call failed: {err}"
                );
                success(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": err.to_string() }],
                        "isError": true,
                        "_meta": {
                            "error_kind": err.kind(),
                            "operation": err.operation(),
                            "file_path": err.path().display().to_string()
                        }
                    }),
                )
            }
            Err(err @ ToolCallError::Encode { .. }) => {
                warn!(tool = name, duration_ms, "Tool result could not be encoded: {err}");
                failure(id, INTERNAL_ERROR, err.to_string())
            }
            Err(err) => {
                warn!(tool = name, "Rejected tool call: {err}");
                failure(id, INVALID_PARAMS, err.to_string())
            }
        }
    }
}

/// Serve requests from `reader` until it is exhausted.
pub fn serve(server: &Server, reader: &mut impl BufRead, writer: &mut impl Write) -> io::Result<()> {
    while let Some(line) = read_message(reader)? {
        if let Some(response) = server.handle_line(&line) {
            write_message(writer, &response)?;
        }
    }
    Ok(())
}

pub fn run_stdio(config: AppConfig) -> io::Result<()> {
    info!(name = %config.server_name, "Serving tools over stdio");
    let server = Server::new(config);
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(&server, &mut stdin.lock(), &mut stdout.lock())?;
    info!("Input closed; shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn exchange(requests: &[Value]) -> Vec<Value> {
        let input: String = requests.iter().map(|r| format!("{r}\n")).collect();
        let mut output = Vec::new();
        serve(
            &Server::new(AppConfig::default()),
            &mut Cursor::new(input),
            &mut output,
        )
        .expect("serve");
        String::from_utf8(output)
            .expect("utf8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }

    #[test]
    fn handshake_and_listing() {
        let responses = exchange(&[
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
            json!({ "jsonrpc": "2.0", "id": 3, "method": "ping" }),
        ]);
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "ebook-mcp");
        assert_eq!(responses[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        let names: Vec<&str> = responses[1]["result"]["tools"]
            .as_array()
            .expect("tools")
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert!(names.contains(&"get_epub_chapter"));
        assert!(names.contains(&"get_pdf_chapter"));
        assert_eq!(responses[2]["id"], 3);
    }

    #[test]
    fn unknown_method_and_bad_json() {
        let server = Server::new(AppConfig::default());
        let reply = server
            .handle_request(&json!({ "jsonrpc": "2.0", "id": 9, "method": "resources/list" }))
            .expect("reply");
        assert_eq!(reply["error"]["code"], METHOD_NOT_FOUND);

        let reply = server.handle_line("{not json").expect("reply");
        assert_eq!(reply["error"]["code"], PARSE_ERROR);
        assert_eq!(reply["id"], Value::Null);
    }

    #[test]
    fn book_failures_are_tool_errors_with_kind() {
        let server = Server::new(AppConfig::default());
        let reply = server
            .handle_request(&json!({
                "jsonrpc": "2.0",
                "id": "a",
                "method": "tools/call",
                "params": { "name": "get_epub_toc", "arguments": { "epub_path": "/missing.epub" } }
            }))
            .expect("reply");
        assert_eq!(reply["result"]["isError"], true);
        assert_eq!(reply["result"]["_meta"]["error_kind"], "file_not_found");
        assert_eq!(reply["result"]["_meta"]["operation"], "toc_extraction");
    }

    #[test]
    fn bad_arguments_and_unknown_tools_are_invalid_params() {
        let server = Server::new(AppConfig::default());
        for params in [
            json!({ "name": "get_pdf_page_text", "arguments": { "pdf_path": "x.pdf" } }),
            json!({ "name": "no_such_tool", "arguments": {} }),
            json!({ "arguments": {} }),
        ] {
            let reply = server
                .handle_request(&json!({ "jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": params }))
                .expect("reply");
            assert_eq!(reply["error"]["code"], INVALID_PARAMS);
        }
    }
}
