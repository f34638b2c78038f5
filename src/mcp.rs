//! MCP (Model Context Protocol) JSON-RPC handler.
//!
//! Implements the [MCP specification](https://spec.modelcontextprotocol.io/)
//! over stdio: JSON-RPC 2.0 requests are read one per line and responses are
//! written one per line.
//!
//! ## Supported methods
//!
//! | Method              | Description                                  |
//! |---------------------|----------------------------------------------|
//! | `initialize`        | Handshake, returns capabilities              |
//! | `tools/list`        | Every catalog tool with its `inputSchema`    |
//! | `tools/call`        | Run a tool through the dispatcher            |
//! | `ping`              | Liveness check                               |
//!
//! Notifications (`notifications/initialized`, `notifications/cancelled`) are
//! acknowledged silently. A failing tool call is reported as an `isError`
//! result carrying the normalized error; the loop keeps serving.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::connector::Args;
use crate::error::{json_type_name, ErrorKind, NormalizedError};
use crate::tools::ToolCatalog;

const SERVER_NAME: &str = "vendor-connectors";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Run the MCP server on the process's stdin/stdout until EOF.
pub async fn run_stdio(catalog: &ToolCatalog) {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    serve(reader, writer, catalog).await;
}

/// Serve JSON-RPC requests from `reader` until EOF, writing responses to
/// `writer`.
pub async fn serve<R, W>(mut reader: R, mut writer: W, catalog: &ToolCatalog)
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!(tools = catalog.len(), "MCP server ready");
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                warn!("stdin read error: {e}");
                break;
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                let response = json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": {
                        "code": -32700,
                        "message": format!("Parse error: {e}")
                    }
                });
                write_response(&mut writer, &response).await;
                continue;
            }
        };

        let id = request.get("id").cloned();
        let method = request.get("method").and_then(Value::as_str).unwrap_or("");

        // Notifications (no id): acknowledge silently
        if id.is_none() {
            match method {
                "notifications/initialized" | "notifications/cancelled" => {}
                _ => debug!(method, "ignoring unknown notification"),
            }
            continue;
        }

        let response = match method {
            "initialize" => handle_initialize(),
            "tools/list" => handle_tools_list(catalog),
            "tools/call" => handle_tools_call(&request, catalog).await,
            "ping" => json!({ "jsonrpc": "2.0", "result": {} }),
            _ => json!({
                "jsonrpc": "2.0",
                "error": {
                    "code": -32601,
                    "message": format!("Method not found: {method}")
                }
            }),
        };

        // Inject the request id into the response
        let response = inject_id(response, id);
        write_response(&mut writer, &response).await;
    }
    info!("MCP server stopped (EOF)");
}

/// Handle `initialize`: protocol version, capabilities, and server info.
fn handle_initialize() -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            }
        }
    })
}

fn handle_tools_list(catalog: &ToolCatalog) -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": {
            "tools": catalog.mcp_definitions()
        }
    })
}

/// Handle `tools/call`: look the tool up and invoke it.
async fn handle_tools_call(request: &Value, catalog: &ToolCatalog) -> Value {
    let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");

    let outcome = match (catalog.get(name), params.get("arguments")) {
        (None, _) => Err(NormalizedError::new(
            ErrorKind::UnknownMethod,
            format!("unknown tool: '{name}'"),
        )),
        (Some(tool), None | Some(Value::Null)) => tool.invoke(Args::new()).await,
        (Some(tool), Some(Value::Object(args))) => tool.invoke(args.clone()).await,
        (Some(tool), Some(other)) => Err(NormalizedError::new(
            ErrorKind::InvalidArguments,
            format!("arguments must be an object, got {}", json_type_name(other)),
        )
        .at(&tool.connector, &tool.method.name)),
    };

    let result = match outcome {
        Ok(value) => {
            let text = serde_json::to_string_pretty(&value).unwrap_or_default();
            json!({ "content": [{ "type": "text", "text": text }] })
        }
        Err(err) => {
            debug!(tool = name, kind = %err.kind, "tool call failed");
            let text = serde_json::to_string_pretty(&err.to_json()).unwrap_or_default();
            json!({
                "content": [{ "type": "text", "text": text }],
                "isError": true
            })
        }
    };

    json!({ "jsonrpc": "2.0", "result": result })
}

/// Inject the request `id` into a response object.
fn inject_id(mut response: Value, id: Option<Value>) -> Value {
    if let Some(id) = id {
        response["id"] = id;
    }
    response
}

/// Write one JSON-RPC message (one line, flushed immediately).
async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Value) {
    let mut output = serde_json::to_string(response).unwrap_or_default();
    output.push('\n');
    if let Err(e) = writer.write_all(output.as_bytes()).await {
        warn!("stdout write error: {e}");
    }
    if let Err(e) = writer.flush().await {
        warn!("stdout flush error: {e}");
    }
}
