mod common;

use serde_json::{json, Value};
use tokio::io::BufReader;

use vendor_connectors::mcp;
use vendor_connectors::ToolCatalog;

async fn session(requests: &[Value]) -> Vec<Value> {
    let dispatcher = common::dispatcher(&[("NOTES_TOKEN", "n-123")]);
    let catalog = ToolCatalog::all(&dispatcher).unwrap();

    let mut input = String::new();
    for request in requests {
        input.push_str(&request.to_string());
        input.push('\n');
    }
    let mut output = Vec::new();
    mcp::serve(BufReader::new(input.as_bytes()), &mut output, &catalog).await;

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
}

fn text_payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn lists_dispatched_tools_with_schemas() {
    let responses = session(&[
        json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
    ])
    .await;
    assert_eq!(responses.len(), 2);

    let tools = responses[1]["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(names, ["notes_add", "notes_whoami", "notes_outage"]);

    let schema = &tools[0]["inputSchema"];
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["required"], json!(["title"]));
    assert_eq!(schema["properties"]["color"]["enum"], json!(["yellow", "blue"]));
    assert_eq!(schema["additionalProperties"], false);
}

#[tokio::test]
async fn error_result_then_next_call_still_served() {
    let responses = session(&[
        call(1, "notes_add", json!({})),
        call(2, "notes_outage", json!({})),
        call(3, "notes_add", json!({ "title": "after errors", "pinned": true })),
    ])
    .await;
    assert_eq!(responses.len(), 3);

    assert_eq!(responses[0]["result"]["isError"], true);
    let missing = text_payload(&responses[0]);
    assert_eq!(missing["kind"], "InvalidArguments");
    assert_eq!(missing["connector"], "notes");
    assert_eq!(missing["method"], "add");

    assert_eq!(responses[1]["result"]["isError"], true);
    let outage = text_payload(&responses[1]);
    assert_eq!(outage["kind"], "BackendFailure");
    assert_eq!(outage["message"], "Notes API error (HTTP 503): maintenance window");

    assert_eq!(responses[2]["id"], 3);
    assert!(responses[2]["result"].get("isError").is_none());
    let added = text_payload(&responses[2]);
    assert_eq!(added["title"], "after errors");
    assert_eq!(added["pinned"], true);
    assert_eq!(added["color"], "yellow");
}
