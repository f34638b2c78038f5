mod common;

use serde_json::{json, Map, Value};

use vendor_connectors::error::ErrorKind;
use vendor_connectors::inputs::Overrides;
use vendor_connectors::tools::{ConfiguredFrameworks, Framework, NativeTool};
use vendor_connectors::ToolCatalog;

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[tokio::test]
async fn call_fills_defaults_and_sorts_keys() {
    let dispatcher = common::dispatcher(&[("NOTES_TOKEN", "n-123")]);
    let result = dispatcher
        .call("notes", "add", args(json!({ "title": "groceries" })))
        .await
        .unwrap();

    assert_eq!(
        result,
        json!({
            "color": "yellow",
            "meta": { "id": 7, "workspace": "personal" },
            "pinned": false,
            "title": "groceries"
        })
    );
    let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["color", "meta", "pinned", "title"]);
    let meta_keys: Vec<&String> = result["meta"].as_object().unwrap().keys().collect();
    assert_eq!(meta_keys, ["id", "workspace"]);
}

#[tokio::test]
async fn unknown_connector_and_method() {
    let dispatcher = common::dispatcher(&[("NOTES_TOKEN", "n-123")]);

    let err = dispatcher
        .call("calendar", "list", Map::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownConnector);
    assert_eq!(err.kind.exit_code(), 4);

    let err = dispatcher.call("notes", "delete", Map::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownMethod);
    assert_eq!(err.connector.as_deref(), Some("notes"));
    assert_eq!(err.method.as_deref(), Some("delete"));
}

#[tokio::test]
async fn invalid_arguments_record_shape_not_values() {
    let dispatcher = common::dispatcher(&[("NOTES_TOKEN", "n-123")]);
    let err = dispatcher
        .call(
            "notes",
            "add",
            args(json!({ "title": 42, "tags": ["a"], "pinned": true })),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidArguments);
    assert!(err.message.contains("'title'"), "{}", err.message);
    assert_eq!(err.argument_shape["title"], "integer");
    assert_eq!(err.argument_shape["tags"], "array");
    assert_eq!(err.argument_shape["pinned"], "boolean");

    let rendered = err.to_json().to_string();
    assert!(!rendered.contains("42"));
}

#[tokio::test]
async fn enum_and_extra_parameters_are_rejected() {
    let dispatcher = common::dispatcher(&[("NOTES_TOKEN", "n-123")]);

    let err = dispatcher
        .call("notes", "add", args(json!({ "title": "x", "color": "red" })))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArguments);

    let err = dispatcher
        .call("notes", "whoami", args(json!({ "verbose": true })))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArguments);
    assert!(err.message.contains("verbose"));
}

#[tokio::test]
async fn missing_input_names_the_env_var() {
    let dispatcher = common::dispatcher(&[]);
    let err = dispatcher.call("notes", "whoami", Map::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingRequiredInput);
    assert!(err.message.contains("NOTES_TOKEN"), "{}", err.message);
    assert_eq!(dispatcher.registry().cached_count().await, 0);
}

#[tokio::test]
async fn backend_failure_keeps_vendor_message() {
    let dispatcher = common::dispatcher(&[("NOTES_TOKEN", "n-123")]);
    let err = dispatcher.call("notes", "outage", Map::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::BackendFailure);
    assert_eq!(err.message, "Notes API error (HTTP 503): maintenance window");
    assert_eq!(err.kind.exit_code(), 10);
}

#[tokio::test]
async fn overrides_win_and_get_their_own_instance() {
    let dispatcher = common::dispatcher(&[("NOTES_TOKEN", "n-123"), ("NOTES_WORKSPACE", "team")]);

    let from_env = dispatcher.call("notes", "whoami", Map::new()).await.unwrap();
    assert_eq!(from_env, json!({ "token_len": 5, "workspace": "team" }));

    let mut overrides = Overrides::new();
    overrides.insert("token".to_string(), json!("override-token"));
    let from_override = dispatcher
        .call_with("notes", "whoami", Map::new(), &overrides)
        .await
        .unwrap();
    assert_eq!(from_override["token_len"], 14);

    // Same inputs again: served from the cache.
    dispatcher.call("notes", "whoami", Map::new()).await.unwrap();
    assert_eq!(dispatcher.registry().cached_count().await, 2);
}

#[tokio::test]
async fn catalog_tools_route_through_the_dispatcher() {
    let dispatcher = common::dispatcher(&[("NOTES_TOKEN", "n-123")]);
    let catalog = ToolCatalog::all(&dispatcher).unwrap();
    assert_eq!(catalog.names(), ["notes_add", "notes_whoami", "notes_outage"]);

    let catalog = catalog.with_probe(ConfiguredFrameworks::new([Framework::CrewAi]));
    let tools = catalog.get_tools("auto").unwrap();
    assert_eq!(tools.len(), 3);
    assert!(matches!(tools[0], NativeTool::CrewAi(_)));

    let out = tools[0]
        .call(args(json!({ "title": "from crewai" })))
        .await
        .unwrap();
    let parsed: Value = serde_json::from_str(out.as_str().unwrap()).unwrap();
    assert_eq!(parsed["title"], "from crewai");

    let err = catalog.get_tools("autogen").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownFramework);
}
