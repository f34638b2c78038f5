//! Offline `notes` connector shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use vendor_connectors::connector::{Args, MethodSpec, MethodTable, ParamSpec, ToolCategory};
use vendor_connectors::error::{BackendError, ConnectorError};
use vendor_connectors::inputs::{InputResolver, InputSpec, ResolvedConfig};
use vendor_connectors::{ConnectorDescriptor, ConnectorRegistry, Dispatcher, VendorConnector};

pub struct Notes {
    token: String,
    workspace: String,
}

impl VendorConnector for Notes {
    const NAME: &'static str = "notes";
    const CATEGORY: ToolCategory = ToolCategory::Slack;
    const DESCRIPTION: &'static str = "In-memory notes";

    fn inputs() -> Vec<InputSpec> {
        vec![
            InputSpec::new("token")
                .env("NOTES_TOKEN")
                .config_key("notes.token")
                .secret()
                .required(),
            InputSpec::new("workspace")
                .env("NOTES_WORKSPACE")
                .config_key("notes.workspace")
                .default_value("personal"),
        ]
    }

    fn build(config: &ResolvedConfig) -> Result<Self, ConnectorError> {
        Ok(Self {
            token: config.require_string("token")?,
            workspace: config.get_string("workspace").unwrap_or_default(),
        })
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new()
            .method(
                MethodSpec::new("add", "Add a note.")
                    .param(ParamSpec::string("title", "Note title.").required())
                    .param(ParamSpec::boolean("pinned", "Pin the note.").default(false))
                    .param(
                        ParamSpec::string("color", "Note color.")
                            .default("yellow")
                            .one_of(["yellow", "blue"]),
                    )
                    .param(ParamSpec::array("tags", "Tags.")),
                Self::add,
            )
            .method(MethodSpec::new("whoami", "Describe the session."), Self::whoami)
            .method(MethodSpec::new("outage", "Always fails."), Self::outage)
    }
}

impl Notes {
    fn add(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            Ok(json!({
                "title": args["title"],
                "pinned": args["pinned"],
                "color": args["color"],
                "meta": { "workspace": self.workspace, "id": 7 },
            }))
        })
    }

    fn whoami(&self, _args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            Ok(json!({ "workspace": self.workspace, "token_len": self.token.len() }))
        })
    }

    fn outage(&self, _args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            Err(BackendError::Vendor {
                vendor: "Notes",
                status: 503,
                message: "maintenance window".to_string(),
            })
        })
    }
}

pub fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A dispatcher over just the `notes` connector.
pub fn dispatcher(pairs: &[(&str, &str)]) -> Dispatcher {
    let mut registry = ConnectorRegistry::new(InputResolver::new().with_env(env(pairs)));
    registry
        .register(ConnectorDescriptor::of::<Notes>())
        .unwrap();
    Dispatcher::new(Arc::new(registry))
}
