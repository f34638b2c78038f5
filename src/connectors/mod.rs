//! Built-in vendor connectors.
//!
//! Each submodule defines one [`VendorConnector`](crate::connector::VendorConnector):
//! its inputs, its method table, and thin REST handlers on top of
//! [`HttpBackend`](crate::http::HttpBackend).

pub mod anthropic;
pub mod cursor;
pub mod github;
pub mod jules;
pub mod meshy;
pub mod slack;
pub mod vault;
pub mod zoom;

use serde_json::Value;

use crate::connector::Args;
use crate::error::BackendError;
use crate::registry::ConnectorDescriptor;

/// Descriptors of every built-in connector, in registration order.
pub fn builtin() -> Vec<ConnectorDescriptor> {
    vec![
        ConnectorDescriptor::of::<github::GitHub>(),
        ConnectorDescriptor::of::<slack::Slack>(),
        ConnectorDescriptor::of::<vault::Vault>(),
        ConnectorDescriptor::of::<zoom::Zoom>(),
        ConnectorDescriptor::of::<anthropic::Anthropic>(),
        ConnectorDescriptor::of::<cursor::Cursor>(),
        ConnectorDescriptor::of::<meshy::Meshy>(),
        ConnectorDescriptor::of::<jules::Jules>(),
    ]
}

// --- Argument helpers ---
//
// Arguments reaching a handler have been validated by the dispatcher, but
// handlers can also be driven directly, so required lookups still fail
// cleanly.

pub(crate) fn str_arg<'a>(args: &'a Args, name: &str) -> Result<&'a str, BackendError> {
    opt_str(args, name).ok_or_else(|| BackendError::Other(format!("missing argument '{name}'")))
}

pub(crate) fn opt_str<'a>(args: &'a Args, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

pub(crate) fn int_arg(args: &Args, name: &str, fallback: i64) -> i64 {
    args.get(name).and_then(Value::as_i64).unwrap_or(fallback)
}

pub(crate) fn bool_arg(args: &Args, name: &str, fallback: bool) -> bool {
    args.get(name).and_then(Value::as_bool).unwrap_or(fallback)
}

/// Array at `key`, or an empty list.
pub(crate) fn items(value: &Value, key: &str) -> Vec<Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
