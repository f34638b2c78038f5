//! Error taxonomy shared by every layer.
//!
//! [`ConnectorError`] is what the core returns internally. Vendor handlers
//! return [`BackendError`], which converts into [`ConnectorError::Backend`]
//! with its message untouched. Front ends never see either directly: the
//! dispatcher turns them into a serializable [`NormalizedError`] that carries
//! the [`ErrorKind`] plus the connector/method context.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Normalized error kinds surfaced to front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    MissingRequiredInput,
    UnknownConnector,
    UnknownMethod,
    UnknownFramework,
    InvalidArguments,
    BackendFailure,
    DuplicateConnector,
    InvalidDescriptor,
    Config,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingRequiredInput => "MissingRequiredInput",
            ErrorKind::UnknownConnector => "UnknownConnector",
            ErrorKind::UnknownMethod => "UnknownMethod",
            ErrorKind::UnknownFramework => "UnknownFramework",
            ErrorKind::InvalidArguments => "InvalidArguments",
            ErrorKind::BackendFailure => "BackendFailure",
            ErrorKind::DuplicateConnector => "DuplicateConnector",
            ErrorKind::InvalidDescriptor => "InvalidDescriptor",
            ErrorKind::Config => "Config",
        }
    }

    /// Process exit code used by the CLI. `1` is left for failures that never
    /// reached the connector layer (I/O on stdout, runtime startup).
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::InvalidArguments => 2,
            ErrorKind::MissingRequiredInput => 3,
            ErrorKind::UnknownConnector => 4,
            ErrorKind::UnknownMethod => 5,
            ErrorKind::UnknownFramework => 6,
            ErrorKind::Config => 7,
            ErrorKind::BackendFailure => 10,
            ErrorKind::DuplicateConnector => 11,
            ErrorKind::InvalidDescriptor => 12,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by vendor backends (HTTP transport, vendor API, payload).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport failure: connection refused, timeout, DNS, TLS.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The vendor answered with an error status or an error payload.
    #[error("{vendor} API error (HTTP {status}): {message}")]
    Vendor {
        vendor: &'static str,
        status: u16,
        message: String,
    },
    /// The vendor answered with something that is not the expected JSON.
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Returns `true` for an HTTP 404 from the vendor.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::Vendor { status: 404, .. })
    }
}

/// Core error type.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("missing required input '{input}'{hint}")]
    MissingRequiredInput { input: String, hint: String },

    #[error("unknown connector: '{0}'")]
    UnknownConnector(String),

    #[error("unknown method '{method}' on connector '{connector}'")]
    UnknownMethod { connector: String, method: String },

    #[error("Unknown framework: '{0}' (expected one of: auto, langchain, crewai, strands, functions)")]
    UnknownFramework(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("connector '{0}' is already registered")]
    DuplicateConnector(String),

    #[error("invalid connector descriptor: {0}")]
    InvalidDescriptor(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ConnectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectorError::MissingRequiredInput { .. } => ErrorKind::MissingRequiredInput,
            ConnectorError::UnknownConnector(_) => ErrorKind::UnknownConnector,
            ConnectorError::UnknownMethod { .. } => ErrorKind::UnknownMethod,
            ConnectorError::UnknownFramework(_) => ErrorKind::UnknownFramework,
            ConnectorError::InvalidArguments(_) => ErrorKind::InvalidArguments,
            ConnectorError::DuplicateConnector(_) => ErrorKind::DuplicateConnector,
            ConnectorError::InvalidDescriptor(_) => ErrorKind::InvalidDescriptor,
            ConnectorError::Backend(_) => ErrorKind::BackendFailure,
        }
    }

    /// Build a `MissingRequiredInput` without a source hint.
    pub fn missing(input: impl Into<String>) -> Self {
        ConnectorError::MissingRequiredInput {
            input: input.into(),
            hint: String::new(),
        }
    }
}

/// Error as seen by front ends: kind, original message, and call context.
///
/// `argument_shape` maps argument names to their JSON type names. Values are
/// never recorded, so secrets passed as arguments cannot leak through it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub argument_shape: IndexMap<String, String>,
}

impl NormalizedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            connector: None,
            method: None,
            argument_shape: IndexMap::new(),
        }
    }

    /// Attach the connector/method the failing call was aimed at.
    pub fn at(mut self, connector: &str, method: &str) -> Self {
        self.connector = Some(connector.to_string());
        self.method = Some(method.to_string());
        self
    }

    /// Record the shape (names and JSON types) of the call's arguments.
    pub fn with_argument_shape<'a>(
        mut self,
        args: impl IntoIterator<Item = (&'a String, &'a Value)>,
    ) -> Self {
        self.argument_shape = args
            .into_iter()
            .map(|(name, value)| (name.clone(), json_type_name(value).to_string()))
            .collect();
        self
    }

    /// Serialize for output (CLI stderr, MCP error content).
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "kind": self.kind.as_str(), "message": self.message })
        })
    }
}

impl From<ConnectorError> for NormalizedError {
    fn from(err: ConnectorError) -> Self {
        NormalizedError::new(err.kind(), err.to_string())
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let (Some(connector), Some(method)) = (&self.connector, &self.method) {
            write!(f, " [{connector}.{method}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for NormalizedError {}

/// JSON type name of a value, as used in argument shapes and validation errors.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_message_is_preserved_verbatim() {
        let err: ConnectorError = BackendError::Other("rate limited by upstream".into()).into();
        assert_eq!(err.kind(), ErrorKind::BackendFailure);
        let normalized = NormalizedError::from(err);
        assert_eq!(normalized.message, "rate limited by upstream");
    }

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let kinds = [
            ErrorKind::MissingRequiredInput,
            ErrorKind::UnknownConnector,
            ErrorKind::UnknownMethod,
            ErrorKind::UnknownFramework,
            ErrorKind::InvalidArguments,
            ErrorKind::BackendFailure,
            ErrorKind::DuplicateConnector,
            ErrorKind::InvalidDescriptor,
            ErrorKind::Config,
        ];
        let mut codes: Vec<i32> = kinds.iter().map(|k| k.exit_code()).collect();
        assert!(codes.iter().all(|&c| c > 1));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn argument_shape_records_types_not_values() {
        let args = json!({ "token": "hunter2", "limit": 10, "ratio": 0.5, "tags": ["a"] });
        let err = NormalizedError::new(ErrorKind::BackendFailure, "boom")
            .at("svc", "list_things")
            .with_argument_shape(args.as_object().unwrap());
        assert_eq!(err.argument_shape["token"], "string");
        assert_eq!(err.argument_shape["limit"], "integer");
        assert_eq!(err.argument_shape["ratio"], "number");
        assert_eq!(err.argument_shape["tags"], "array");
        let rendered = err.to_json().to_string();
        assert!(!rendered.contains("hunter2"));
        assert_eq!(err.to_string(), "BackendFailure: boom [svc.list_things]");
    }

    #[test]
    fn serialized_kind_uses_variant_name() {
        let err = NormalizedError::new(ErrorKind::UnknownMethod, "nope");
        assert_eq!(err.to_json()["kind"], "UnknownMethod");
        assert!(err.to_json().get("connector").is_none());
    }
}
