//! Method dispatcher: the single call path shared by every front end.
//!
//! [`Dispatcher::call`] looks the connector up in the registry, checks the
//! method exists, validates the arguments against its [`MethodSpec`], invokes
//! it, and normalizes the result. Any failure comes back as a
//! [`NormalizedError`] tagged with the connector, method and argument shape.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::connector::{Args, MethodSpec};
use crate::error::{json_type_name, ConnectorError, NormalizedError};
use crate::inputs::Overrides;
use crate::registry::ConnectorRegistry;

/// Routes calls to connector methods.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectorRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectorRegistry> {
        &self.registry
    }

    /// Call `connector.method(args)` with inputs from the ambient sources.
    pub async fn call(
        &self,
        connector: &str,
        method: &str,
        args: Args,
    ) -> Result<Value, NormalizedError> {
        self.call_with(connector, method, args, &Overrides::new())
            .await
    }

    /// Like [`call`](Self::call), with explicit input overrides.
    pub async fn call_with(
        &self,
        connector: &str,
        method: &str,
        args: Args,
        overrides: &Overrides,
    ) -> Result<Value, NormalizedError> {
        let shape_source = args.clone();
        match self.invoke(connector, method, args, overrides).await {
            Ok(value) => Ok(normalize(value)),
            Err(err) => {
                let normalized = NormalizedError::from(err)
                    .at(connector, method)
                    .with_argument_shape(&shape_source);
                warn!(
                    connector,
                    method,
                    kind = %normalized.kind,
                    "call failed: {}",
                    normalized.message
                );
                Err(normalized)
            }
        }
    }

    async fn invoke(
        &self,
        connector: &str,
        method: &str,
        args: Args,
        overrides: &Overrides,
    ) -> Result<Value, ConnectorError> {
        let instance = self.registry.get(connector, overrides).await?;
        let spec = instance
            .method_spec(method)
            .ok_or_else(|| ConnectorError::UnknownMethod {
                connector: connector.to_string(),
                method: method.to_string(),
            })?;
        let args = validate_args(spec, args)?;
        debug!(connector, method, args = args.len(), "dispatching");
        instance.invoke_method(method, args).await
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

/// Check `args` against `spec` and fill defaults.
///
/// Rejects unknown parameters, missing required ones, values of the wrong
/// JSON type and values outside a declared `enum`. A `null` counts as absent.
/// The returned map follows the parameter declaration order.
pub fn validate_args(spec: &MethodSpec, mut args: Args) -> Result<Args, ConnectorError> {
    if let Some(extra) = args.keys().find(|k| spec.find_param(k).is_none()) {
        return Err(ConnectorError::InvalidArguments(format!(
            "unexpected parameter '{extra}' for method '{}'",
            spec.name
        )));
    }

    let mut validated = Map::new();
    for param in &spec.params {
        match args.remove(&param.name).filter(|v| !v.is_null()) {
            Some(value) => {
                if !param.kind.accepts(&value) {
                    return Err(ConnectorError::InvalidArguments(format!(
                        "parameter '{}' expects {}, got {}",
                        param.name,
                        param.kind.as_str(),
                        json_type_name(&value)
                    )));
                }
                if !param.enum_values.is_empty() && !param.enum_values.contains(&value) {
                    let allowed: Vec<String> =
                        param.enum_values.iter().map(Value::to_string).collect();
                    return Err(ConnectorError::InvalidArguments(format!(
                        "parameter '{}' must be one of {}, got {value}",
                        param.name,
                        allowed.join(", ")
                    )));
                }
                validated.insert(param.name.clone(), value);
            }
            None if param.required => {
                return Err(ConnectorError::InvalidArguments(format!(
                    "missing required parameter '{}'",
                    param.name
                )));
            }
            None => {
                if let Some(default) = &param.default {
                    validated.insert(param.name.clone(), default.clone());
                }
            }
        }
    }
    Ok(validated)
}

/// Canonical form of a result: object keys sorted at every depth, arrays
/// in their original order, scalars untouched.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, normalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

/// String leaf for values with no JSON form (timestamps, ids, custom types).
pub fn stringify(value: impl fmt::Display) -> Value {
    Value::String(value.to_string())
}

/// Number leaf for a float; NaN and infinities become strings.
pub fn float(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| stringify(value))
}
