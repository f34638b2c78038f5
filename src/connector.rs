//! Connector base: the per-type [`VendorConnector`] contract, explicit method
//! tables, and the object-safe [`Connector`] the registry hands out.
//!
//! A vendor connector is a plain struct built from a [`ResolvedConfig`]. Its
//! callable surface is declared once in a [`MethodTable`]: a name, a
//! [`MethodSpec`] describing parameters, and a typed handler fn. Nothing is
//! discovered by reflection, so the tool catalog and the MCP `tools/list`
//! output are exactly the table's contents.

use std::fmt;
use std::str::FromStr;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{BackendError, ConnectorError};
use crate::inputs::{InputSpec, ResolvedConfig};

/// Named call arguments.
pub type Args = serde_json::Map<String, Value>;

/// Typed method handler. Borrows the connector for the life of the call.
pub type Handler<C> = for<'a> fn(&'a C, Args) -> BoxFuture<'a, Result<Value, BackendError>>;

/// Vendor families. Every connector (and so every tool) belongs to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Aws,
    Github,
    Slack,
    Vault,
    GoogleCloud,
    Zoom,
    Meshy,
    Cursor,
    Anthropic,
    Jules,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 10] = [
        ToolCategory::Aws,
        ToolCategory::Github,
        ToolCategory::Slack,
        ToolCategory::Vault,
        ToolCategory::GoogleCloud,
        ToolCategory::Zoom,
        ToolCategory::Meshy,
        ToolCategory::Cursor,
        ToolCategory::Anthropic,
        ToolCategory::Jules,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolCategory::Aws => "aws",
            ToolCategory::Github => "github",
            ToolCategory::Slack => "slack",
            ToolCategory::Vault => "vault",
            ToolCategory::GoogleCloud => "google_cloud",
            ToolCategory::Zoom => "zoom",
            ToolCategory::Meshy => "meshy",
            ToolCategory::Cursor => "cursor",
            ToolCategory::Anthropic => "anthropic",
            ToolCategory::Jules => "jules",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolCategory {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ToolCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ConnectorError::InvalidArguments(format!("unknown tool category '{s}'")))
    }
}

/// JSON type accepted by a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
        }
    }

    /// Whether `value` is an instance of this JSON type. Integers are
    /// accepted where a number is expected.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Array => value.is_array(),
            ParamKind::Object => value.is_object(),
        }
    }
}

/// One method parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            default: None,
            enum_values: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Integer, description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Number, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    pub fn array(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Array, description)
    }

    pub fn object(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Object, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn one_of<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// JSON Schema property for this parameter.
    pub fn json_schema(&self) -> Value {
        let mut prop = serde_json::Map::new();
        prop.insert("type".to_string(), json!(self.kind.as_str()));
        if !self.description.is_empty() {
            prop.insert("description".to_string(), json!(self.description));
        }
        if let Some(ref default) = self.default {
            prop.insert("default".to_string(), default.clone());
        }
        if !self.enum_values.is_empty() {
            prop.insert("enum".to_string(), json!(self.enum_values));
        }
        Value::Object(prop)
    }
}

/// Public description of one connector method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn find_param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON Schema object describing the method's arguments.
    pub fn json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            properties.insert(param.name.clone(), param.json_schema());
            if param.required {
                required.push(json!(param.name));
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }
}

/// Method name → (spec, handler), in declaration order.
pub struct MethodTable<C> {
    entries: IndexMap<String, (MethodSpec, Handler<C>)>,
    duplicates: Vec<String>,
}

impl<C> Default for MethodTable<C> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            duplicates: Vec::new(),
        }
    }
}

impl<C> MethodTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a method. A repeated name is remembered and rejected when the
    /// connector is registered.
    pub fn method(mut self, spec: MethodSpec, handler: Handler<C>) -> Self {
        if self.entries.contains_key(&spec.name) {
            self.duplicates.push(spec.name.clone());
        } else {
            self.entries.insert(spec.name.clone(), (spec, handler));
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<(&MethodSpec, Handler<C>)> {
        self.entries.get(name).map(|(spec, handler)| (spec, *handler))
    }

    pub fn specs(&self) -> impl Iterator<Item = &MethodSpec> {
        self.entries.values().map(|(spec, _)| spec)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }
}

/// Static contract implemented by each vendor connector type.
pub trait VendorConnector: Sized + Send + Sync + 'static {
    /// Logical name used by the registry, the CLI and as tool-name prefix.
    const NAME: &'static str;
    const CATEGORY: ToolCategory;
    const DESCRIPTION: &'static str;

    /// Inputs this connector needs, in resolution order.
    fn inputs() -> Vec<InputSpec>;

    /// Construct from resolved inputs. Must not perform network I/O.
    fn build(config: &ResolvedConfig) -> Result<Self, ConnectorError>;

    fn methods() -> MethodTable<Self>;
}

/// A constructed connector, as handed out by the registry.
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> ToolCategory;

    /// The inputs this instance was built from.
    fn config(&self) -> &ResolvedConfig;

    fn method_specs(&self) -> Vec<&MethodSpec>;

    fn method_spec(&self, method: &str) -> Option<&MethodSpec>;

    /// Run `method`. An unknown name fails with `UnknownMethod` before any
    /// backend is touched. Otherwise the handler's result is returned as is.
    fn invoke_method<'a>(
        &'a self,
        method: &str,
        args: Args,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>>;
}

/// A vendor connector together with its config and method table.
pub struct Bound<C> {
    inner: C,
    config: ResolvedConfig,
    methods: MethodTable<C>,
}

impl<C: VendorConnector> Bound<C> {
    pub fn build(config: ResolvedConfig) -> Result<Self, ConnectorError> {
        let inner = C::build(&config)?;
        Ok(Self {
            inner,
            config,
            methods: C::methods(),
        })
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: VendorConnector> Connector for Bound<C> {
    fn name(&self) -> &str {
        C::NAME
    }

    fn category(&self) -> ToolCategory {
        C::CATEGORY
    }

    fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    fn method_specs(&self) -> Vec<&MethodSpec> {
        self.methods.specs().collect()
    }

    fn method_spec(&self, method: &str) -> Option<&MethodSpec> {
        self.methods.get(method).map(|(spec, _)| spec)
    }

    fn invoke_method<'a>(
        &'a self,
        method: &str,
        args: Args,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        match self.methods.get(method) {
            Some((_, handler)) => {
                let call = handler(&self.inner, args);
                Box::pin(async move { call.await.map_err(ConnectorError::from) })
            }
            None => {
                let err = ConnectorError::UnknownMethod {
                    connector: C::NAME.to_string(),
                    method: method.to_string(),
                };
                Box::pin(async move { Err(err) })
            }
        }
    }
}

impl<C> fmt::Debug for Bound<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("config", &self.config)
            .field("methods", &self.methods.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        calls: AtomicUsize,
    }

    impl Echo {
        fn echo(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "z": 1, "echo": args }))
            })
        }

        fn fail(&self, _args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
            Box::pin(async move { Err(BackendError::Other("upstream exploded".into())) })
        }
    }

    impl VendorConnector for Echo {
        const NAME: &'static str = "echo";
        const CATEGORY: ToolCategory = ToolCategory::Github;
        const DESCRIPTION: &'static str = "Echo test connector";

        fn inputs() -> Vec<InputSpec> {
            Vec::new()
        }

        fn build(_config: &ResolvedConfig) -> Result<Self, ConnectorError> {
            Ok(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn methods() -> MethodTable<Self> {
            MethodTable::new()
                .method(
                    MethodSpec::new("echo", "Return the arguments")
                        .param(ParamSpec::string("text", "Text to echo").required()),
                    Self::echo,
                )
                .method(MethodSpec::new("fail", "Always fails"), Self::fail)
        }
    }

    #[tokio::test]
    async fn unknown_method_never_reaches_backend() {
        let bound = Bound::<Echo>::build(ResolvedConfig::new()).unwrap();
        let err = bound.invoke_method("nope", Args::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::UnknownMethod { ref method, .. } if method == "nope"
        ));
        assert_eq!(bound.inner().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_result_is_returned_unmodified() {
        let bound = Bound::<Echo>::build(ResolvedConfig::new()).unwrap();
        let mut args = Args::new();
        args.insert("text".into(), json!("hi"));
        let value = bound.invoke_method("echo", args).await.unwrap();
        assert_eq!(value, json!({ "z": 1, "echo": { "text": "hi" } }));
        // Key order from the handler is kept here; sorting is the dispatcher's job.
        assert_eq!(value.as_object().unwrap().keys().next().unwrap(), "z");
    }

    #[tokio::test]
    async fn backend_error_keeps_its_message() {
        let bound = Bound::<Echo>::build(ResolvedConfig::new()).unwrap();
        let err = bound.invoke_method("fail", Args::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "upstream exploded");
        assert_eq!(err.kind(), crate::error::ErrorKind::BackendFailure);
    }

    #[test]
    fn method_schema_lists_required_and_enum() {
        let spec = MethodSpec::new("list", "List things")
            .param(ParamSpec::string("owner", "Owner").required())
            .param(
                ParamSpec::string("type", "Filter")
                    .default("all")
                    .one_of(["all", "public", "private"]),
            );
        let schema = spec.json_schema();
        assert_eq!(schema["required"], json!(["owner"]));
        assert_eq!(schema["properties"]["type"]["enum"], json!(["all", "public", "private"]));
        assert_eq!(schema["properties"]["type"]["default"], json!("all"));
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn schema_without_required_params_omits_required_key() {
        let schema = MethodSpec::new("ping", "Ping").json_schema();
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn duplicate_method_names_are_recorded() {
        let table: MethodTable<Echo> = MethodTable::new()
            .method(MethodSpec::new("echo", "a"), Echo::echo)
            .method(MethodSpec::new("echo", "b"), Echo::echo);
        assert_eq!(table.len(), 1);
        assert_eq!(table.duplicates(), ["echo".to_string()]);
    }

    #[test]
    fn param_kind_accepts_matching_json_types() {
        assert!(ParamKind::Integer.accepts(&json!(3)));
        assert!(!ParamKind::Integer.accepts(&json!(3.5)));
        assert!(ParamKind::Number.accepts(&json!(3)));
        assert!(ParamKind::Boolean.accepts(&json!(true)));
        assert!(!ParamKind::String.accepts(&json!(1)));
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Google_Cloud".parse::<ToolCategory>().unwrap(), ToolCategory::GoogleCloud);
        assert!("mainframe".parse::<ToolCategory>().is_err());
    }
}
