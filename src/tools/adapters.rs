//! Framework renderers. Each wraps a [`ToolDefinition`]'s invoke function
//! unchanged and only lays out metadata and the calling convention the way
//! the target framework expects.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use super::{Framework, InvokeFn, ToolDefinition};
use crate::connector::Args;
use crate::error::{ErrorKind, NormalizedError};

/// LangChain structured tool: `name`, `description`, `args_schema`, called
/// with a single JSON object.
#[derive(Clone, Serialize)]
pub struct LangChainTool {
    pub name: String,
    pub description: String,
    pub args_schema: Value,
    #[serde(skip)]
    invoke: InvokeFn,
}

impl LangChainTool {
    /// `tool.invoke(input)` where `input` must be a JSON object.
    pub async fn invoke(&self, input: Value) -> Result<Value, NormalizedError> {
        let args = into_args(input)?;
        (self.invoke)(args).await
    }
}

impl fmt::Debug for LangChainTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LangChainTool")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl From<&ToolDefinition> for LangChainTool {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description().to_string(),
            args_schema: def.input_schema(),
            invoke: def.invoker(),
        }
    }
}

/// CrewAI tool. The description follows CrewAI's own layout (name, argument
/// schema, description) and `run` returns text.
#[derive(Clone, Serialize)]
pub struct CrewAiTool {
    pub name: String,
    pub description: String,
    pub args_schema: Value,
    #[serde(skip)]
    invoke: InvokeFn,
}

impl CrewAiTool {
    /// Run the tool; the result is rendered as pretty JSON text.
    pub async fn run(&self, args: Args) -> Result<String, NormalizedError> {
        let value = (self.invoke)(args).await?;
        Ok(match value {
            Value::String(s) => s,
            other => serde_json::to_string_pretty(&other).unwrap_or_default(),
        })
    }
}

impl fmt::Debug for CrewAiTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrewAiTool")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl From<&ToolDefinition> for CrewAiTool {
    fn from(def: &ToolDefinition) -> Self {
        let schema = def.input_schema();
        let arguments = schema
            .get("properties")
            .cloned()
            .unwrap_or_else(|| json!({}));
        let description = format!(
            "Tool Name: {}\nTool Arguments: {}\nTool Description: {}",
            def.name,
            arguments,
            def.description()
        );
        Self {
            name: def.name.clone(),
            description,
            args_schema: schema,
            invoke: def.invoker(),
        }
    }
}

/// Plain-function tool in the Strands `tool_spec` layout.
#[derive(Clone, Serialize)]
pub struct FunctionTool {
    pub tool_spec: Value,
    #[serde(skip)]
    name: String,
    #[serde(skip)]
    invoke: InvokeFn,
}

impl FunctionTool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn call(&self, args: Args) -> Result<Value, NormalizedError> {
        (self.invoke)(args).await
    }

    /// Call and wrap the outcome in a [`ToolResult`] envelope. Never fails.
    pub async fn call_json(&self, args: Args) -> ToolResult {
        match self.call(args).await {
            Ok(data) => ToolResult::ok(data),
            Err(err) => ToolResult::failed(&err),
        }
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl From<&ToolDefinition> for FunctionTool {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            tool_spec: json!({
                "name": def.name,
                "description": def.description(),
                "inputSchema": { "json": def.input_schema() }
            }),
            name: def.name.clone(),
            invoke: def.invoker(),
        }
    }
}

/// Structured outcome of a plain-function call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(err: &NormalizedError) -> Self {
        Self {
            success: false,
            data: json!({}),
            error: Some(err.to_string()),
        }
    }
}

/// A tool rendered for one framework.
#[derive(Debug, Clone)]
pub enum NativeTool {
    LangChain(LangChainTool),
    CrewAi(CrewAiTool),
    Function(FunctionTool),
}

impl NativeTool {
    pub fn name(&self) -> &str {
        match self {
            NativeTool::LangChain(t) => &t.name,
            NativeTool::CrewAi(t) => &t.name,
            NativeTool::Function(t) => t.name(),
        }
    }

    pub fn framework(&self) -> Framework {
        match self {
            NativeTool::LangChain(_) => Framework::LangChain,
            NativeTool::CrewAi(_) => Framework::CrewAi,
            NativeTool::Function(_) => Framework::Functions,
        }
    }

    /// Framework-shaped metadata, as printed by `vendor-connectors tools`.
    pub fn metadata(&self) -> Value {
        let rendered = match self {
            NativeTool::LangChain(t) => serde_json::to_value(t),
            NativeTool::CrewAi(t) => serde_json::to_value(t),
            NativeTool::Function(t) => serde_json::to_value(t),
        };
        rendered.unwrap_or(Value::Null)
    }

    /// Invoke through whichever calling convention this tool has.
    pub async fn call(&self, args: Args) -> Result<Value, NormalizedError> {
        match self {
            NativeTool::LangChain(t) => t.invoke(Value::Object(args)).await,
            NativeTool::CrewAi(t) => t.run(args).await.map(Value::String),
            NativeTool::Function(t) => t.call(args).await,
        }
    }
}

fn into_args(input: Value) -> Result<Args, NormalizedError> {
    match input {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Args::new()),
        other => Err(NormalizedError::new(
            ErrorKind::InvalidArguments,
            format!(
                "tool input must be a JSON object, got {}",
                crate::error::json_type_name(&other)
            ),
        )),
    }
}
