//! Tool catalog: one canonical [`ToolDefinition`] per connector method,
//! rendered for each agent framework.
//!
//! Tool names are `{connector}_{method}` (e.g. `github_list_repositories`).
//! Every definition carries an `invoke` function that routes through the
//! [`Dispatcher`], so all renderers (and the MCP server) share one call path.
//!
//! ## Frameworks
//!
//! | Framework             | Renderer                                |
//! |-----------------------|-----------------------------------------|
//! | `langchain`           | [`LangChainTool`] (structured tool)     |
//! | `crewai`              | [`CrewAiTool`]                          |
//! | `strands`/`functions` | [`FunctionTool`] (plain function)       |
//! | `auto`                | first available, in the order above     |

pub mod adapters;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::connector::{Args, MethodSpec, ToolCategory};
use crate::dispatch::Dispatcher;
use crate::error::{ConnectorError, NormalizedError};

pub use adapters::{CrewAiTool, FunctionTool, LangChainTool, NativeTool, ToolResult};

/// Shared async entry point of a tool.
pub type InvokeFn =
    Arc<dyn Fn(Args) -> BoxFuture<'static, Result<Value, NormalizedError>> + Send + Sync>;

/// Framework-neutral description of one callable tool.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub connector: String,
    pub category: ToolCategory,
    pub method: MethodSpec,
    invoke: InvokeFn,
}

impl ToolDefinition {
    pub fn new(
        connector: &str,
        category: ToolCategory,
        method: MethodSpec,
        invoke: InvokeFn,
    ) -> Self {
        Self {
            name: tool_name(connector, &method.name),
            connector: connector.to_string(),
            category,
            method,
            invoke,
        }
    }

    /// A tool whose calls go through `dispatcher`.
    pub fn dispatched(
        dispatcher: &Dispatcher,
        connector: &'static str,
        category: ToolCategory,
        method: MethodSpec,
    ) -> Self {
        let dispatcher = dispatcher.clone();
        let method_name = method.name.clone();
        let invoke: InvokeFn = Arc::new(move |args: Args| {
            let dispatcher = dispatcher.clone();
            let method_name = method_name.clone();
            Box::pin(async move { dispatcher.call(connector, &method_name, args).await })
        });
        Self::new(connector, category, method, invoke)
    }

    pub fn description(&self) -> &str {
        &self.method.description
    }

    /// JSON Schema for the tool's arguments.
    pub fn input_schema(&self) -> Value {
        self.method.json_schema()
    }

    /// MCP `tools/list` entry.
    pub fn mcp_definition(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.method.description,
            "inputSchema": self.input_schema()
        })
    }

    pub fn invoker(&self) -> InvokeFn {
        Arc::clone(&self.invoke)
    }

    pub async fn invoke(&self, args: Args) -> Result<Value, NormalizedError> {
        (self.invoke)(args).await
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("params", &self.method.params.len())
            .finish()
    }
}

/// `{connector}_{method}`
pub fn tool_name(connector: &str, method: &str) -> String {
    format!("{connector}_{method}")
}

/// Target tool shape requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Auto,
    LangChain,
    CrewAi,
    Strands,
    Functions,
}

impl Framework {
    pub fn as_str(self) -> &'static str {
        match self {
            Framework::Auto => "auto",
            Framework::LangChain => "langchain",
            Framework::CrewAi => "crewai",
            Framework::Strands => "strands",
            Framework::Functions => "functions",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Framework::Auto),
            "langchain" => Ok(Framework::LangChain),
            "crewai" => Ok(Framework::CrewAi),
            "strands" => Ok(Framework::Strands),
            "functions" => Ok(Framework::Functions),
            _ => Err(ConnectorError::UnknownFramework(s.to_string())),
        }
    }
}

/// Answers whether a framework's runtime is present. Used by `auto`.
pub trait FrameworkProbe: Send + Sync {
    fn is_available(&self, framework: Framework) -> bool;
}

/// Probe backed by a fixed list, typically `frameworks.available` from the
/// config file. An empty list means only plain functions are available.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredFrameworks {
    available: Vec<Framework>,
}

impl ConfiguredFrameworks {
    pub fn new(available: impl IntoIterator<Item = Framework>) -> Self {
        Self {
            available: available.into_iter().collect(),
        }
    }

    /// Parse framework names, skipping unknown ones.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self::new(names.iter().filter_map(|n| n.as_ref().parse().ok()))
    }
}

impl FrameworkProbe for ConfiguredFrameworks {
    fn is_available(&self, framework: Framework) -> bool {
        self.available.contains(&framework)
    }
}

/// Resolve `auto`: LangChain, then CrewAI, then plain functions. Other
/// values pass through.
pub fn detect_framework(requested: Framework, probe: &dyn FrameworkProbe) -> Framework {
    if requested != Framework::Auto {
        return requested;
    }
    [Framework::LangChain, Framework::CrewAi]
        .into_iter()
        .find(|f| probe.is_available(*f))
        .unwrap_or(Framework::Functions)
}

/// Ordered, name-unique set of tool definitions.
#[derive(Clone)]
pub struct ToolCatalog {
    tools: IndexMap<String, ToolDefinition>,
    probe: Arc<dyn FrameworkProbe>,
}

impl ToolCatalog {
    /// Build from definitions, rejecting duplicate names.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ToolDefinition>,
    ) -> Result<Self, ConnectorError> {
        let mut tools = IndexMap::new();
        for def in definitions {
            if tools.contains_key(&def.name) {
                return Err(ConnectorError::InvalidDescriptor(format!(
                    "tool name '{}' is defined twice",
                    def.name
                )));
            }
            tools.insert(def.name.clone(), def);
        }
        Ok(Self {
            tools,
            probe: Arc::new(ConfiguredFrameworks::default()),
        })
    }

    /// The tools of one connector, in method declaration order.
    pub fn for_connector(dispatcher: &Dispatcher, connector: &str) -> Result<Self, ConnectorError> {
        let descriptor = dispatcher.registry().descriptor(connector)?;
        Self::from_definitions(descriptor.methods.iter().map(|method| {
            ToolDefinition::dispatched(
                dispatcher,
                descriptor.name,
                descriptor.category,
                method.clone(),
            )
        }))
    }

    /// The tools of every registered connector.
    pub fn all(dispatcher: &Dispatcher) -> Result<Self, ConnectorError> {
        let registry = dispatcher.registry();
        let definitions: Vec<ToolDefinition> = registry
            .list()
            .flat_map(|descriptor| {
                descriptor.methods.iter().map(|method| {
                    ToolDefinition::dispatched(
                        dispatcher,
                        descriptor.name,
                        descriptor.category,
                        method.clone(),
                    )
                })
            })
            .collect();
        let catalog = Self::from_definitions(definitions)?;
        debug!(tools = catalog.len(), "tool catalog built");
        Ok(catalog)
    }

    pub fn with_probe(mut self, probe: impl FrameworkProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Canonical definitions, in catalog order.
    pub fn tool_definitions(&self) -> Vec<&ToolDefinition> {
        self.tools.values().collect()
    }

    /// Distinct categories present, in first-seen order.
    pub fn categories(&self) -> Vec<ToolCategory> {
        let mut seen = Vec::new();
        for tool in self.tools.values() {
            if !seen.contains(&tool.category) {
                seen.push(tool.category);
            }
        }
        seen
    }

    /// Subset matching any of `categories` (if non-empty) and any of
    /// `names` (if non-empty).
    pub fn filter(&self, categories: &[ToolCategory], names: &[&str]) -> Self {
        let names: HashSet<&str> = names.iter().copied().collect();
        let tools = self
            .tools
            .iter()
            .filter(|(_, t)| categories.is_empty() || categories.contains(&t.category))
            .filter(|(name, _)| names.is_empty() || names.contains(name.as_str()))
            .map(|(name, t)| (name.clone(), t.clone()))
            .collect();
        Self {
            tools,
            probe: Arc::clone(&self.probe),
        }
    }

    /// MCP `tools/list` entries.
    pub fn mcp_definitions(&self) -> Vec<Value> {
        self.tools.values().map(ToolDefinition::mcp_definition).collect()
    }

    /// Render for `framework` (`auto`, `langchain`, `crewai`, `strands`,
    /// `functions`). Anything else fails with `UnknownFramework`.
    pub fn get_tools(&self, framework: &str) -> Result<Vec<NativeTool>, ConnectorError> {
        let requested: Framework = framework.parse()?;
        let resolved = detect_framework(requested, self.probe.as_ref());
        debug!(requested = %requested, resolved = %resolved, "rendering tools");
        Ok(match resolved {
            Framework::LangChain => self
                .get_langchain_tools()
                .into_iter()
                .map(NativeTool::LangChain)
                .collect(),
            Framework::CrewAi => self
                .get_crewai_tools()
                .into_iter()
                .map(NativeTool::CrewAi)
                .collect(),
            Framework::Auto | Framework::Strands | Framework::Functions => self
                .get_strands_tools()
                .into_iter()
                .map(NativeTool::Function)
                .collect(),
        })
    }

    pub fn get_langchain_tools(&self) -> Vec<LangChainTool> {
        self.tools.values().map(LangChainTool::from).collect()
    }

    pub fn get_crewai_tools(&self) -> Vec<CrewAiTool> {
        self.tools.values().map(CrewAiTool::from).collect()
    }

    pub fn get_strands_tools(&self) -> Vec<FunctionTool> {
        self.tools.values().map(FunctionTool::from).collect()
    }
}

impl fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolCatalog")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ParamSpec;
    use crate::error::ErrorKind;

    fn stub(connector: &str, category: ToolCategory, method: &str) -> ToolDefinition {
        let spec = MethodSpec::new(method, format!("{method} on {connector}"))
            .param(ParamSpec::string("id", "Identifier").required());
        let invoke: InvokeFn = Arc::new(|args: Args| {
            Box::pin(async move { Ok(json!({ "args": Value::Object(args) })) })
        });
        ToolDefinition::new(connector, category, spec, invoke)
    }

    fn catalog() -> ToolCatalog {
        ToolCatalog::from_definitions([
            stub("github", ToolCategory::Github, "get_repository"),
            stub("slack", ToolCategory::Slack, "list_users"),
            stub("slack", ToolCategory::Slack, "send_message"),
        ])
        .unwrap()
    }

    struct Only(Vec<Framework>);

    impl FrameworkProbe for Only {
        fn is_available(&self, framework: Framework) -> bool {
            self.0.contains(&framework)
        }
    }

    #[test]
    fn names_are_prefixed_with_connector() {
        assert_eq!(
            catalog().names(),
            vec!["github_get_repository", "slack_list_users", "slack_send_message"]
        );
    }

    #[test]
    fn duplicate_tool_names_are_rejected() {
        let err = ToolCatalog::from_definitions([
            stub("slack", ToolCategory::Slack, "list_users"),
            stub("slack", ToolCategory::Slack, "list_users"),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDescriptor);
    }

    #[test]
    fn unknown_framework_is_rejected() {
        let err = catalog().get_tools("invalid").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFramework);
        assert!(err.to_string().contains("Unknown framework"));
    }

    #[test]
    fn auto_prefers_langchain_then_crewai_then_functions() {
        let all = Only(vec![Framework::CrewAi, Framework::LangChain]);
        assert_eq!(detect_framework(Framework::Auto, &all), Framework::LangChain);
        let crew = Only(vec![Framework::CrewAi]);
        assert_eq!(detect_framework(Framework::Auto, &crew), Framework::CrewAi);
        let none = Only(vec![]);
        assert_eq!(detect_framework(Framework::Auto, &none), Framework::Functions);
        assert_eq!(detect_framework(Framework::Strands, &all), Framework::Strands);
    }

    #[test]
    fn auto_falls_back_to_plain_functions() {
        let tools = catalog().get_tools("auto").unwrap();
        assert_eq!(tools.len(), 3);
        assert!(tools.iter().all(|t| matches!(t, NativeTool::Function(_))));
    }

    #[test]
    fn auto_uses_probe() {
        let tools = catalog()
            .with_probe(ConfiguredFrameworks::from_names(&["crewai"]))
            .get_tools("auto")
            .unwrap();
        assert!(tools.iter().all(|t| matches!(t, NativeTool::CrewAi(_))));
    }

    #[test]
    fn renderers_preserve_names_and_order() {
        let catalog = catalog();
        let expected = catalog.names();
        for framework in ["langchain", "crewai", "strands", "functions"] {
            let rendered = catalog.get_tools(framework).unwrap();
            let names: Vec<&str> = rendered.iter().map(NativeTool::name).collect();
            assert_eq!(names, expected, "framework {framework}");
        }
    }

    #[test]
    fn filter_by_category_and_name() {
        let catalog = catalog();
        assert_eq!(catalog.filter(&[ToolCategory::Slack], &[]).len(), 2);
        assert_eq!(
            catalog.filter(&[ToolCategory::Slack], &["slack_list_users"]).names(),
            vec!["slack_list_users"]
        );
        assert_eq!(catalog.filter(&[], &["github_get_repository"]).len(), 1);
        assert!(catalog.filter(&[ToolCategory::Zoom], &[]).is_empty());
        assert_eq!(catalog.categories(), vec![ToolCategory::Github, ToolCategory::Slack]);
    }

    #[test]
    fn mcp_definition_has_input_schema() {
        let defs = catalog().mcp_definitions();
        assert_eq!(defs[0]["name"], "github_get_repository");
        assert_eq!(defs[0]["inputSchema"]["required"], json!(["id"]));
    }

    #[tokio::test]
    async fn every_renderer_wraps_the_same_invoke() {
        let catalog = catalog();
        let mut args = Args::new();
        args.insert("id".into(), json!("42"));

        let direct = catalog
            .get("slack_list_users")
            .unwrap()
            .invoke(args.clone())
            .await
            .unwrap();
        let lc = catalog
            .get_langchain_tools()
            .remove(1)
            .invoke(Value::Object(args.clone()))
            .await
            .unwrap();
        let func = catalog
            .get_strands_tools()
            .remove(1)
            .call(args.clone())
            .await
            .unwrap();
        assert_eq!(direct, lc);
        assert_eq!(direct, func);
    }
}
