//! Cursor background agents API connector.

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use super::{int_arg, items, opt_str, str_arg};
use crate::connector::{Args, MethodSpec, MethodTable, ParamSpec, ToolCategory, VendorConnector};
use crate::error::{BackendError, ConnectorError};
use crate::http::{segment, Auth, HttpBackend};
use crate::inputs::{InputSpec, ResolvedConfig};

const DEFAULT_API_URL: &str = "https://api.cursor.com";

pub struct Cursor {
    api: HttpBackend,
}

impl VendorConnector for Cursor {
    const NAME: &'static str = "cursor";
    const CATEGORY: ToolCategory = ToolCategory::Cursor;
    const DESCRIPTION: &'static str = "Cursor background coding agents";

    fn inputs() -> Vec<InputSpec> {
        vec![
            InputSpec::new("api_key")
                .env("CURSOR_API_KEY")
                .config_key("cursor.api_key")
                .secret()
                .required(),
            InputSpec::new("api_url")
                .env("CURSOR_API_URL")
                .config_key("cursor.api_url")
                .default_value(DEFAULT_API_URL),
        ]
    }

    fn build(config: &ResolvedConfig) -> Result<Self, ConnectorError> {
        let api_key = config.require_string("api_key")?;
        let api_url = config
            .get_string("api_url")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Ok(Self {
            api: HttpBackend::new("Cursor", &api_url, Auth::Bearer(api_key)),
        })
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new()
            .method(
                MethodSpec::new("list_agents", "List background agents.")
                    .param(ParamSpec::integer("limit", "Maximum agents to return.").default(20)),
                Self::list_agents,
            )
            .method(
                MethodSpec::new("get_agent", "Get an agent's status.")
                    .param(ParamSpec::string("agent_id", "Agent ID.").required()),
                Self::get_agent,
            )
            .method(
                MethodSpec::new("launch_agent", "Start a background agent on a repository.")
                    .param(ParamSpec::string("prompt", "Task for the agent.").required())
                    .param(
                        ParamSpec::string(
                            "repository",
                            "Repository URL (e.g. https://github.com/acme/widgets).",
                        )
                        .required(),
                    )
                    .param(ParamSpec::string("ref", "Branch, tag or commit to start from."))
                    .param(ParamSpec::string("model", "Model to run the agent with.")),
                Self::launch_agent,
            )
            .method(
                MethodSpec::new("add_followup", "Send a follow-up instruction to a running agent.")
                    .param(ParamSpec::string("agent_id", "Agent ID.").required())
                    .param(ParamSpec::string("prompt", "Follow-up instruction.").required()),
                Self::add_followup,
            )
    }
}

impl Cursor {
    fn list_agents(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let query = [("limit", int_arg(&args, "limit", 20).to_string())];
            let raw = self.api.get("/v0/agents", &query).await?;
            Ok(Value::Array(items(&raw, "agents")))
        })
    }

    fn get_agent(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let id = str_arg(&args, "agent_id")?;
            self.api.get(&format!("/v0/agents/{}", segment(id)), &[]).await
        })
    }

    fn launch_agent(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let mut source = json!({ "repository": str_arg(&args, "repository")? });
            if let Some(git_ref) = opt_str(&args, "ref") {
                source["ref"] = json!(git_ref);
            }
            let mut body = json!({
                "prompt": { "text": str_arg(&args, "prompt")? },
                "source": source,
            });
            if let Some(model) = opt_str(&args, "model") {
                body["model"] = json!(model);
            }
            self.api.post("/v0/agents", &body).await
        })
    }

    fn add_followup(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let id = str_arg(&args, "agent_id")?;
            let body = json!({ "prompt": { "text": str_arg(&args, "prompt")? } });
            self.api
                .post(&format!("/v0/agents/{}/followup", segment(id)), &body)
                .await
        })
    }
}
