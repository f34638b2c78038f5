//! Google Jules coding agent API connector.

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use super::{int_arg, items, opt_str, str_arg};
use crate::connector::{Args, MethodSpec, MethodTable, ParamSpec, ToolCategory, VendorConnector};
use crate::error::{BackendError, ConnectorError};
use crate::http::{segment, Auth, HttpBackend};
use crate::inputs::{InputSpec, ResolvedConfig};

const DEFAULT_API_URL: &str = "https://jules.googleapis.com/v1alpha";

pub struct Jules {
    api: HttpBackend,
}

impl VendorConnector for Jules {
    const NAME: &'static str = "jules";
    const CATEGORY: ToolCategory = ToolCategory::Jules;
    const DESCRIPTION: &'static str = "Jules coding agent sessions";

    fn inputs() -> Vec<InputSpec> {
        vec![
            InputSpec::new("api_key")
                .env("JULES_API_KEY")
                .config_key("jules.api_key")
                .secret()
                .required(),
            InputSpec::new("api_url")
                .env("JULES_API_URL")
                .config_key("jules.api_url")
                .default_value(DEFAULT_API_URL),
        ]
    }

    fn build(config: &ResolvedConfig) -> Result<Self, ConnectorError> {
        let api_key = config.require_string("api_key")?;
        let api_url = config
            .get_string("api_url")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api = HttpBackend::new(
            "Jules",
            &api_url,
            Auth::Header {
                name: "x-goog-api-key",
                value: api_key,
            },
        );
        Ok(Self { api })
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new()
            .method(
                MethodSpec::new("list_sources", "List connected source repositories.")
                    .param(ParamSpec::integer("page_size", "Sources per page.").default(30)),
                Self::list_sources,
            )
            .method(
                MethodSpec::new("list_sessions", "List coding sessions.")
                    .param(ParamSpec::integer("page_size", "Sessions per page.").default(30)),
                Self::list_sessions,
            )
            .method(
                MethodSpec::new("get_session", "Get a session's state.")
                    .param(ParamSpec::string("session_id", "Session ID.").required()),
                Self::get_session,
            )
            .method(
                MethodSpec::new("create_session", "Start a coding session on a source.")
                    .param(ParamSpec::string("prompt", "Task for Jules.").required())
                    .param(
                        ParamSpec::string(
                            "source",
                            "Source name, e.g. sources/github/acme/widgets.",
                        )
                        .required(),
                    )
                    .param(
                        ParamSpec::string("starting_branch", "Branch to start from.")
                            .default("main"),
                    )
                    .param(ParamSpec::string("title", "Session title.")),
                Self::create_session,
            )
    }
}

impl Jules {
    fn list_sources(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let query = [("pageSize", int_arg(&args, "page_size", 30).to_string())];
            let raw = self.api.get("/sources", &query).await?;
            Ok(Value::Array(items(&raw, "sources")))
        })
    }

    fn list_sessions(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let query = [("pageSize", int_arg(&args, "page_size", 30).to_string())];
            let raw = self.api.get("/sessions", &query).await?;
            Ok(Value::Array(items(&raw, "sessions")))
        })
    }

    fn get_session(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let id = str_arg(&args, "session_id")?;
            let id = id.trim_start_matches("sessions/");
            self.api.get(&format!("/sessions/{}", segment(id)), &[]).await
        })
    }

    fn create_session(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let mut body = json!({
                "prompt": str_arg(&args, "prompt")?,
                "sourceContext": {
                    "source": str_arg(&args, "source")?,
                    "githubRepoContext": {
                        "startingBranch": opt_str(&args, "starting_branch").unwrap_or("main"),
                    },
                },
            });
            if let Some(title) = opt_str(&args, "title") {
                body["title"] = json!(title);
            }
            self.api.post("/sessions", &body).await
        })
    }
}
