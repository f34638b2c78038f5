//! Anthropic Messages API connector.

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use super::{int_arg, items, opt_str, str_arg};
use crate::connector::{Args, MethodSpec, MethodTable, ParamSpec, ToolCategory, VendorConnector};
use crate::error::{BackendError, ConnectorError};
use crate::http::{Auth, HttpBackend};
use crate::inputs::{InputSpec, ResolvedConfig};

const DEFAULT_API_URL: &str = "https://api.anthropic.com";
const DEFAULT_API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    api: HttpBackend,
}

impl VendorConnector for Anthropic {
    const NAME: &'static str = "anthropic";
    const CATEGORY: ToolCategory = ToolCategory::Anthropic;
    const DESCRIPTION: &'static str = "Anthropic models and messages";

    fn inputs() -> Vec<InputSpec> {
        vec![
            InputSpec::new("api_key")
                .env("ANTHROPIC_API_KEY")
                .config_key("anthropic.api_key")
                .secret()
                .required(),
            InputSpec::new("api_url")
                .env("ANTHROPIC_BASE_URL")
                .config_key("anthropic.api_url")
                .default_value(DEFAULT_API_URL),
            InputSpec::new("api_version")
                .env("ANTHROPIC_API_VERSION")
                .config_key("anthropic.api_version")
                .default_value(DEFAULT_API_VERSION),
        ]
    }

    fn build(config: &ResolvedConfig) -> Result<Self, ConnectorError> {
        let api_key = config.require_string("api_key")?;
        let api_url = config
            .get_string("api_url")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let version = config
            .get_string("api_version")
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let api = HttpBackend::new(
            "Anthropic",
            &api_url,
            Auth::Header {
                name: "x-api-key",
                value: api_key,
            },
        )
        .header("anthropic-version", version);
        Ok(Self { api })
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new()
            .method(
                MethodSpec::new("list_models", "List available Claude models.")
                    .param(ParamSpec::integer("limit", "Maximum models to return.").default(20)),
                Self::list_models,
            )
            .method(
                MethodSpec::new(
                    "create_message",
                    "Send a single-turn prompt and return the reply text.",
                )
                    .param(ParamSpec::string("model", "Model ID.").required())
                    .param(ParamSpec::string("prompt", "User message.").required())
                    .param(ParamSpec::string("system", "System prompt."))
                    .param(
                        ParamSpec::integer("max_tokens", "Maximum tokens to generate.")
                            .default(1024),
                    )
                    .param(ParamSpec::number("temperature", "Sampling temperature (0 to 1).")),
                Self::create_message,
            )
    }
}

impl Anthropic {
    fn list_models(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let query = [("limit", int_arg(&args, "limit", 20).to_string())];
            let raw = self.api.get("/v1/models", &query).await?;
            let models: Vec<Value> = items(&raw, "data")
                .iter()
                .map(|m| {
                    json!({
                        "id": m["id"],
                        "display_name": m["display_name"],
                        "created_at": m["created_at"],
                    })
                })
                .collect();
            Ok(Value::Array(models))
        })
    }

    fn create_message(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let mut body = json!({
                "model": str_arg(&args, "model")?,
                "max_tokens": int_arg(&args, "max_tokens", 1024),
                "messages": [{ "role": "user", "content": str_arg(&args, "prompt")? }],
            });
            if let Some(system) = opt_str(&args, "system") {
                body["system"] = json!(system);
            }
            if let Some(temperature) = args.get("temperature") {
                body["temperature"] = temperature.clone();
            }
            let raw = self.api.post("/v1/messages", &body).await?;
            Ok(json!({
                "id": raw["id"],
                "model": raw["model"],
                "text": reply_text(&raw),
                "stop_reason": raw["stop_reason"],
                "usage": raw["usage"],
            }))
        })
    }
}

/// Concatenated `text` blocks of a Messages API response.
fn reply_text(response: &Value) -> String {
    items(response, "content")
        .iter()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect::<Vec<_>>()
        .join("")
}
