//! Slack Web API connector.
//!
//! Slack answers most failures with HTTP 200 and `{"ok": false, "error": ..}`;
//! [`check_ok`] turns those into vendor errors. Results are flattened into
//! small records instead of the raw API payload.

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use super::{bool_arg, int_arg, items, opt_str, str_arg};
use crate::connector::{Args, MethodSpec, MethodTable, ParamSpec, ToolCategory, VendorConnector};
use crate::error::{BackendError, ConnectorError};
use crate::http::{Auth, HttpBackend};
use crate::inputs::{InputSpec, ResolvedConfig};

const DEFAULT_API_URL: &str = "https://slack.com/api";

pub struct Slack {
    api: HttpBackend,
}

impl VendorConnector for Slack {
    const NAME: &'static str = "slack";
    const CATEGORY: ToolCategory = ToolCategory::Slack;
    const DESCRIPTION: &'static str = "Slack channels, users and messages";

    fn inputs() -> Vec<InputSpec> {
        vec![
            InputSpec::new("token")
                .env("SLACK_BOT_TOKEN")
                .config_key("slack.token")
                .secret()
                .required(),
            InputSpec::new("api_url")
                .env("SLACK_API_URL")
                .config_key("slack.api_url")
                .default_value(DEFAULT_API_URL),
        ]
    }

    fn build(config: &ResolvedConfig) -> Result<Self, ConnectorError> {
        let token = config.require_string("token")?;
        let api_url = config
            .get_string("api_url")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Ok(Self {
            api: HttpBackend::new("Slack", &api_url, Auth::Bearer(token)),
        })
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new()
            .method(
                MethodSpec::new("list_channels", "List channels in the workspace.")
                    .param(
                        ParamSpec::boolean("exclude_archived", "Skip archived channels.")
                            .default(true),
                    )
                    .param(
                        ParamSpec::string("types", "Comma-separated conversation types.")
                            .default("public_channel,private_channel"),
                    )
                    .param(ParamSpec::integer("limit", "Maximum channels to return.").default(200)),
                Self::list_channels,
            )
            .method(
                MethodSpec::new("list_users", "List users in the workspace.")
                    .param(ParamSpec::boolean("include_bots", "Include bot users.").default(false))
                    .param(
                        ParamSpec::boolean("include_deleted", "Include deactivated users.")
                            .default(false),
                    ),
                Self::list_users,
            )
            .method(
                MethodSpec::new("send_message", "Post a message to a channel.")
                    .param(ParamSpec::string("channel", "Channel ID or name.").required())
                    .param(ParamSpec::string("text", "Message text.").required())
                    .param(ParamSpec::string(
                        "thread_id",
                        "Timestamp of the parent message to reply in a thread.",
                    )),
                Self::send_message,
            )
            .method(
                MethodSpec::new("get_channel_history", "Recent messages of a channel.")
                    .param(ParamSpec::string("channel", "Channel ID or name.").required())
                    .param(ParamSpec::integer("limit", "Maximum messages to return.").default(100)),
                Self::get_channel_history,
            )
    }
}

impl Slack {
    async fn call(&self, method: &str, query: &[(&str, String)]) -> Result<Value, BackendError> {
        check_ok(self.api.get(method, query).await?)
    }

    async fn conversations(&self, args: &Args) -> Result<Vec<Value>, BackendError> {
        let query = [
            (
                "exclude_archived",
                bool_arg(args, "exclude_archived", true).to_string(),
            ),
            (
                "types",
                opt_str(args, "types")
                    .unwrap_or("public_channel,private_channel")
                    .to_string(),
            ),
            ("limit", int_arg(args, "limit", 200).to_string()),
        ];
        let raw = self.call("conversations.list", &query).await?;
        Ok(items(&raw, "channels"))
    }

    /// Channel ID for an ID or a name (with or without `#`).
    async fn resolve_channel(&self, channel: &str) -> Result<Option<String>, BackendError> {
        if looks_like_channel_id(channel) {
            return Ok(Some(channel.to_string()));
        }
        let name = channel.trim_start_matches('#');
        let channels = self.conversations(&Args::new()).await?;
        Ok(channels
            .iter()
            .find(|c| c["name"].as_str() == Some(name))
            .and_then(|c| c["id"].as_str().map(String::from)))
    }

    fn list_channels(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let channels = self.conversations(&args).await?;
            Ok(Value::Array(channels.iter().map(summarize_channel).collect()))
        })
    }

    fn list_users(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let include_bots = bool_arg(&args, "include_bots", false);
            let include_deleted = bool_arg(&args, "include_deleted", false);
            let raw = self.call("users.list", &[]).await?;
            let users: Vec<Value> = items(&raw, "members")
                .iter()
                .filter(|u| include_bots || !u["is_bot"].as_bool().unwrap_or(false))
                .filter(|u| include_deleted || !u["deleted"].as_bool().unwrap_or(false))
                .map(summarize_user)
                .collect();
            Ok(Value::Array(users))
        })
    }

    fn send_message(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let channel = str_arg(&args, "channel")?;
            let text = str_arg(&args, "text")?;
            let mut body = json!({ "channel": channel, "text": text });
            if let Some(thread) = opt_str(&args, "thread_id") {
                body["thread_ts"] = json!(thread);
            }
            let raw = check_ok(self.api.post("chat.postMessage", &body).await?)?;
            Ok(json!({
                "channel": channel,
                "text": text,
                "timestamp": raw["ts"],
                "status": "sent",
            }))
        })
    }

    fn get_channel_history(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let Some(channel_id) = self.resolve_channel(str_arg(&args, "channel")?).await? else {
                return Ok(Value::Array(Vec::new()));
            };
            let query = [
                ("channel", channel_id),
                ("limit", int_arg(&args, "limit", 100).to_string()),
            ];
            let raw = self.call("conversations.history", &query).await?;
            let messages: Vec<Value> = items(&raw, "messages")
                .iter()
                .map(|m| {
                    json!({
                        "timestamp": m["ts"],
                        "user": m["user"],
                        "text": m["text"],
                        "type": m["type"],
                    })
                })
                .collect();
            Ok(Value::Array(messages))
        })
    }
}

/// Reject `{"ok": false}` payloads.
fn check_ok(payload: Value) -> Result<Value, BackendError> {
    if payload["ok"].as_bool() == Some(false) {
        let message = payload["error"].as_str().unwrap_or("unknown_error").to_string();
        return Err(BackendError::Vendor {
            vendor: "Slack",
            status: 200,
            message,
        });
    }
    Ok(payload)
}

/// Slack IDs: `C`, `G` or `D` followed by uppercase alphanumerics.
fn looks_like_channel_id(channel: &str) -> bool {
    let mut chars = channel.chars();
    matches!(chars.next(), Some('C' | 'G' | 'D'))
        && channel.len() >= 9
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn summarize_channel(channel: &Value) -> Value {
    json!({
        "id": channel["id"],
        "name": channel["name"],
        "is_private": channel["is_private"],
        "topic": channel["topic"]["value"],
        "purpose": channel["purpose"]["value"],
        "member_count": channel["num_members"],
    })
}

fn summarize_user(user: &Value) -> Value {
    json!({
        "id": user["id"],
        "name": user["name"],
        "real_name": user["real_name"],
        "email": user["profile"]["email"],
        "is_admin": user["is_admin"].as_bool().unwrap_or(false),
    })
}
