//! Zoom connector (Server-to-Server OAuth).
//!
//! The access token is fetched on the first API call and reused until it is
//! within a minute of expiry.

use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::future::BoxFuture;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::{int_arg, items, opt_str, str_arg};
use crate::connector::{Args, MethodSpec, MethodTable, ParamSpec, ToolCategory, VendorConnector};
use crate::error::{BackendError, ConnectorError};
use crate::http::{segment, Auth, HttpBackend};
use crate::inputs::{InputSpec, ResolvedConfig};

const DEFAULT_API_URL: &str = "https://api.zoom.us/v2";
const DEFAULT_OAUTH_URL: &str = "https://zoom.us/oauth/token";
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Upper bound on the `expires_in` a token is trusted for.
const MAX_TOKEN_LIFETIME: u64 = 86_400;

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct Zoom {
    api: HttpBackend,
    oauth: HttpBackend,
    account_id: String,
    token: Mutex<Option<AccessToken>>,
}

impl VendorConnector for Zoom {
    const NAME: &'static str = "zoom";
    const CATEGORY: ToolCategory = ToolCategory::Zoom;
    const DESCRIPTION: &'static str = "Zoom users and meetings";

    fn inputs() -> Vec<InputSpec> {
        vec![
            InputSpec::new("account_id")
                .env("ZOOM_ACCOUNT_ID")
                .config_key("zoom.account_id")
                .required(),
            InputSpec::new("client_id")
                .env("ZOOM_CLIENT_ID")
                .config_key("zoom.client_id")
                .required(),
            InputSpec::new("client_secret")
                .env("ZOOM_CLIENT_SECRET")
                .config_key("zoom.client_secret")
                .secret()
                .required(),
            InputSpec::new("api_url")
                .env("ZOOM_API_URL")
                .config_key("zoom.api_url")
                .default_value(DEFAULT_API_URL),
            InputSpec::new("oauth_url")
                .env("ZOOM_OAUTH_URL")
                .config_key("zoom.oauth_url")
                .default_value(DEFAULT_OAUTH_URL),
        ]
    }

    fn build(config: &ResolvedConfig) -> Result<Self, ConnectorError> {
        let client_id = config.require_string("client_id")?;
        let client_secret = config.require_string("client_secret")?;
        let credentials = STANDARD.encode(format!("{client_id}:{client_secret}"));

        let api_url = config
            .get_string("api_url")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let oauth_url = config
            .get_string("oauth_url")
            .unwrap_or_else(|| DEFAULT_OAUTH_URL.to_string());

        Ok(Self {
            api: HttpBackend::new("Zoom", &api_url, Auth::None),
            oauth: HttpBackend::new(
                "Zoom OAuth",
                &oauth_url,
                Auth::Header {
                    name: "authorization",
                    value: format!("Basic {credentials}"),
                },
            ),
            account_id: config.require_string("account_id")?,
            token: Mutex::new(None),
        })
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new()
            .method(
                MethodSpec::new("list_users", "List users on the account.")
                    .param(
                        ParamSpec::string("status", "User status.")
                            .default("active")
                            .one_of(["active", "inactive", "pending"]),
                    )
                    .param(
                        ParamSpec::integer("page_size", "Users per page (max 300).").default(30),
                    ),
                Self::list_users,
            )
            .method(
                MethodSpec::new("get_user", "Get a user's profile.")
                    .param(
                        ParamSpec::string("user_id", "User ID or email; 'me' for the app owner.")
                            .required(),
                    ),
                Self::get_user,
            )
            .method(
                MethodSpec::new("list_meetings", "List a user's meetings.")
                    .param(ParamSpec::string("user_id", "User ID or email.").default("me"))
                    .param(
                        ParamSpec::string("type", "Meeting type.")
                            .default("scheduled")
                            .one_of(["scheduled", "live", "upcoming", "previous_meetings"]),
                    ),
                Self::list_meetings,
            )
            .method(
                MethodSpec::new("create_meeting", "Schedule a meeting for a user.")
                    .param(ParamSpec::string("topic", "Meeting topic.").required())
                    .param(ParamSpec::string("user_id", "Host user ID or email.").default("me"))
                    .param(ParamSpec::string(
                        "start_time",
                        "Start time, ISO 8601 (e.g. 2025-01-31T15:00:00Z).",
                    ))
                    .param(ParamSpec::integer("duration", "Duration in minutes.").default(30)),
                Self::create_meeting,
            )
    }
}

impl Zoom {
    async fn access_token(&self) -> Result<String, BackendError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + EXPIRY_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let request = self.oauth.request(Method::POST, "")?.query(&[
            ("grant_type", "account_credentials"),
            ("account_id", self.account_id.as_str()),
        ]);
        let raw = self.oauth.send(request).await?;
        let value = raw["access_token"]
            .as_str()
            .ok_or_else(|| {
                BackendError::Protocol("Zoom OAuth response has no access_token".into())
            })?
            .to_string();
        let lifetime = raw["expires_in"]
            .as_u64()
            .unwrap_or(3600)
            .min(MAX_TOKEN_LIFETIME);
        debug!(expires_in = lifetime, "Zoom access token refreshed");

        let now = Instant::now();
        *cached = Some(AccessToken {
            value: value.clone(),
            expires_at: now
                .checked_add(Duration::from_secs(lifetime))
                .unwrap_or(now),
        });
        Ok(value)
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, BackendError> {
        let token = self.access_token().await?;
        let mut request = self
            .api
            .request(method, path)?
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.api.send(request).await
    }

    fn list_users(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let query = [
                ("status", opt_str(&args, "status").unwrap_or("active").to_string()),
                ("page_size", int_arg(&args, "page_size", 30).to_string()),
            ];
            let raw = self.call(Method::GET, "/users", &query, None).await?;
            Ok(Value::Array(items(&raw, "users")))
        })
    }

    fn get_user(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let user = str_arg(&args, "user_id")?;
            let path = format!("/users/{}", segment(user));
            self.call(Method::GET, &path, &[], None).await
        })
    }

    fn list_meetings(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let user = opt_str(&args, "user_id").unwrap_or("me");
            let query = [("type", opt_str(&args, "type").unwrap_or("scheduled").to_string())];
            let path = format!("/users/{}/meetings", segment(user));
            let raw = self.call(Method::GET, &path, &query, None).await?;
            Ok(Value::Array(items(&raw, "meetings")))
        })
    }

    fn create_meeting(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let user = opt_str(&args, "user_id").unwrap_or("me");
            let mut body = json!({
                "topic": str_arg(&args, "topic")?,
                "duration": int_arg(&args, "duration", 30),
                "type": 2,
            });
            if let Some(start) = opt_str(&args, "start_time") {
                body["start_time"] = json!(start);
            } else {
                // Instant meeting
                body["type"] = json!(1);
            }
            let path = format!("/users/{}/meetings", segment(user));
            let created = self.call(Method::POST, &path, &[], Some(&body)).await?;
            Ok(json!({
                "id": created["id"],
                "topic": created["topic"],
                "start_time": created["start_time"],
                "join_url": created["join_url"],
            }))
        })
    }
}
