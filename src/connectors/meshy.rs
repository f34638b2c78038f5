//! Meshy 3D generation API connector.

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use super::{int_arg, opt_str, str_arg};
use crate::connector::{Args, MethodSpec, MethodTable, ParamSpec, ToolCategory, VendorConnector};
use crate::error::{BackendError, ConnectorError};
use crate::http::{segment, Auth, HttpBackend};
use crate::inputs::{InputSpec, ResolvedConfig};

const DEFAULT_API_URL: &str = "https://api.meshy.ai";
const TEXT_TO_3D: &str = "/openapi/v2/text-to-3d";

pub struct Meshy {
    api: HttpBackend,
}

impl VendorConnector for Meshy {
    const NAME: &'static str = "meshy";
    const CATEGORY: ToolCategory = ToolCategory::Meshy;
    const DESCRIPTION: &'static str = "Meshy text-to-3D generation";

    fn inputs() -> Vec<InputSpec> {
        vec![
            InputSpec::new("api_key")
                .env("MESHY_API_KEY")
                .config_key("meshy.api_key")
                .secret()
                .required(),
            InputSpec::new("api_url")
                .env("MESHY_API_URL")
                .config_key("meshy.api_url")
                .default_value(DEFAULT_API_URL),
        ]
    }

    fn build(config: &ResolvedConfig) -> Result<Self, ConnectorError> {
        let api_key = config.require_string("api_key")?;
        let api_url = config
            .get_string("api_url")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Ok(Self {
            api: HttpBackend::new("Meshy", &api_url, Auth::Bearer(api_key)),
        })
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new()
            .method(
                MethodSpec::new("text_to_3d", "Start a text-to-3D task. Returns the task ID.")
                    .param(ParamSpec::string("prompt", "Description of the object.").required())
                    .param(
                        ParamSpec::string("mode", "'preview' builds a mesh; 'refine' textures it.")
                            .default("preview")
                            .one_of(["preview", "refine"]),
                    )
                    .param(
                        ParamSpec::string("art_style", "Visual style.")
                            .default("realistic")
                            .one_of(["realistic", "sculpture"]),
                    )
                    .param(ParamSpec::string("negative_prompt", "What to avoid."))
                    .param(ParamSpec::string(
                        "preview_task_id",
                        "Preview task to refine (refine mode).",
                    )),
                Self::text_to_3d,
            )
            .method(
                MethodSpec::new("get_task", "Get a text-to-3D task's status and outputs.")
                    .param(ParamSpec::string("task_id", "Task ID.").required()),
                Self::get_task,
            )
            .method(
                MethodSpec::new("list_tasks", "List recent text-to-3D tasks.")
                    .param(ParamSpec::integer("page_size", "Tasks per page.").default(10)),
                Self::list_tasks,
            )
    }
}

impl Meshy {
    fn text_to_3d(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let mode = opt_str(&args, "mode").unwrap_or("preview");
            let mut body = json!({ "mode": mode, "prompt": str_arg(&args, "prompt")? });
            if mode == "refine" {
                body["preview_task_id"] = json!(str_arg(&args, "preview_task_id")?);
            } else {
                body["art_style"] = json!(opt_str(&args, "art_style").unwrap_or("realistic"));
                if let Some(negative) = opt_str(&args, "negative_prompt") {
                    body["negative_prompt"] = json!(negative);
                }
            }
            let raw = self.api.post(TEXT_TO_3D, &body).await?;
            Ok(json!({ "task_id": raw["result"], "mode": mode }))
        })
    }

    fn get_task(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let id = str_arg(&args, "task_id")?;
            let raw = self.api.get(&format!("{TEXT_TO_3D}/{}", segment(id)), &[]).await?;
            Ok(summarize_task(&raw))
        })
    }

    fn list_tasks(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let query = [("page_size", int_arg(&args, "page_size", 10).to_string())];
            let raw = self.api.get(TEXT_TO_3D, &query).await?;
            let tasks: Vec<Value> = raw
                .as_array()
                .map(|list| list.iter().map(summarize_task).collect())
                .unwrap_or_default();
            Ok(Value::Array(tasks))
        })
    }
}

fn summarize_task(task: &Value) -> Value {
    json!({
        "task_id": task["id"],
        "status": task["status"],
        "progress": task["progress"],
        "model_urls": task["model_urls"],
        "thumbnail_url": task["thumbnail_url"],
        "error": task["task_error"]["message"],
    })
}
