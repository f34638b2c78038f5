//! GitHub REST API connector.

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use super::{bool_arg, items, opt_str, str_arg};
use crate::connector::{Args, MethodSpec, MethodTable, ParamSpec, ToolCategory, VendorConnector};
use crate::error::{BackendError, ConnectorError};
use crate::http::{segment, Auth, HttpBackend};
use crate::inputs::{InputSpec, ResolvedConfig};

const DEFAULT_API_URL: &str = "https://api.github.com";

pub struct GitHub {
    api: HttpBackend,
    owner: Option<String>,
}

impl VendorConnector for GitHub {
    const NAME: &'static str = "github";
    const CATEGORY: ToolCategory = ToolCategory::Github;
    const DESCRIPTION: &'static str = "GitHub repositories and issues";

    fn inputs() -> Vec<InputSpec> {
        vec![
            InputSpec::new("token")
                .env("GITHUB_TOKEN")
                .config_key("github.token")
                .secret()
                .required(),
            InputSpec::new("owner")
                .env("GITHUB_OWNER")
                .config_key("github.owner"),
            InputSpec::new("api_url")
                .env("GITHUB_API_URL")
                .config_key("github.api_url")
                .default_value(DEFAULT_API_URL),
        ]
    }

    fn build(config: &ResolvedConfig) -> Result<Self, ConnectorError> {
        let token = config.require_string("token")?;
        let api_url = config
            .get_string("api_url")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api = HttpBackend::new("GitHub", &api_url, Auth::Bearer(token))
            .header("accept", "application/vnd.github+json")
            .header("x-github-api-version", "2022-11-28");
        Ok(Self {
            api,
            owner: config.get_string("owner").filter(|o| !o.is_empty()),
        })
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new()
            .method(
                MethodSpec::new(
                    "list_repositories",
                    "List the configured organization's repositories, or the user's own.",
                )
                .param(ParamSpec::string(
                    "owner",
                    "Organization to list. Defaults to the configured owner.",
                ))
                .param(
                    ParamSpec::string("type_filter", "Repository type filter.")
                        .default("all")
                        .one_of(["all", "public", "private", "forks", "sources", "member"]),
                )
                .param(
                    ParamSpec::boolean("include_branches", "Include each repository's branches.")
                        .default(false),
                ),
                Self::list_repositories,
            )
            .method(
                MethodSpec::new("get_repository", "Get a repository's details.")
                    .param(
                        ParamSpec::string(
                            "repo",
                            "Repository as 'owner/name', or 'name' under the configured owner.",
                        )
                        .required(),
                    ),
                Self::get_repository,
            )
            .method(
                MethodSpec::new("list_issues", "List issues of a repository.")
                    .param(ParamSpec::string("repo", "Repository as 'owner/name'.").required())
                    .param(
                        ParamSpec::string("state", "Issue state.")
                            .default("open")
                            .one_of(["open", "closed", "all"]),
                    ),
                Self::list_issues,
            )
            .method(
                MethodSpec::new("create_issue", "Open an issue in a repository.")
                    .param(ParamSpec::string("repo", "Repository as 'owner/name'.").required())
                    .param(ParamSpec::string("title", "Issue title.").required())
                    .param(ParamSpec::string("body", "Issue body (Markdown)."))
                    .param(ParamSpec::array("labels", "Label names to apply.")),
                Self::create_issue,
            )
    }
}

impl GitHub {
    /// `/repos/{owner}/{name}` for `owner/name` or a bare name qualified with
    /// the configured owner.
    fn repo_path(&self, repo: &str) -> Result<String, BackendError> {
        if let Some((owner, name)) = repo.split_once('/') {
            return Ok(repo_path(owner, name));
        }
        match &self.owner {
            Some(owner) => Ok(repo_path(owner, repo)),
            None => Err(BackendError::Other(format!(
                "repository '{repo}' has no owner and GITHUB_OWNER is not set"
            ))),
        }
    }

    fn list_repositories(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let type_filter = opt_str(&args, "type_filter").unwrap_or("all").to_string();
            let owner = opt_str(&args, "owner").map(String::from).or_else(|| self.owner.clone());
            let path = match &owner {
                Some(owner) => format!("/orgs/{}/repos", segment(owner)),
                None => "/user/repos".to_string(),
            };
            let query = [("type", type_filter), ("per_page", "100".to_string())];
            let raw = self.api.get(&path, &query).await?;

            let mut repos = Vec::new();
            for repo in raw.as_array().cloned().unwrap_or_default() {
                let mut entry = summarize_repository(&repo);
                if bool_arg(&args, "include_branches", false) {
                    let path = self.repo_path(repo["full_name"].as_str().unwrap_or_default())?;
                    let branches = self.api.get(&format!("{path}/branches"), &[]).await?;
                    let names: Vec<Value> = branches
                        .as_array()
                        .map(|list| list.iter().map(|b| b["name"].clone()).collect())
                        .unwrap_or_default();
                    entry["branches"] = Value::Array(names);
                }
                repos.push(entry);
            }
            Ok(Value::Array(repos))
        })
    }

    fn get_repository(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let path = self.repo_path(str_arg(&args, "repo")?)?;
            self.api.get(&path, &[]).await
        })
    }

    fn list_issues(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let path = self.repo_path(str_arg(&args, "repo")?)?;
            let state = opt_str(&args, "state").unwrap_or("open").to_string();
            let raw = self
                .api
                .get(&format!("{path}/issues"), &[("state", state)])
                .await?;
            let issues: Vec<Value> = raw
                .as_array()
                .cloned()
                .unwrap_or_default()
                .iter()
                .filter(|i| i.get("pull_request").is_none())
                .map(summarize_issue)
                .collect();
            Ok(Value::Array(issues))
        })
    }

    fn create_issue(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let path = self.repo_path(str_arg(&args, "repo")?)?;
            let mut body = json!({ "title": str_arg(&args, "title")? });
            if let Some(text) = opt_str(&args, "body") {
                body["body"] = json!(text);
            }
            if let Some(labels) = args.get("labels") {
                body["labels"] = labels.clone();
            }
            let created = self
                .api
                .post(&format!("{path}/issues"), &body)
                .await?;
            Ok(summarize_issue(&created))
        })
    }
}

fn repo_path(owner: &str, name: &str) -> String {
    format!("/repos/{}/{}", segment(owner), segment(name))
}

fn summarize_repository(repo: &Value) -> Value {
    json!({
        "name": repo["name"],
        "full_name": repo["full_name"],
        "private": repo["private"],
        "description": repo["description"],
        "default_branch": repo["default_branch"],
        "url": repo["html_url"],
    })
}

fn summarize_issue(issue: &Value) -> Value {
    let labels: Vec<Value> = items(issue, "labels")
        .iter()
        .map(|l| l["name"].clone())
        .collect();
    json!({
        "number": issue["number"],
        "title": issue["title"],
        "state": issue["state"],
        "url": issue["html_url"],
        "labels": labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector(owner: Option<&str>) -> GitHub {
        let mut config = ResolvedConfig::new();
        config.insert("token", json!("ghp_test"), true);
        if let Some(owner) = owner {
            config.insert("owner", json!(owner), false);
        }
        GitHub::build(&config).unwrap()
    }

    #[test]
    fn bare_repo_names_use_configured_owner() {
        assert_eq!(
            connector(Some("acme")).repo_path("widgets").unwrap(),
            "/repos/acme/widgets"
        );
        assert_eq!(
            connector(None).repo_path("other/widgets").unwrap(),
            "/repos/other/widgets"
        );
        assert!(connector(None).repo_path("widgets").is_err());
    }

    #[test]
    fn repo_names_cannot_escape_the_repo_path() {
        let github = connector(Some("acme"));
        assert_eq!(
            github.repo_path("acme/widgets/../../user").unwrap(),
            "/repos/acme/widgets%2F..%2F..%2Fuser"
        );
        assert_eq!(
            github.repo_path("widgets?per_page=1#x").unwrap(),
            "/repos/acme/widgets%3Fper_page%3D1%23x"
        );
    }

    #[test]
    fn build_defaults_api_url_and_stays_offline() {
        let github = connector(None);
        assert_eq!(github.api.base_url(), DEFAULT_API_URL);
        assert!(!github.api.is_initialized());
    }

    #[test]
    fn repository_summary_keeps_selected_fields() {
        let raw = json!({
            "name": "widgets",
            "full_name": "acme/widgets",
            "private": true,
            "description": null,
            "default_branch": "main",
            "html_url": "https://github.com/acme/widgets",
            "stargazers_count": 12
        });
        let summary = summarize_repository(&raw);
        assert_eq!(summary["url"], "https://github.com/acme/widgets");
        assert!(summary.get("stargazers_count").is_none());
    }

    #[test]
    fn issue_summary_flattens_labels() {
        let raw = json!({
            "number": 7,
            "title": "Crash",
            "state": "open",
            "html_url": "https://github.com/acme/widgets/issues/7",
            "labels": [{ "name": "bug" }, { "name": "p1" }]
        });
        assert_eq!(summarize_issue(&raw)["labels"], json!(["bug", "p1"]));
    }
}
