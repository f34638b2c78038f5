//! Command line and config file handling.
//!
//! The config file is optional. It is located in this order:
//!
//! 1. `--config <path>` CLI flag
//! 2. `VENDOR_CONNECTORS_CONFIG` environment variable
//! 3. `vendor-connectors.toml`, `.yaml`, `.yml` or `.json` in the working
//!    directory
//!
//! The format comes from the file extension, or is sniffed from the content
//! when the extension is unknown. Sections mirror connector names:
//!
//! ```toml
//! interactive = false
//!
//! [logging]
//! level = "info"
//!
//! [frameworks]
//! available = ["langchain"]
//!
//! [github]
//! owner = "acme"
//!
//! [vault]
//! url = "https://vault.internal:8200"
//! mount = "kv"
//! ```
//!
//! Besides the typed [`AppConfig`], the whole document is flattened into
//! dotted keys (`github.owner`, `vault.url`) that connector inputs refer to
//! through their `config_key`.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::connector::{Args, MethodSpec, ParamKind};
use crate::error::ConnectorError;
use crate::inputs::{ConfigValues, EnvSource, Overrides};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "VENDOR_CONNECTORS_CONFIG";

/// File names probed in the working directory, in order.
pub const DEFAULT_FILE_NAMES: [&str; 4] = [
    "vendor-connectors.toml",
    "vendor-connectors.yaml",
    "vendor-connectors.yml",
    "vendor-connectors.json",
];

/// CLI arguments parsed by `clap`.
#[derive(Debug, Parser)]
#[command(
    name = "vendor-connectors",
    version,
    about = "Call vendor APIs through uniform connectors, as CLI commands or MCP tools"
)]
pub struct Cli {
    /// Path to a config file (TOML, YAML or JSON)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Prompt on the terminal for missing inputs (never in CI)
    #[arg(long, global = true)]
    pub interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List registered connectors
    List,
    /// Call a connector method and print the JSON result
    Call {
        /// Input override, e.g. --input token=abc (repeatable)
        #[arg(long = "input", value_name = "NAME=VALUE")]
        inputs: Vec<String>,
        /// Connector name, e.g. github
        connector: String,
        /// Method name, e.g. list_repositories
        method: String,
        /// Method arguments: --name=value, --name value, or --flag
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
        args: Vec<String>,
    },
    /// Print tool metadata as JSON
    Tools {
        /// Only this connector's tools
        #[arg(long)]
        connector: Option<String>,
        /// auto, langchain, crewai, strands or functions
        #[arg(long, default_value = "auto")]
        framework: String,
        /// Only tools in this category (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// Run the MCP server on stdio
    Serve,
}

/// Typed view of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Allow interactive prompts for missing inputs.
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub frameworks: FrameworksConfig,
    /// Per-connector sections (`[github]`, `[vault]`, ...), kept as is.
    #[serde(flatten)]
    pub connectors: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Tracing filter directive, e.g. `info` or `vendor_connectors=debug`.
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameworksConfig {
    /// Agent frameworks installed alongside, consulted by `--framework auto`.
    #[serde(default)]
    pub available: Vec<String>,
}

/// A loaded config file (or the empty default when there is none).
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub path: Option<PathBuf>,
    pub app: AppConfig,
    /// Flattened `dotted.key → value` map for the input resolver.
    pub values: ConfigValues,
}

/// Errors loading the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {} as {format}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        format: ConfigFormat,
        message: String,
    },
    #[error("config file {} must contain a table at the top level", .0.display())]
    NotATable(PathBuf),
    #[error("invalid config file {}: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        })
    }
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Best guess from the content: JSON if it opens with `{`, then whichever
    /// of TOML or YAML parses.
    pub fn sniff(content: &str) -> Self {
        if content.trim_start().starts_with('{') {
            ConfigFormat::Json
        } else if toml::from_str::<toml::Table>(content).is_ok() {
            ConfigFormat::Toml
        } else {
            ConfigFormat::Yaml
        }
    }

    fn parse(self, content: &str) -> Result<Value, String> {
        match self {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Locate and load the config file relative to the process working directory.
pub fn load(explicit: Option<&Path>, env: &dyn EnvSource) -> Result<LoadedConfig, ConfigError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    load_from(explicit, env, &cwd)
}

/// Locate and load the config file, probing `cwd` for default names.
pub fn load_from(
    explicit: Option<&Path>,
    env: &dyn EnvSource,
    cwd: &Path,
) -> Result<LoadedConfig, ConfigError> {
    let path = match explicit {
        Some(path) => Some(expand_tilde(path, env)),
        None => match env.var(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            Some(path) => Some(expand_tilde(Path::new(&path), env)),
            None => DEFAULT_FILE_NAMES
                .iter()
                .map(|name| cwd.join(name))
                .find(|candidate| candidate.is_file()),
        },
    };

    match path {
        Some(path) => load_file(&path),
        None => Ok(LoadedConfig::default()),
    }
}

/// Read and parse one config file.
pub fn load_file(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let format = ConfigFormat::from_path(path).unwrap_or_else(|| ConfigFormat::sniff(&content));
    let document = format.parse(&content).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        format,
        message,
    })?;

    // An empty YAML file parses as null.
    let document = if document.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        document
    };
    if !document.is_object() {
        return Err(ConfigError::NotATable(path.to_path_buf()));
    }

    let values = flatten(&document);
    let app: AppConfig =
        serde_json::from_value(document).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(LoadedConfig {
        path: Some(path.to_path_buf()),
        app,
        values,
    })
}

/// Flatten nested tables into `a.b.c → leaf`. Arrays are leaves.
pub fn flatten(document: &Value) -> ConfigValues {
    fn walk(prefix: &str, value: &Value, out: &mut ConfigValues) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    walk(&path, child, out);
                }
            }
            leaf => {
                out.insert(prefix.to_string(), leaf.clone());
            }
        }
    }

    let mut out = ConfigValues::new();
    walk("", document, &mut out);
    out
}

/// Expand a leading `~` to `$HOME`.
fn expand_tilde(path: &Path, env: &dyn EnvSource) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = env.var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

/// Whether the input resolver may prompt: requested by flag or config, and
/// not running under CI.
pub fn prompting_allowed(flag: bool, app: &AppConfig, env: &dyn EnvSource) -> bool {
    (flag || app.interactive) && env.var("CI").is_none()
}

/// Parse `--name=value`, `--name value` and bare `--flag` tokens into call
/// arguments. Dashes in names become underscores.
///
/// With the target method known, a value for a `string` parameter is kept
/// verbatim, so `--title=42` stays `"42"`. Values for other parameters, or
/// for names the method does not declare, are JSON when they parse as JSON
/// and strings otherwise. A bare `--flag` is `true`.
pub fn parse_call_args(
    raw: &[String],
    method: Option<&MethodSpec>,
) -> Result<Args, ConnectorError> {
    let mut args = Args::new();
    let mut tokens = raw.iter().peekable();

    while let Some(token) = tokens.next() {
        let Some(body) = token.strip_prefix("--") else {
            return Err(ConnectorError::InvalidArguments(format!(
                "unexpected argument '{token}' (expected --name=value)"
            )));
        };

        let (name, value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => match tokens.peek() {
                Some(next) if !next.starts_with("--") => {
                    let value = next.as_str();
                    tokens.next();
                    (body, Some(value))
                }
                _ => (body, None),
            },
        };

        if name.is_empty() {
            return Err(ConnectorError::InvalidArguments(
                "empty argument name".to_string(),
            ));
        }
        let name = name.replace('-', "_");
        let kind = method
            .and_then(|m| m.find_param(&name))
            .map(|p| p.kind);
        let value = match value {
            Some(raw) => coerce_value(raw, kind),
            None => Value::Bool(true),
        };
        args.insert(name, value);
    }
    Ok(args)
}

fn coerce_value(raw: &str, kind: Option<ParamKind>) -> Value {
    match kind {
        Some(ParamKind::String) => Value::String(raw.to_string()),
        _ => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

/// Parse repeated `--input name=value` flags. Values stay strings.
pub fn parse_inputs(raw: &[String]) -> Result<Overrides, ConnectorError> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                Ok((name.to_string(), Value::String(value.to_string())))
            }
            _ => Err(ConnectorError::InvalidArguments(format!(
                "invalid --input '{pair}' (expected name=value)"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ParamSpec;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn toml_file_is_loaded_and_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendor-connectors.toml");
        std::fs::write(
            &path,
            r#"
interactive = true

[logging]
level = "debug"

[frameworks]
available = ["crewai"]

[github]
owner = "acme"

[vault]
url = "http://vault:8200"
"#,
        )
        .unwrap();

        let loaded = load_from(None, &env(&[]), dir.path()).unwrap();
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        assert!(loaded.app.interactive);
        assert_eq!(loaded.app.logging.level.as_deref(), Some("debug"));
        assert_eq!(loaded.app.frameworks.available, vec!["crewai"]);
        assert!(loaded.app.connectors.contains_key("github"));
        assert_eq!(loaded.values["github.owner"], json!("acme"));
        assert_eq!(loaded.values["vault.url"], json!("http://vault:8200"));
        assert_eq!(loaded.values["frameworks.available"], json!(["crewai"]));
    }

    #[test]
    fn yaml_file_via_env_var() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yml");
        std::fs::write(&path, "slack:\n  token: xoxb-from-file\n").unwrap();

        let env = env(&[(CONFIG_ENV_VAR, path.to_str().unwrap())]);
        let loaded = load_from(None, &env, Path::new("/nonexistent")).unwrap();
        assert_eq!(loaded.values["slack.token"], json!("xoxb-from-file"));
    }

    #[test]
    fn unknown_extension_is_sniffed() {
        let mut json_file = tempfile::NamedTempFile::new().unwrap();
        write!(json_file, r#"{{ "zoom": {{ "account_id": "acct" }} }}"#).unwrap();
        let loaded = load_file(json_file.path()).unwrap();
        assert_eq!(loaded.values["zoom.account_id"], json!("acct"));

        let mut toml_file = tempfile::NamedTempFile::new().unwrap();
        write!(toml_file, "[meshy]\napi_url = \"http://localhost\"\n").unwrap();
        let loaded = load_file(toml_file.path()).unwrap();
        assert_eq!(loaded.values["meshy.api_url"], json!("http://localhost"));

        let mut yaml_file = tempfile::NamedTempFile::new().unwrap();
        write!(yaml_file, "cursor:\n  api_url: http://localhost:9\n").unwrap();
        let loaded = load_file(yaml_file.path()).unwrap();
        assert_eq!(loaded.values["cursor.api_url"], json!("http://localhost:9"));
    }

    #[test]
    fn no_file_gives_empty_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_from(None, &env(&[]), dir.path()).unwrap();
        assert!(loaded.path.is_none());
        assert!(loaded.values.is_empty());
        assert!(!loaded.app.interactive);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = load_from(Some(missing.as_path()), &env(&[]), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_and_non_table_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(load_file(&broken).unwrap_err(), ConfigError::Parse { .. }));

        let list = dir.path().join("list.yaml");
        std::fs::write(&list, "- a\n- b\n").unwrap();
        assert!(matches!(load_file(&list).unwrap_err(), ConfigError::NotATable(_)));
    }

    #[test]
    fn tilde_expands_to_home() {
        let env = env(&[("HOME", "/home/dev")]);
        assert_eq!(
            expand_tilde(Path::new("~/cfg/vc.toml"), &env),
            PathBuf::from("/home/dev/cfg/vc.toml")
        );
        assert_eq!(expand_tilde(Path::new("/etc/vc.toml"), &env), PathBuf::from("/etc/vc.toml"));
    }

    #[test]
    fn ci_disables_prompting() {
        let app = AppConfig {
            interactive: true,
            ..AppConfig::default()
        };
        assert!(prompting_allowed(false, &app, &env(&[])));
        assert!(!prompting_allowed(true, &app, &env(&[("CI", "true")])));
        assert!(!prompting_allowed(false, &AppConfig::default(), &env(&[])));
    }

    #[test]
    fn call_args_parse_json_strings_and_flags() {
        let args = parse_call_args(
            &strings(&[
                "--limit=10",
                "--owner",
                "acme",
                "--include-branches",
                "--labels=[\"bug\",\"p1\"]",
                "--title=hello world",
                "--dry-run",
            ]),
            None,
        )
        .unwrap();
        assert_eq!(args["limit"], json!(10));
        assert_eq!(args["owner"], json!("acme"));
        assert_eq!(args["include_branches"], json!(true));
        assert_eq!(args["labels"], json!(["bug", "p1"]));
        assert_eq!(args["title"], json!("hello world"));
        assert_eq!(args["dry_run"], json!(true));
    }

    #[test]
    fn call_args_reject_positional_tokens() {
        let err = parse_call_args(&strings(&["stray"]), None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArguments);
        assert!(parse_call_args(&strings(&["--=x"]), None).is_err());
    }

    #[test]
    fn string_params_keep_raw_text() {
        let method = MethodSpec::new("send_message", "Post a message")
            .param(ParamSpec::string("text", "Message text").required())
            .param(ParamSpec::string("thread_id", "Parent message"))
            .param(ParamSpec::integer("limit", "Page size"))
            .param(ParamSpec::boolean("unfurl", "Expand links"));
        let args = parse_call_args(
            &strings(&[
                "--text=42",
                "--thread-id",
                "null",
                "--limit=5",
                "--unfurl=false",
                "--extra=true",
            ]),
            Some(&method),
        )
        .unwrap();
        assert_eq!(args["text"], json!("42"));
        assert_eq!(args["thread_id"], json!("null"));
        assert_eq!(args["limit"], json!(5));
        assert_eq!(args["unfurl"], json!(false));
        assert_eq!(args["extra"], json!(true));
    }

    #[test]
    fn numeric_looking_text_reaches_a_required_string_param() {
        let method = MethodSpec::new("create_issue", "Open an issue")
            .param(ParamSpec::string("title", "Issue title").required());
        for raw in ["--title=42", "--title=true", "--title=null"] {
            let args = parse_call_args(&strings(&[raw]), Some(&method)).unwrap();
            let validated = crate::dispatch::validate_args(&method, args).unwrap();
            assert_eq!(validated["title"], json!(raw.trim_start_matches("--title=")));
        }
    }

    #[test]
    fn inputs_stay_strings() {
        let inputs = parse_inputs(&strings(&["token=123", "api_url=http://x?a=b"])).unwrap();
        assert_eq!(inputs["token"], json!("123"));
        assert_eq!(inputs["api_url"], json!("http://x?a=b"));
        assert!(parse_inputs(&strings(&["novalue"])).is_err());
    }

    #[test]
    fn cli_parses_call_with_trailing_args() {
        let cli = Cli::try_parse_from([
            "vendor-connectors",
            "--interactive",
            "call",
            "--input",
            "token=abc",
            "github",
            "list_repositories",
            "--type-filter=public",
            "--include-branches",
        ])
        .unwrap();
        assert!(cli.interactive);
        match cli.command {
            Command::Call {
                inputs,
                connector,
                method,
                args,
            } => {
                assert_eq!(inputs, vec!["token=abc"]);
                assert_eq!(connector, "github");
                assert_eq!(method, "list_repositories");
                assert_eq!(args, vec!["--type-filter=public", "--include-branches"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_tools_defaults_to_auto() {
        let cli =
            Cli::try_parse_from(["vendor-connectors", "tools", "--connector", "slack"]).unwrap();
        match cli.command {
            Command::Tools {
                connector,
                framework,
                categories,
            } => {
                assert_eq!(connector.as_deref(), Some("slack"));
                assert_eq!(framework, "auto");
                assert!(categories.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
