//! HashiCorp Vault KV v2 connector.

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use super::{opt_str, str_arg};
use crate::connector::{Args, MethodSpec, MethodTable, ParamSpec, ToolCategory, VendorConnector};
use crate::error::{BackendError, ConnectorError};
use crate::http::{segment, Auth, HttpBackend};
use crate::inputs::{InputSpec, ResolvedConfig};

pub struct Vault {
    api: HttpBackend,
    mount: String,
}

impl VendorConnector for Vault {
    const NAME: &'static str = "vault";
    const CATEGORY: ToolCategory = ToolCategory::Vault;
    const DESCRIPTION: &'static str = "HashiCorp Vault key/value secrets";

    fn inputs() -> Vec<InputSpec> {
        vec![
            InputSpec::new("url")
                .env("VAULT_ADDR")
                .config_key("vault.url")
                .required(),
            InputSpec::new("token")
                .env("VAULT_TOKEN")
                .config_key("vault.token")
                .secret()
                .required(),
            InputSpec::new("namespace")
                .env("VAULT_NAMESPACE")
                .config_key("vault.namespace"),
            InputSpec::new("mount")
                .env("VAULT_KV_MOUNT")
                .config_key("vault.mount")
                .default_value("secret"),
        ]
    }

    fn build(config: &ResolvedConfig) -> Result<Self, ConnectorError> {
        let url = config.require_string("url")?;
        let token = config.require_string("token")?;
        let mut api = HttpBackend::new(
            "Vault",
            &url,
            Auth::Header {
                name: "x-vault-token",
                value: token,
            },
        );
        if let Some(namespace) = config.get_string("namespace").filter(|n| !n.is_empty()) {
            api = api.header("x-vault-namespace", namespace);
        }
        let mount = config
            .get_string("mount")
            .unwrap_or_else(|| "secret".to_string());
        Ok(Self {
            api,
            mount: mount.trim_matches('/').to_string(),
        })
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new()
            .method(
                MethodSpec::new("read_secret", "Read a secret's key/value data.")
                    .param(ParamSpec::string("path", "Secret path within the mount.").required())
                    .param(ParamSpec::integer(
                        "version",
                        "Specific version to read. Defaults to the latest.",
                    )),
                Self::read_secret,
            )
            .method(
                MethodSpec::new("list_secrets", "List secret names under a path.")
                    .param(
                        ParamSpec::string("path", "Directory path within the mount.").default(""),
                    ),
                Self::list_secrets,
            )
            .method(
                MethodSpec::new("write_secret", "Create or update a secret.")
                    .param(ParamSpec::string("path", "Secret path within the mount.").required())
                    .param(ParamSpec::object("data", "Key/value pairs to store.").required()),
                Self::write_secret,
            )
    }
}

impl Vault {
    fn kv_path(&self, area: &str, path: &str) -> String {
        let path: Vec<_> = path
            .trim_matches('/')
            .split('/')
            .map(segment)
            .collect();
        format!("/v1/{}/{area}/{}", self.mount, path.join("/"))
    }

    fn read_secret(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let path = str_arg(&args, "path")?;
            let query: Vec<(&str, String)> = args
                .get("version")
                .and_then(Value::as_i64)
                .map(|v| ("version", v.to_string()))
                .into_iter()
                .collect();
            let raw = self.api.get(&self.kv_path("data", path), &query).await?;
            Ok(json!({
                "path": path,
                "data": raw["data"]["data"],
                "version": raw["data"]["metadata"]["version"],
            }))
        })
    }

    fn list_secrets(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let path = opt_str(&args, "path").unwrap_or_default();
            let query = [("list", "true".to_string())];
            match self.api.get(&self.kv_path("metadata", path), &query).await {
                Ok(raw) => Ok(raw["data"]["keys"].clone()),
                // Vault answers 404 for an empty directory.
                Err(err) if err.is_not_found() => Ok(Value::Array(Vec::new())),
                Err(err) => Err(err),
            }
        })
    }

    fn write_secret(&self, args: Args) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(async move {
            let path = str_arg(&args, "path")?;
            let data = args.get("data").cloned().unwrap_or_else(|| json!({}));
            let raw = self
                .api
                .post(&self.kv_path("data", path), &json!({ "data": data }))
                .await?;
            Ok(json!({ "path": path, "version": raw["data"]["version"] }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_paths_use_mount_and_area() {
        let mut config = ResolvedConfig::new();
        config.insert("url", json!("http://vault:8200"), false);
        config.insert("token", json!("s.abc"), true);
        config.insert("mount", json!("/kv/"), false);
        let vault = Vault::build(&config).unwrap();
        assert_eq!(vault.kv_path("data", "/apps/web/"), "/v1/kv/data/apps/web");
        assert_eq!(vault.kv_path("metadata", ""), "/v1/kv/metadata/");
        assert_eq!(
            vault.kv_path("data", "apps/web?version=1#x"),
            "/v1/kv/data/apps/web%3Fversion%3D1%23x"
        );
    }

    #[test]
    fn missing_address_is_reported() {
        let mut config = ResolvedConfig::new();
        config.insert("token", json!("s.abc"), true);
        let err = Vault::build(&config).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::MissingRequiredInput);
    }
}
