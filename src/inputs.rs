//! Layered resolution of connector inputs (API keys, tokens, endpoints).
//!
//! Every connector declares its inputs as [`InputSpec`]s. The
//! [`InputResolver`] resolves each one from the first source that has a
//! value, in this order:
//!
//! 1. **Explicit override** passed by the caller
//! 2. **Environment variable** named by `env_var`
//! 3. **Config file** value at `config_key` (dotted path, e.g. `github.token`)
//! 4. **Interactive prompt**, only when a [`Prompter`] is installed and stdin
//!    is a terminal
//! 5. **Declared default**
//!
//! An empty string is a value, not an absence: `FOO_TOKEN=""` wins over the
//! config file and the default.
//!
//! Secret inputs are never logged. [`ResolvedConfig`]'s `Debug` output masks
//! them and its [`fingerprint`](ResolvedConfig::fingerprint) stores only their
//! SHA-256 digest.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io::{BufRead, IsTerminal, Write};

use indexmap::IndexMap;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::ConnectorError;

/// Replacement text for secret values in any human-facing output.
pub const MASK: &str = "****";

/// Caller-supplied input values, keyed by [`InputSpec::name`].
pub type Overrides = HashMap<String, Value>;

/// Flattened config-file values, keyed by dotted path.
pub type ConfigValues = HashMap<String, Value>;

/// Declaration of one input a connector needs.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub name: String,
    pub env_var: Option<String>,
    pub config_key: Option<String>,
    pub default: Option<Value>,
    pub required: bool,
    pub secret: bool,
}

impl InputSpec {
    /// An optional, non-secret input with no sources yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            env_var: None,
            config_key: None,
            default: None,
            required: false,
            secret: false,
        }
    }

    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env_var = Some(var.into());
        self
    }

    pub fn config_key(mut self, key: impl Into<String>) -> Self {
        self.config_key = Some(key.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Human hint listing where the value could have come from.
    fn source_hint(&self) -> String {
        let mut sources = Vec::new();
        if let Some(var) = &self.env_var {
            sources.push(format!("env {var}"));
        }
        if let Some(key) = &self.config_key {
            sources.push(format!("config key {key}"));
        }
        if sources.is_empty() {
            String::new()
        } else {
            format!(" (set {})", sources.join(" or "))
        }
    }
}

/// Where a resolved value came from (for debug logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Override,
    Environment,
    ConfigFile,
    Prompt,
    Default,
}

/// Source of environment variables. Injected so tests never touch the
/// process environment.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Interactive input source. Returns `None` when no answer is available.
pub trait Prompter: Send + Sync {
    fn prompt(&self, spec: &InputSpec) -> Option<String>;
}

/// Prompts on stderr and reads a line from stdin. Skips (returns `None`)
/// when stdin is not a terminal. Echo is turned off for secret inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&self, spec: &InputSpec) -> Option<String> {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            return None;
        }

        let label = spec.env_var.as_deref().unwrap_or(&spec.name);
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{label}: ");
        let _ = stderr.flush();

        #[cfg(unix)]
        let _echo = if spec.secret {
            EchoGuard::disable()
        } else {
            None
        };

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Restores terminal echo on drop.
#[cfg(unix)]
struct EchoGuard {
    original: nix::sys::termios::Termios,
}

#[cfg(unix)]
impl EchoGuard {
    fn disable() -> Option<Self> {
        use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg};

        let stdin = std::io::stdin();
        let original = tcgetattr(&stdin).ok()?;
        let mut silent = original.clone();
        silent.local_flags.remove(LocalFlags::ECHO);
        tcsetattr(&stdin, SetArg::TCSANOW, &silent).ok()?;
        Some(Self { original })
    }
}

#[cfg(unix)]
impl Drop for EchoGuard {
    fn drop(&mut self) {
        use nix::sys::termios::{tcsetattr, SetArg};

        let _ = tcsetattr(&std::io::stdin(), SetArg::TCSANOW, &self.original);
        // The user's Enter was not echoed either.
        eprintln!();
    }
}

/// Concrete values for one connector construction attempt.
#[derive(Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    values: IndexMap<String, Value>,
    secrets: HashSet<String>,
}

impl ResolvedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value, secret: bool) {
        let name = name.into();
        if secret {
            self.secrets.insert(name.clone());
        }
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The value as a string. Numbers and booleans (e.g. from a config
    /// file) are rendered with their JSON text.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.values.get(name).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
    }

    /// Like [`get_string`](Self::get_string), failing with
    /// `MissingRequiredInput` when absent.
    pub fn require_string(&self, name: &str) -> Result<String, ConnectorError> {
        self.get_string(name)
            .ok_or_else(|| ConnectorError::missing(name))
    }

    pub fn is_secret(&self, name: &str) -> bool {
        self.secrets.contains(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Stable cache key: entries sorted by name, secret values replaced by
    /// the hex SHA-256 of their JSON text.
    pub fn fingerprint(&self) -> String {
        let sorted: BTreeMap<&str, &Value> =
            self.values.iter().map(|(k, v)| (k.as_str(), v)).collect();
        sorted
            .into_iter()
            .map(|(name, value)| {
                if self.is_secret(name) {
                    format!("{name}=sha256:{}", sha256_hex(&value.to_string()))
                } else {
                    format!("{name}={value}")
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.values {
            if self.is_secret(name) {
                map.entry(name, &MASK);
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Resolves [`InputSpec`]s against overrides, environment, config file,
/// an optional prompt, and defaults.
pub struct InputResolver {
    env: Box<dyn EnvSource>,
    config: ConfigValues,
    prompter: Option<Box<dyn Prompter>>,
}

impl Default for InputResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl InputResolver {
    /// Process environment, no config file, no prompting.
    pub fn new() -> Self {
        Self {
            env: Box::new(ProcessEnv),
            config: ConfigValues::new(),
            prompter: None,
        }
    }

    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    pub fn with_config(mut self, config: ConfigValues) -> Self {
        self.config = config;
        self
    }

    /// Enable the interactive source. Only call this when the process is
    /// explicitly allowed to block on user input.
    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Some(Box::new(prompter));
        self
    }

    pub fn prompts(&self) -> bool {
        self.prompter.is_some()
    }

    /// Resolve one input. `Ok(None)` means an optional input had no value.
    pub fn resolve(
        &self,
        spec: &InputSpec,
        overrides: &Overrides,
    ) -> Result<Option<Value>, ConnectorError> {
        match self.lookup(spec, overrides) {
            Some((value, source)) => {
                debug!(
                    input = %spec.name,
                    source = ?source,
                    secret = spec.secret,
                    "input resolved"
                );
                Ok(Some(value))
            }
            None if spec.required => Err(ConnectorError::MissingRequiredInput {
                input: spec.name.clone(),
                hint: spec.source_hint(),
            }),
            None => Ok(None),
        }
    }

    /// Resolve every spec in declaration order. Fails on the first missing
    /// required input.
    pub fn resolve_all(
        &self,
        specs: &[InputSpec],
        overrides: &Overrides,
    ) -> Result<ResolvedConfig, ConnectorError> {
        let mut resolved = ResolvedConfig::new();
        for spec in specs {
            if let Some(value) = self.resolve(spec, overrides)? {
                resolved.insert(spec.name.clone(), value, spec.secret);
            }
        }
        Ok(resolved)
    }

    fn lookup(&self, spec: &InputSpec, overrides: &Overrides) -> Option<(Value, InputSource)> {
        if let Some(v) = overrides.get(&spec.name).filter(|v| !v.is_null()) {
            return Some((v.clone(), InputSource::Override));
        }
        if let Some(v) = spec.env_var.as_deref().and_then(|var| self.env.var(var)) {
            return Some((Value::String(v), InputSource::Environment));
        }
        if let Some(v) = spec
            .config_key
            .as_deref()
            .and_then(|key| self.config.get(key))
            .filter(|v| !v.is_null())
        {
            return Some((v.clone(), InputSource::ConfigFile));
        }
        if let Some(v) = self.prompter.as_ref().and_then(|p| p.prompt(spec)) {
            return Some((Value::String(v), InputSource::Prompt));
        }
        spec.default
            .clone()
            .map(|v| (v, InputSource::Default))
    }
}
