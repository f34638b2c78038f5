//! Connector registry.
//!
//! [`ConnectorRegistry`] maps logical names to [`ConnectorDescriptor`]s and
//! caches constructed connectors.
//!
//! ## Instance cache
//!
//! [`ConnectorRegistry::get`] resolves the connector's inputs first and keys
//! the cache on `(name, fingerprint)`. The same resolved inputs always give
//! back the same `Arc`; different inputs (say, another token passed as an
//! override) give a separate instance. When two tasks race on a missing key,
//! both construct but only the first insert is kept and returned to both.
//!
//! The cache is unbounded for the life of the process.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::connector::{Bound, Connector, MethodSpec, ToolCategory, VendorConnector};
use crate::error::ConnectorError;
use crate::inputs::{InputResolver, InputSpec, Overrides, ResolvedConfig};

type Constructor =
    Arc<dyn Fn(ResolvedConfig) -> Result<Arc<dyn Connector>, ConnectorError> + Send + Sync>;

/// `(logical name, config fingerprint)`
type CacheKey = (String, String);

/// Everything the registry knows about a connector type.
#[derive(Clone)]
pub struct ConnectorDescriptor {
    pub name: &'static str,
    pub category: ToolCategory,
    pub description: &'static str,
    pub inputs: Vec<InputSpec>,
    pub methods: Vec<MethodSpec>,
    duplicate_methods: Vec<String>,
    constructor: Constructor,
}

impl ConnectorDescriptor {
    pub fn of<C: VendorConnector>() -> Self {
        let table = C::methods();
        Self {
            name: C::NAME,
            category: C::CATEGORY,
            description: C::DESCRIPTION,
            inputs: C::inputs(),
            methods: table.specs().cloned().collect(),
            duplicate_methods: table.duplicates().to_vec(),
            constructor: Arc::new(
                |config: ResolvedConfig| -> Result<Arc<dyn Connector>, ConnectorError> {
                    Ok(Arc::new(Bound::<C>::build(config)?))
                },
            ),
        }
    }

    /// Check the descriptor is well formed: a usable name and no repeated
    /// input, env var or method names.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        let valid_name = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid_name {
            return Err(ConnectorError::InvalidDescriptor(format!(
                "invalid connector name '{}': only lowercase alphanumerics and underscores allowed",
                self.name
            )));
        }

        let mut seen_inputs = Vec::new();
        let mut seen_env = Vec::new();
        for spec in &self.inputs {
            if seen_inputs.contains(&spec.name.as_str()) {
                return Err(ConnectorError::InvalidDescriptor(format!(
                    "connector '{}' declares input '{}' twice",
                    self.name, spec.name
                )));
            }
            seen_inputs.push(spec.name.as_str());

            if let Some(var) = spec.env_var.as_deref() {
                if seen_env.contains(&var) {
                    return Err(ConnectorError::InvalidDescriptor(format!(
                        "connector '{}' reads env var {var} for two inputs",
                        self.name
                    )));
                }
                seen_env.push(var);
            }
        }

        if let Some(method) = self.duplicate_methods.first() {
            return Err(ConnectorError::InvalidDescriptor(format!(
                "connector '{}' declares method '{method}' twice",
                self.name
            )));
        }
        Ok(())
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }

    fn construct(&self, config: ResolvedConfig) -> Result<Arc<dyn Connector>, ConnectorError> {
        (self.constructor)(config)
    }
}

impl fmt::Debug for ConnectorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("inputs", &self.inputs)
            .field("methods", &self.methods.iter().map(|m| &m.name).collect::<Vec<_>>())
            .finish()
    }
}

/// Registry of connector types plus the instance cache.
///
/// Built once at startup and shared by `Arc`.
pub struct ConnectorRegistry {
    descriptors: IndexMap<&'static str, ConnectorDescriptor>,
    resolver: InputResolver,
    cache: RwLock<HashMap<CacheKey, Arc<dyn Connector>>>,
}

impl ConnectorRegistry {
    /// An empty registry.
    pub fn new(resolver: InputResolver) -> Self {
        Self {
            descriptors: IndexMap::new(),
            resolver,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// A registry holding every built-in connector, in the order of
    /// [`crate::connectors::builtin`].
    pub fn with_builtin(resolver: InputResolver) -> Result<Self, ConnectorError> {
        let mut registry = Self::new(resolver);
        for descriptor in crate::connectors::builtin() {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: ConnectorDescriptor) -> Result<(), ConnectorError> {
        if self.descriptors.contains_key(descriptor.name) {
            return Err(ConnectorError::DuplicateConnector(descriptor.name.to_string()));
        }
        descriptor.validate()?;
        debug!(
            connector = descriptor.name,
            inputs = descriptor.inputs.len(),
            methods = descriptor.methods.len(),
            "connector registered"
        );
        self.descriptors.insert(descriptor.name, descriptor);
        Ok(())
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> impl Iterator<Item = &ConnectorDescriptor> {
        self.descriptors.values()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.keys().copied().collect()
    }

    pub fn descriptor(&self, name: &str) -> Result<&ConnectorDescriptor, ConnectorError> {
        self.descriptors
            .get(name)
            .ok_or_else(|| ConnectorError::UnknownConnector(name.to_string()))
    }

    pub fn resolver(&self) -> &InputResolver {
        &self.resolver
    }

    /// Get a connector for the inputs that resolve right now, constructing
    /// and caching it on first use.
    pub async fn get(
        &self,
        name: &str,
        overrides: &Overrides,
    ) -> Result<Arc<dyn Connector>, ConnectorError> {
        let descriptor = self.descriptor(name)?;
        let config = self.resolver.resolve_all(&descriptor.inputs, overrides)?;
        let key = (descriptor.name.to_string(), config.fingerprint());

        if let Some(existing) = self.cache.read().await.get(&key) {
            debug!(connector = name, "connector cache hit");
            return Ok(Arc::clone(existing));
        }

        let fresh = descriptor.construct(config)?;
        let mut cache = self.cache.write().await;
        let stored = cache.entry(key).or_insert_with(|| {
            info!(connector = name, "connector constructed");
            fresh
        });
        Ok(Arc::clone(stored))
    }

    /// Drop every cached instance.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("connectors", &self.names())
            .finish()
    }
}
