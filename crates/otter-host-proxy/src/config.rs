//! Proxy configuration
//!
//! Controls which host methods are shadowed by polyfills and how bean-style
//! getters and setters are discovered.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::descriptor::CollectionKind;
use crate::error::ProxyResult;
use crate::polyfill;

/// Configuration shared by a descriptor cache and every handler built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxyConfig {
    /// List method names answered by the list polyfill instead of the host method
    pub list_override_methods: BTreeSet<String>,

    /// Set method names answered by the set polyfill instead of the host method
    pub set_override_methods: BTreeSet<String>,

    /// Map method names suppressed from generic method resolution
    pub map_override_methods: BTreeSet<String>,

    /// Resolve `getX()`/`isX()` and `setX(v)` as properties
    pub getters_and_setters: bool,

    /// Prefixes recognized for zero-argument getters
    pub getter_prefixes: Vec<String>,

    /// Prefixes recognized for one-argument setters
    pub setter_prefixes: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            list_override_methods: polyfill::list::registry().names().map(String::from).collect(),
            set_override_methods: polyfill::set::registry().names().map(String::from).collect(),
            map_override_methods: BTreeSet::new(),
            getters_and_setters: true,
            getter_prefixes: vec!["get".to_string(), "is".to_string()],
            setter_prefixes: vec!["set".to_string()],
        }
    }
}

impl ProxyConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration in which host methods always win over polyfills
    pub fn host_methods_first() -> Self {
        Self {
            list_override_methods: BTreeSet::new(),
            set_override_methods: BTreeSet::new(),
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> ProxyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the list override methods
    pub fn list_override_methods<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.list_override_methods = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the set override methods
    pub fn set_override_methods<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_override_methods = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the map override methods
    pub fn map_override_methods<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_override_methods = names.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable getter/setter resolution
    pub fn getters_and_setters(mut self, enabled: bool) -> Self {
        self.getters_and_setters = enabled;
        self
    }

    /// Override methods for a collection shape
    pub fn override_methods_for(&self, kind: CollectionKind) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        match kind {
            CollectionKind::List => &self.list_override_methods,
            CollectionKind::Set => &self.set_override_methods,
            CollectionKind::Map => &self.map_override_methods,
            CollectionKind::None | CollectionKind::Array => &EMPTY,
        }
    }
}
