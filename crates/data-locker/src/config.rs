//! Data Locker configuration
//!
//! Lock policy lives in account and container metadata, never here. The configuration only
//! chooses which requests the gate looks at and how it labels its logs.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use data_locker::config::{LockScope, LockerConfig, LockerConfigProvider, HotReloadConfigProvider};
//!
//! let provider = Arc::new(HotReloadConfigProvider::default());
//! assert_eq!(provider.snapshot().lock_scope, LockScope::Objects);
//!
//! let mut config = LockerConfig::default();
//! config.lock_scope = LockScope::All;
//! provider.update(Arc::new(config));
//! assert_eq!(provider.snapshot().lock_scope, LockScope::All);
//! ```

use crate::error::ConfigError;

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

/// Configuration provider.
///
/// The gate takes one snapshot per request, so all decisions for a request see the same
/// configuration.
///
/// Built-in providers:
/// - [`StaticConfigProvider`] - Immutable configuration (default if not set)
/// - [`HotReloadConfigProvider`] - Runtime-updatable configuration
pub trait LockerConfigProvider: Send + Sync + 'static {
    fn snapshot(&self) -> Arc<LockerConfig>;
}

/// Which requests are subject to locking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockScope {
    /// Only requests addressing an object. Account and container requests always pass.
    #[default]
    Objects,
    /// Every request, whatever it addresses.
    All,
}

/// Data Locker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct LockerConfig {
    /// Which requests are subject to locking.
    ///
    /// Default: [`LockScope::Objects`]
    pub lock_scope: LockScope,

    /// Name recorded on the gate's tracing span.
    ///
    /// Default: `"data-locker"`
    pub log_route: String,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            lock_scope: LockScope::Objects,
            log_route: String::from("data-locker"),
        }
    }
}

impl LockerConfig {
    /// Builds a configuration from deployment configuration sections.
    ///
    /// `local` entries override `global` ones. Keys this crate does not know are ignored.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a known key holds an invalid value.
    pub fn from_conf(global: &HashMap<String, String>, local: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut merged = serde_json::Map::new();
        for (key, value) in global.iter().chain(local) {
            merged.insert(key.clone(), serde_json::Value::String(value.clone()));
        }
        Ok(serde_json::from_value(serde_json::Value::Object(merged))?)
    }
}

/// Static configuration provider.
#[derive(Debug)]
pub struct StaticConfigProvider {
    inner: Arc<LockerConfig>,
}

impl StaticConfigProvider {
    #[must_use]
    pub fn new(config: Arc<LockerConfig>) -> Self {
        Self { inner: config }
    }
}

impl Default for StaticConfigProvider {
    fn default() -> Self {
        Self::new(Arc::new(LockerConfig::default()))
    }
}

impl LockerConfigProvider for StaticConfigProvider {
    fn snapshot(&self) -> Arc<LockerConfig> {
        Arc::clone(&self.inner)
    }
}

/// Hot-reload configuration provider.
///
/// Reads are lock-free and updates replace the whole configuration atomically.
#[derive(Debug)]
pub struct HotReloadConfigProvider {
    inner: ArcSwap<LockerConfig>,
}

impl HotReloadConfigProvider {
    #[must_use]
    pub fn new(config: Arc<LockerConfig>) -> Self {
        Self {
            inner: ArcSwap::from(config),
        }
    }

    pub fn update(&self, config: Arc<LockerConfig>) {
        self.inner.store(config);
    }
}

impl Default for HotReloadConfigProvider {
    fn default() -> Self {
        Self::new(Arc::new(LockerConfig::default()))
    }
}

impl LockerConfigProvider for HotReloadConfigProvider {
    fn snapshot(&self) -> Arc<LockerConfig> {
        self.inner.load_full()
    }
}
