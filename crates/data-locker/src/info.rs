//! Capability discovery
//!
//! Proxies expose the features a deployment runs on an info endpoint, so clients can find
//! out whether, for example, data locking is active. [`CapabilityRegistry`] collects those
//! announcements. It is an ordinary value owned by whatever assembles the request chain.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Features announced by the middlewares of a request chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CapabilityRegistry {
    features: IndexMap<String, Value>,
}

impl CapabilityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Announces a feature. Registering the same name again replaces its value.
    pub fn register(&mut self, name: &str, value: Value) {
        self.features.insert(name.to_owned(), value);
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.features.get(name)
    }

    /// Feature names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    /// Renders the body of the info endpoint.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.features.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}
