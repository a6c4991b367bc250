//! Scope metadata
//!
//! [`ScopeInfo`] is what a [`MetadataProvider`] reports for an account or a container.
//! [`StaticMetadata`] is an in-memory provider, mostly useful for tests and local setups.

use crate::error::MetadataError;
use crate::locker::{LockerContext, MetadataProvider};

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The level a lock directive is set at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Account,
    Container,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Account => "account",
            Self::Container => "container",
        })
    }
}

/// Attributes of an account or a container.
///
/// Only the user metadata is of interest here. Other attributes a backend reports are
/// ignored when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeInfo {
    pub meta: Option<HashMap<String, String>>,
}

impl ScopeInfo {
    pub fn from_meta<K, V>(meta: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let meta = meta.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { meta: Some(meta) }
    }

    /// Returns the metadata value for `key`, or `""` if there is none.
    #[must_use]
    pub fn meta_value(&self, key: &str) -> &str {
        meta_value(self.meta.as_ref(), key)
    }
}

/// Looks up `key` in an optional metadata mapping.
///
/// A missing mapping and a missing key both read as the empty string.
#[must_use]
pub fn meta_value<'a>(meta: Option<&'a HashMap<String, String>>, key: &str) -> &'a str {
    meta.and_then(|m| m.get(key)).map_or("", String::as_str)
}

/// In-memory metadata, keyed by account and container name.
///
/// It can be loaded from JSON:
///
/// ```
/// use data_locker::StaticMetadata;
///
/// let json = r#"{
///     "accounts": { "AUTH_test": { "meta": { "data-locker": "create" } } },
///     "containers": { "AUTH_test": { "photos": { "meta": { "data-locker": "delete" } } } }
/// }"#;
/// let metadata = StaticMetadata::from_json(json).unwrap();
/// assert_eq!(metadata.account("AUTH_test").meta_value("data-locker"), "create");
/// assert_eq!(metadata.container("AUTH_test", "photos").meta_value("data-locker"), "delete");
/// assert_eq!(metadata.container("AUTH_test", "docs").meta_value("data-locker"), "");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticMetadata {
    accounts: IndexMap<String, ScopeInfo>,
    containers: IndexMap<String, IndexMap<String, ScopeInfo>>,
}

impl StaticMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes metadata from JSON.
    ///
    /// # Errors
    /// Returns an error if `json` is not valid JSON of the expected shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns the account attributes. Unknown accounts have no metadata.
    #[must_use]
    pub fn account(&self, account: &str) -> ScopeInfo {
        self.accounts.get(account).cloned().unwrap_or_default()
    }

    /// Returns the container attributes. Unknown containers have no metadata.
    #[must_use]
    pub fn container(&self, account: &str, container: &str) -> ScopeInfo {
        self.containers
            .get(account)
            .and_then(|containers| containers.get(container))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_account_meta(&mut self, account: &str, key: &str, value: &str) {
        let info = self.accounts.entry(account.to_owned()).or_default();
        insert_meta(info, key, value);
    }

    pub fn set_container_meta(&mut self, account: &str, container: &str, key: &str, value: &str) {
        let containers = self.containers.entry(account.to_owned()).or_default();
        let info = containers.entry(container.to_owned()).or_default();
        insert_meta(info, key, value);
    }
}

fn insert_meta(info: &mut ScopeInfo, key: &str, value: &str) {
    info.meta.get_or_insert_with(HashMap::new).insert(key.to_owned(), value.to_owned());
}

#[async_trait::async_trait]
impl MetadataProvider for StaticMetadata {
    async fn account_info(&self, cx: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError> {
        Ok(cx.path().map(|p| self.account(p.account())).unwrap_or_default())
    }

    async fn container_info(&self, cx: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError> {
        let info = cx
            .path()
            .and_then(|p| Some(self.container(p.account(), p.container()?)))
            .unwrap_or_default();
        Ok(info)
    }
}
