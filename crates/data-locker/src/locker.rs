//! Locker resolution
//!
//! This module turns account and container metadata into the set of methods blocked for
//! a request. Metadata comes from a [`MetadataProvider`], which the hosting proxy supplies.
//!
//! # Example
//!
//! ```
//! use data_locker::{LockerContext, MetadataError, MetadataProvider, ScopeInfo};
//! use data_locker::metadata::Scope;
//!
//! struct Backend;
//!
//! #[async_trait::async_trait]
//! impl MetadataProvider for Backend {
//!     async fn account_info(&self, cx: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError> {
//!         // Ask the account server about `cx.path()`
//! #       Err(MetadataError::malformed(Scope::Account, "not implemented"))
//!     }
//!
//!     async fn container_info(&self, cx: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError> {
//!         // Containerless paths have no container metadata
//!         Ok(ScopeInfo::default())
//!     }
//! }
//! ```

use crate::directive::{DirectiveSet, MethodSet, parse_directives};
use crate::error::MetadataError;
use crate::metadata::ScopeInfo;
use crate::path::ResourcePath;

use std::sync::Arc;

use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri};
use tracing::debug;

/// The metadata key holding the locker specification.
pub const META_DATA_LOCKER: &str = "data-locker";

/// Read-only view of the request handed to a [`MetadataProvider`].
///
/// The request body is never exposed.
#[derive(Debug)]
pub struct LockerContext<'a> {
    parts: &'a Parts,
    path: Option<&'a ResourcePath>,
}

impl<'a> LockerContext<'a> {
    #[must_use]
    pub fn new(parts: &'a Parts, path: Option<&'a ResourcePath>) -> Self {
        Self { parts, path }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Extensions set by earlier stages, e.g. an authentication layer.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// The parsed resource path, or `None` if the request path is not a resource path.
    #[must_use]
    pub fn path(&self) -> Option<&ResourcePath> {
        self.path
    }
}

/// Supplier of account and container metadata.
///
/// Both methods are called for every lockable request. Implementations should return
/// empty metadata, not an error, when the request has no container.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync + 'static {
    /// Returns the current attributes of the account the request targets.
    async fn account_info(&self, cx: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError>;

    /// Returns the current attributes of the container the request targets.
    async fn container_info(&self, cx: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError>;
}

#[async_trait::async_trait]
impl<P: MetadataProvider + ?Sized> MetadataProvider for Arc<P> {
    async fn account_info(&self, cx: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError> {
        (**self).account_info(cx).await
    }

    async fn container_info(&self, cx: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError> {
        (**self).container_info(cx).await
    }
}

/// Returns the directives set on a scope.
#[must_use]
pub fn scope_directives(info: &ScopeInfo) -> DirectiveSet {
    parse_directives(info.meta_value(META_DATA_LOCKER))
}

/// Resolves the methods blocked for a request.
///
/// Account metadata is fetched first, then container metadata. The result is the union of
/// the methods blocked by both scopes. Nothing is cached.
///
/// # Errors
/// Returns the first error reported by the provider.
pub async fn resolve_blocked_methods(
    provider: &dyn MetadataProvider,
    cx: &LockerContext<'_>,
) -> Result<MethodSet, MetadataError> {
    let account = scope_directives(&provider.account_info(cx).await?);
    let container = scope_directives(&provider.container_info(cx).await?);

    let blocked = account.union(container).blocked_methods();
    debug!(?account, ?container, ?blocked, "resolved lockers");
    Ok(blocked)
}
