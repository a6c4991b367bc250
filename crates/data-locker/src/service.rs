//! Data Locker middleware
//!
//! [`DataLockerLayer`] wraps the next stage of a request chain in a [`DataLocker`] service.
//! The service forwards every request unchanged, except lockable requests whose method is
//! blocked by account or container metadata. Those are answered with `403 Forbidden` and
//! never reach the next stage.
//!
//! # Example
//!
//! ```
//! use data_locker::{DataLockerBuilder, StaticMetadata};
//! use data_locker::config::{LockScope, LockerConfig, StaticConfigProvider};
//! use std::sync::Arc;
//!
//! let mut config = LockerConfig::default();
//! config.lock_scope = LockScope::All;
//!
//! let mut builder = DataLockerBuilder::new(StaticMetadata::new());
//! builder.set_config(Arc::new(StaticConfigProvider::new(Arc::new(config))));
//! let layer = builder.build();
//!
//! let backend = tower::service_fn(|_req: http::Request<()>| async {
//!     Ok::<_, std::convert::Infallible>(http::Response::new(String::from("stored")))
//! });
//! let service = tower::ServiceBuilder::new().layer(layer).service(backend);
//! ```

use crate::config::{LockScope, LockerConfig, LockerConfigProvider, StaticConfigProvider};
use crate::directive::{LockedMethod, MethodSet};
use crate::error::{ConfigError, MetadataError, StdError};
use crate::info::CapabilityRegistry;
use crate::locker::{LockerContext, MetadataProvider, resolve_blocked_methods};
use crate::path::ResourcePath;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::request::Parts;
use http::{Method, Request, Response, StatusCode};
use tower::{Layer, Service};
use tracing::{Instrument, debug, info};

/// The outcome of checking a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Forward the request unchanged.
    Allow,
    /// Answer `403 Forbidden` without forwarding.
    Forbid,
}

/// Decides a request method against a blocked method set, ignoring ASCII case.
#[must_use]
pub fn verdict(method: &Method, blocked: MethodSet) -> Verdict {
    if blocked.contains_method(method) {
        Verdict::Forbid
    } else {
        Verdict::Allow
    }
}

/// Builder for [`DataLockerLayer`].
pub struct DataLockerBuilder {
    provider: Arc<dyn MetadataProvider>,
    config: Option<Arc<dyn LockerConfigProvider>>,
}

impl DataLockerBuilder {
    #[must_use]
    pub fn new(provider: impl MetadataProvider) -> Self {
        Self {
            provider: Arc::new(provider),
            config: None,
        }
    }

    /// Sets the configuration provider.
    ///
    /// If not set, defaults to [`StaticConfigProvider::default()`].
    pub fn set_config(&mut self, config: Arc<dyn LockerConfigProvider>) {
        self.config = Some(config);
    }

    #[must_use]
    pub fn build(self) -> DataLockerLayer {
        let config = self.config.unwrap_or_else(|| Arc::new(StaticConfigProvider::default()));
        info!(route = %config.snapshot().log_route, "data locker middleware started");
        DataLockerLayer {
            inner: Arc::new(Inner {
                provider: self.provider,
                config,
            }),
        }
    }
}

impl fmt::Debug for DataLockerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLockerBuilder").finish_non_exhaustive()
    }
}

/// A [`Layer`] producing [`DataLocker`] services.
///
/// `DataLockerLayer` is cheap to clone (uses `Arc` internally).
#[derive(Clone)]
pub struct DataLockerLayer {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn MetadataProvider>,
    config: Arc<dyn LockerConfigProvider>,
}

impl DataLockerLayer {
    /// Creates a layer with the default configuration.
    #[must_use]
    pub fn new(provider: impl MetadataProvider) -> Self {
        DataLockerBuilder::new(provider).build()
    }

    /// Announces the data locker feature and its current lock scope on the discovery endpoint.
    pub fn register(&self, registry: &mut CapabilityRegistry) {
        let config = self.inner.config.snapshot();
        registry.register(crate::FEATURE_NAME, serde_json::json!({ "lock_scope": config.lock_scope }));
    }

    /// Checks a request without forwarding it.
    ///
    /// # Errors
    /// Returns the metadata provider's error if the request needed metadata and the
    /// provider failed.
    pub async fn check(&self, parts: &Parts) -> Result<Verdict, MetadataError> {
        let config = self.inner.config.snapshot();
        self.inner.check(&config, parts).await
    }
}

impl Inner {
    async fn check(&self, config: &LockerConfig, parts: &Parts) -> Result<Verdict, MetadataError> {
        // GET, HEAD and the like can never be blocked
        if LockedMethod::from_method(&parts.method).is_none() {
            return Ok(Verdict::Allow);
        }

        let path = ResourcePath::parse_encoded(parts.uri.path()).ok();
        if config.lock_scope == LockScope::Objects && !path.as_ref().is_some_and(ResourcePath::is_object) {
            return Ok(Verdict::Allow);
        }

        let cx = LockerContext::new(parts, path.as_ref());
        let blocked = resolve_blocked_methods(&*self.provider, &cx).await?;
        Ok(verdict(&parts.method, blocked))
    }
}

impl<S> Layer<S> for DataLockerLayer {
    type Service = DataLocker<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DataLocker {
            inner,
            shared: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for DataLockerLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLockerLayer").finish_non_exhaustive()
    }
}

/// Builds the layer from deployment configuration sections and registers the feature.
///
/// `local` entries override `global` ones. Unknown keys are ignored.
///
/// # Errors
/// Returns [`ConfigError`] if a known key holds an invalid value.
pub fn filter_factory(
    global: &HashMap<String, String>,
    local: &HashMap<String, String>,
    provider: impl MetadataProvider,
    registry: &mut CapabilityRegistry,
) -> Result<DataLockerLayer, ConfigError> {
    let config = LockerConfig::from_conf(global, local)?;

    let mut builder = DataLockerBuilder::new(provider);
    builder.set_config(Arc::new(StaticConfigProvider::new(Arc::new(config))));
    let layer = builder.build();

    layer.register(registry);
    Ok(layer)
}

/// The data locker service, wrapping the next stage `S`.
#[derive(Clone)]
pub struct DataLocker<S> {
    inner: S,
    shared: Arc<Inner>,
}

impl<S> DataLocker<S> {
    #[must_use]
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: fmt::Debug> fmt::Debug for DataLocker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLocker").field("inner", &self.inner).finish_non_exhaustive()
    }
}

fn forbidden<B: Default>() -> Response<B> {
    let mut res = Response::new(B::default());
    *res.status_mut() = StatusCode::FORBIDDEN;
    res
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for DataLocker<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<StdError>,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;

    type Error = StdError;

    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // The instance that was driven to readiness is the one that must be called
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let shared = Arc::clone(&self.shared);
        let config = shared.config.snapshot();
        let span = tracing::debug_span!("data_locker", route = %config.log_route);

        let fut = async move {
            let (parts, body) = req.into_parts();
            match shared.check(&config, &parts).await? {
                Verdict::Allow => {
                    debug!(method = %parts.method, path = parts.uri.path(), "request allowed");
                    let req = Request::from_parts(parts, body);
                    inner.call(req).await.map_err(Into::into)
                }
                Verdict::Forbid => {
                    info!("{} {} blocked", parts.method, parts.uri.path());
                    Ok(forbidden())
                }
            }
        };
        Box::pin(fut.instrument(span))
    }
}
