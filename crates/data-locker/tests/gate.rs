//! End-to-end behaviour of the data locker middleware

use data_locker::config::{LockScope, LockerConfig, StaticConfigProvider};
use data_locker::info::CapabilityRegistry;
use data_locker::metadata::Scope;
use data_locker::{
    DataLockerBuilder, DataLockerLayer, LockerContext, META_DATA_LOCKER, MetadataError, MetadataProvider, ScopeInfo,
    StaticMetadata, Verdict, filter_factory,
};

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arc_swap::ArcSwap;
use http::{Method, Request, Response, StatusCode};
use tower::{Layer, ServiceExt};

const BACKEND_BODY: &str = "Fake Test App";

/// Metadata which can be changed between requests, counting every lookup.
#[derive(Default)]
struct Shared {
    metadata: ArcSwap<StaticMetadata>,
    lookups: AtomicUsize,
}

impl Shared {
    fn lock_account(&self, spec: &str) {
        let mut metadata = StaticMetadata::clone(&self.metadata.load());
        metadata.set_account_meta("a", META_DATA_LOCKER, spec);
        self.metadata.store(Arc::new(metadata));
    }

    fn lock_container(&self, spec: &str) {
        let mut metadata = StaticMetadata::clone(&self.metadata.load());
        metadata.set_container_meta("a", "c", META_DATA_LOCKER, spec);
        self.metadata.store(Arc::new(metadata));
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for Shared {
    async fn account_info(&self, cx: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.metadata.load_full().account_info(cx).await
    }

    async fn container_info(&self, cx: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.metadata.load_full().container_info(cx).await
    }
}

struct Unreachable;

#[async_trait::async_trait]
impl MetadataProvider for Unreachable {
    async fn account_info(&self, _: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError> {
        let source = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "account server down");
        Err(MetadataError::unavailable(Scope::Account, source))
    }

    async fn container_info(&self, _: &LockerContext<'_>) -> Result<ScopeInfo, MetadataError> {
        Ok(ScopeInfo::default())
    }
}

fn layer_with_scope(provider: impl MetadataProvider, lock_scope: LockScope) -> DataLockerLayer {
    let mut config = LockerConfig::default();
    config.lock_scope = lock_scope;

    let mut builder = DataLockerBuilder::new(provider);
    builder.set_config(Arc::new(StaticConfigProvider::new(Arc::new(config))));
    builder.build()
}

async fn send(layer: &DataLockerLayer, method: Method, uri: &str) -> Response<String> {
    let backend = tower::service_fn(|_: Request<()>| async { Ok::<_, Infallible>(Response::new(BACKEND_BODY.to_owned())) });
    let req = Request::builder().method(method).uri(uri).body(()).unwrap();
    layer.layer(backend).oneshot(req).await.unwrap()
}

async fn status(layer: &DataLockerLayer, method: Method, uri: &str) -> StatusCode {
    send(layer, method, uri).await.status()
}

fn setup() -> (Arc<Shared>, DataLockerLayer) {
    let shared = Arc::new(Shared::default());
    let layer = DataLockerLayer::new(Arc::clone(&shared));
    (shared, layer)
}

#[tokio::test]
async fn get_request() {
    let (shared, layer) = setup();
    shared.lock_account("create,delete");
    shared.lock_container("create,delete");

    let res = send(&layer, Method::GET, "/v1/a/c/o").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body(), BACKEND_BODY);
    assert_eq!(shared.lookups(), 0);
}

#[tokio::test]
async fn read_methods_skip_metadata() {
    let (shared, layer) = setup();
    shared.lock_account("create,delete");

    for method in [Method::HEAD, Method::OPTIONS, Method::from_bytes(b"COPY").unwrap()] {
        assert_eq!(status(&layer, method, "/v1/a/c/o").await, StatusCode::OK);
    }
    assert_eq!(shared.lookups(), 0);
}

#[tokio::test]
async fn unlocked_delete_request() {
    let (shared, layer) = setup();
    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c/o").await, StatusCode::OK);
    assert_eq!(shared.lookups(), 2);
}

#[tokio::test]
async fn delete_with_container_locked() {
    let (shared, layer) = setup();
    shared.lock_container("delete");

    let res = send(&layer, Method::DELETE, "/v1/a/c/o").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.body(), "");

    assert_eq!(status(&layer, Method::PUT, "/v1/a/c/o").await, StatusCode::OK);
    assert_eq!(status(&layer, Method::POST, "/v1/a/c/o").await, StatusCode::OK);
}

#[tokio::test]
async fn delete_with_account_locked() {
    let (shared, layer) = setup();
    shared.lock_account("delete");

    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c/o").await, StatusCode::FORBIDDEN);
    assert_eq!(status(&layer, Method::PUT, "/v1/a/c/o").await, StatusCode::OK);
}

#[tokio::test]
async fn create_with_account_locked() {
    let (shared, layer) = setup();
    shared.lock_account("create");

    assert_eq!(status(&layer, Method::PUT, "/v1/a/c/o").await, StatusCode::FORBIDDEN);
    assert_eq!(status(&layer, Method::POST, "/v1/a/c/o").await, StatusCode::FORBIDDEN);
    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c/o").await, StatusCode::OK);
}

#[tokio::test]
async fn create_with_container_locked() {
    let (shared, layer) = setup();
    shared.lock_container("create");

    assert_eq!(status(&layer, Method::PUT, "/v1/a/c/o").await, StatusCode::FORBIDDEN);
    assert_eq!(status(&layer, Method::POST, "/v1/a/c/o").await, StatusCode::FORBIDDEN);
    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c/o").await, StatusCode::OK);
}

#[tokio::test]
async fn create_and_delete_with_whitespace() {
    let (shared, layer) = setup();
    shared.lock_account("create, delete");

    for method in [Method::PUT, Method::POST, Method::DELETE] {
        assert_eq!(status(&layer, method, "/v1/a/c/o").await, StatusCode::FORBIDDEN);
    }
    assert_eq!(status(&layer, Method::GET, "/v1/a/c/o").await, StatusCode::OK);
}

#[tokio::test]
async fn lowercase_request_method() {
    let (shared, layer) = setup();
    shared.lock_container("delete");

    let method = Method::from_bytes(b"delete").unwrap();
    assert_eq!(status(&layer, method, "/v1/a/c/o").await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_directives_are_ignored() {
    let (shared, layer) = setup();
    shared.lock_account("frobnicate,  ");
    shared.lock_container("Delete ,everything");

    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c/o").await, StatusCode::FORBIDDEN);
    assert_eq!(status(&layer, Method::PUT, "/v1/a/c/o").await, StatusCode::OK);
}

#[tokio::test]
async fn unlock_takes_effect_on_next_request() {
    let (shared, layer) = setup();

    shared.lock_container("delete");
    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c/o").await, StatusCode::FORBIDDEN);
    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c/o").await, StatusCode::FORBIDDEN);

    shared.lock_container("");
    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c/o").await, StatusCode::OK);
}

#[tokio::test]
async fn scope_requests_pass_by_default() {
    let (shared, layer) = setup();
    shared.lock_account("create,delete");
    shared.lock_container("create,delete");

    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c").await, StatusCode::OK);
    assert_eq!(status(&layer, Method::PUT, "/v1/a/c").await, StatusCode::OK);
    assert_eq!(status(&layer, Method::POST, "/v1/a").await, StatusCode::OK);
    assert_eq!(status(&layer, Method::PUT, "/not-a-resource").await, StatusCode::OK);
    assert_eq!(shared.lookups(), 0);
}

#[tokio::test]
async fn scope_requests_checked_with_lock_scope_all() {
    let shared = Arc::new(Shared::default());
    let layer = layer_with_scope(Arc::clone(&shared), LockScope::All);
    shared.lock_account("delete");

    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c").await, StatusCode::FORBIDDEN);
    assert_eq!(status(&layer, Method::DELETE, "/v1/a").await, StatusCode::FORBIDDEN);
    assert_eq!(status(&layer, Method::PUT, "/v1/a/c").await, StatusCode::OK);

    // Unparseable paths have no metadata, so nothing is locked
    assert_eq!(status(&layer, Method::DELETE, "/info").await, StatusCode::OK);
}

#[tokio::test]
async fn metadata_failure_propagates() {
    let layer = DataLockerLayer::new(Unreachable);
    let backend = tower::service_fn(|_: Request<()>| async { Ok::<_, Infallible>(Response::new(String::new())) });
    let req = Request::delete("/v1/a/c/o").body(()).unwrap();

    let err = layer.layer(backend).oneshot(req).await.unwrap_err();
    let err = err.downcast_ref::<MetadataError>().unwrap();
    assert_eq!(err.scope(), Scope::Account);

    // Requests that need no metadata are unaffected
    assert_eq!(status(&layer, Method::GET, "/v1/a/c/o").await, StatusCode::OK);
}

#[tokio::test]
async fn backend_errors_pass_through() {
    let layer = DataLockerLayer::new(StaticMetadata::new());
    let backend = tower::service_fn(|_: Request<()>| async {
        Err::<Response<String>, _>(std::io::Error::other("backend exploded"))
    });
    let req = Request::put("/v1/a/c/o").body(()).unwrap();

    let err = layer.layer(backend).oneshot(req).await.unwrap_err();
    assert_eq!(err.to_string(), "backend exploded");
}

#[tokio::test]
async fn check_is_idempotent() {
    let (shared, layer) = setup();
    shared.lock_account("delete");
    shared.lock_container("create");

    let (parts, ()) = Request::post("/v1/a/c/o").body(()).unwrap().into_parts();
    let first = layer.check(&parts).await.unwrap();
    let second = layer.check(&parts).await.unwrap();
    assert_eq!(first, Verdict::Forbid);
    assert_eq!(first, second);
}

#[tokio::test]
async fn factory_registers_feature() {
    let mut registry = CapabilityRegistry::new();
    let global = HashMap::from([("log_route".to_owned(), "proxy-server".to_owned())]);
    let local = HashMap::from([("use".to_owned(), "egg:data_locker#data_locker".to_owned())]);

    let mut metadata = StaticMetadata::new();
    metadata.set_container_meta("a", "c", META_DATA_LOCKER, "delete");
    let layer = filter_factory(&global, &local, metadata, &mut registry).unwrap();

    assert!(registry.is_registered(data_locker::FEATURE_NAME));
    assert_eq!(registry.to_json(), serde_json::json!({ "data_locker": { "lock_scope": "objects" } }));
    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c/o").await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn encoded_container_name_is_locked() {
    let mut metadata = StaticMetadata::new();
    metadata.set_container_meta("a", "my photos", META_DATA_LOCKER, "delete");
    let layer = DataLockerLayer::new(metadata);

    assert_eq!(status(&layer, Method::DELETE, "/v1/a/my%20photos/o").await, StatusCode::FORBIDDEN);
    assert_eq!(status(&layer, Method::PUT, "/v1/a/my%20photos/o").await, StatusCode::OK);
}

#[tokio::test]
async fn encoded_slash_separates_object() {
    let (shared, layer) = setup();
    shared.lock_container("delete");

    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c%2Fo").await, StatusCode::FORBIDDEN);
    assert_eq!(status(&layer, Method::DELETE, "/v1/a%2Fc%2Fdir%2Fo").await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_encoding_is_not_an_object() {
    let (shared, layer) = setup();
    shared.lock_container("delete");

    assert_eq!(status(&layer, Method::DELETE, "/v1/a/c/%FF").await, StatusCode::OK);
    assert_eq!(shared.lookups(), 0);
}
