//! Data locker sandbox server
//!
//! Serves the data locker middleware in front of a stub backend which answers `200 OK` to
//! everything, so lock metadata can be tried out without a storage cluster.
//!
//! ```bash
//! cargo run --features binary -- --metadata metadata.json
//! curl -X DELETE http://localhost:8014/v1/AUTH_test/photos/cat.jpg
//! curl http://localhost:8014/info
//! ```

use data_locker::config::{LockScope, LockerConfig, StaticConfigProvider};
use data_locker::info::CapabilityRegistry;
use data_locker::{DataLockerBuilder, StaticMetadata, StdError};

use std::convert::Infallible;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::{Parser, ValueEnum};
use futures::future::BoxFuture;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tower::{Layer, ServiceExt};
use tracing::{debug, error, info};

#[derive(Debug, Parser)]
#[command(version)]
struct Opt {
    /// Host name to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to listen on.
    #[arg(long, default_value = "8014")]
    port: u16,

    /// JSON file with account and container metadata.
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Which requests are subject to locking.
    #[arg(long, value_enum, default_value_t = ScopeArg::Objects)]
    lock_scope: ScopeArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    Objects,
    All,
}

impl From<ScopeArg> for LockScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Objects => LockScope::Objects,
            ScopeArg::All => LockScope::All,
        }
    }
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

fn load_metadata(opt: &Opt) -> io::Result<StaticMetadata> {
    let Some(path) = &opt.metadata else { return Ok(StaticMetadata::new()) };
    let json = std::fs::read_to_string(path)?;
    StaticMetadata::from_json(&json).map_err(io::Error::other)
}

fn stub_backend(req: Request<Incoming>) -> Response<Full<Bytes>> {
    debug!(method = %req.method(), path = req.uri().path(), "backend called");
    Response::new(Full::new(Bytes::from_static(b"OK")))
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let opt = Opt::parse();
    setup_tracing();

    let metadata = load_metadata(&opt)?;

    let mut config = LockerConfig::default();
    config.lock_scope = opt.lock_scope.into();

    let mut registry = CapabilityRegistry::new();
    let layer = {
        let mut builder = DataLockerBuilder::new(metadata);
        builder.set_config(Arc::new(StaticConfigProvider::new(Arc::new(config))));
        builder.build()
    };
    layer.register(&mut registry);

    let info_body = Bytes::from(serde_json::to_vec(&registry.to_json()).map_err(io::Error::other)?);

    let backend = tower::service_fn(|req| async move { Ok::<_, Infallible>(stub_backend(req)) });
    let locker = layer.layer(backend);

    let service = tower::service_fn(move |req: Request<Incoming>| {
        let locker = locker.clone();
        let info_body = info_body.clone();
        async move {
            if req.method() == Method::GET && req.uri().path() == "/info" {
                let mut res = Response::new(Full::new(info_body));
                res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                return Ok::<_, StdError>(res);
            }
            locker.oneshot(req).await
        }
    });
    let service = TowerToHyperService::new(service);

    let addr = format!("{}:{}", opt.host, opt.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("server listening on http://{}", addr);
    info!("lock scope: {:?}", opt.lock_scope);

    let http_server = ConnBuilder::new(TokioExecutor::new());
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();

    let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());

    loop {
        let (stream, remote_addr) = tokio::select! {
            res = listener.accept() => {
                match res {
                    Ok(conn) => conn,
                    Err(err) => {
                        error!("error accepting connection: {err}");
                        continue;
                    }
                }
            }
            _ = ctrl_c.as_mut() => {
                info!("received Ctrl+C, shutting down...");
                break;
            }
        };

        debug!("accepted connection from {}", remote_addr);

        let conn = http_server.serve_connection(TokioIo::new(stream), service.clone());
        let conn: BoxFuture<'static, Result<(), StdError>> = Box::pin(graceful.watch(conn.into_owned()));
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!("error serving connection: {}", e);
            }
        });
    }

    tokio::select! {
        () = graceful.shutdown() => {
            info!("gracefully shut down");
        },
        () = tokio::time::sleep(std::time::Duration::from_secs(10)) => {
            info!("waited 10 seconds for graceful shutdown, aborting...");
        }
    }

    Ok(())
}
