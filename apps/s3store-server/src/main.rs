//! S3Store server binary: wires the auth, storage, and dispatch crates
//! together behind a hyper HTTP/1 listener.
//!
//! # Environment Variables
//!
//! See [`s3store_core::S3StoreConfig::from_env`] for the full list
//! (`GATEWAY_LISTEN`, `STORAGE_ROOT`, `DEFAULT_REGION`, `LOG_LEVEL`, ...).
//! Additionally, `ACCESS_KEY`/`SECRET_KEY` (or `AWS_ACCESS_KEY_ID`/
//! `AWS_SECRET_ACCESS_KEY`) seed one demo account at startup.

mod account_store;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use s3store_auth::SigV4Engine;
use s3store_core::{AuthCaches, S3StoreConfig};
use s3store_http::Dispatcher;

use crate::account_store::InMemoryAccountStore;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level).with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn build_sigv4_engine(config: &S3StoreConfig) -> SigV4Engine {
    let mut engine = SigV4Engine::new(config.default_region.clone());
    engine.skew_tolerance_seconds = config.request_time_skew_seconds;
    engine.presigned_max_expires_seconds = config.presigned_max_expires_seconds;
    engine.unsorted_fallback_enabled = config.unsorted_query_fallback_enabled;
    engine
}

/// Seed the single demo account from `ACCESS_KEY`/`SECRET_KEY` (or their
/// `AWS_`-prefixed aliases), used by local test harnesses that expect a
/// known credential pair rather than a provisioning flow.
fn seed_demo_account(caches: &AuthCaches, account_store: &InMemoryAccountStore) {
    let Ok(access_key) = std::env::var("ACCESS_KEY").or_else(|_| std::env::var("AWS_ACCESS_KEY_ID")) else {
        return;
    };
    let Ok(secret_key) = std::env::var("SECRET_KEY").or_else(|_| std::env::var("AWS_SECRET_ACCESS_KEY")) else {
        return;
    };

    let user_id = "demo-user";
    account_store.add_account(&access_key, &secret_key, user_id);
    caches.load_account(&access_key, &secret_key, user_id, Vec::new());
    info!(access_key = %access_key, "seeded demo account from environment");
}

async fn handle_request<A: s3store_core::AccountStore>(
    dispatcher: Arc<Dispatcher<A>>,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(error = %err, "failed to read request body");
            Bytes::new()
        }
    };
    let buffered = Request::from_parts(parts, body);
    let response = dispatcher.handle(buffered).await;
    let (parts, body) = response.into_parts();
    Ok(Response::from_parts(parts, Full::new(body)))
}

async fn serve<A: s3store_core::AccountStore + 'static>(listener: TcpListener, dispatcher: Arc<Dispatcher<A>>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!(error = %err, "failed to accept connection");
                        continue;
                    }
                };

                let dispatcher = dispatcher.clone();
                let service = service_fn(move |req| handle_request(dispatcher.clone(), req));
                let conn = http.serve_connection(TokioIo::new(stream), service);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(err) = conn.await {
                        error!(%peer_addr, error = %err, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = S3StoreConfig::from_env();
    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        storage_root = %config.storage_root,
        default_region = %config.default_region,
        version = VERSION,
        "starting S3Store server",
    );

    let caches = Arc::new(AuthCaches::new());
    let account_store = Arc::new(InMemoryAccountStore::new());
    seed_demo_account(&caches, &account_store);

    let sigv4 = build_sigv4_engine(&config);
    let dispatcher = Arc::new(Dispatcher::new(config.clone(), caches, sigv4, account_store));

    let addr: SocketAddr = config.gateway_listen.parse().with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;
    let listener = TcpListener::bind(addr).await.with_context(|| format!("failed to bind to {addr}"))?;
    info!(%addr, "listening for connections");

    serve(listener, dispatcher).await
}
