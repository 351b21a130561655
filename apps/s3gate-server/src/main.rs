//! s3gate server - read-only reverse proxy for S3-compatible object storage.
//!
//! Accepts unauthenticated GET and HEAD requests, re-signs them with the
//! configured backend key, and relays the backend's answer. The backend
//! credentials never reach the client.
//!
//! # Usage
//!
//! ```text
//! BUCKET_NAME='$path' B2_ENDPOINT=s3.us-west-002.backblazeb2.com \
//! B2_APPLICATION_KEY_ID=... B2_APPLICATION_KEY=... s3gate-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BUCKET_NAME` | *(required)* | `$path`, `$host`, or a fixed bucket name |
//! | `B2_ENDPOINT` / `S3_ENDPOINT` | *(required)* | Backend endpoint hostname |
//! | `B2_APPLICATION_KEY_ID` / `AWS_ACCESS_KEY_ID` | *(required)* | Access key id |
//! | `B2_APPLICATION_KEY` / `AWS_SECRET_ACCESS_KEY` | *(required)* | Secret key |
//! | `AWS_SESSION_TOKEN` | *(unset)* | Session token for temporary credentials |
//! | `S3_REGION` / `AWS_REGION` | derived | Signing region |
//! | `ALLOWED_HEADERS` | *(unset)* | Comma-separated header allow-list |
//! | `ALLOW_LIST_BUCKET` | `false` | Forward bucket listings when `true` |
//! | `RCLONE_DOWNLOAD` | `false` | Strip the rclone `file/` prefix when `true` |
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use s3gate_auth::{SigV4Signer, StaticCredentialProvider};
use s3gate_core::ProxyConfig;
use s3gate_http::{HttpBackend, ProxyService};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the signer from the configured key pair.
fn build_signer(config: &ProxyConfig) -> SigV4Signer {
    let mut provider =
        StaticCredentialProvider::new(&config.access_key_id, &config.secret_access_key);
    if let Some(token) = &config.session_token {
        provider = provider.with_session_token(token);
    }
    SigV4Signer::new(Arc::new(provider), config.signing_region())
}

/// Wire configuration, signer, and backend client into the proxy service.
fn build_service(config: ProxyConfig) -> Result<ProxyService<HttpBackend>> {
    let signer = build_signer(&config);
    let backend = HttpBackend::new().context("failed to build backend HTTP client")?;
    Ok(ProxyService::new(
        Arc::new(config),
        Arc::new(signer),
        Arc::new(backend),
    ))
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: ProxyService<HttpBackend>) -> Result<()> {
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
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
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
    let config = ProxyConfig::from_env().context("failed to load configuration")?;

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        bucket = %config.bucket,
        endpoint = %config.endpoint,
        region = %config.signing_region(),
        allow_list_bucket = config.allow_list_bucket,
        rclone_download = config.rclone_download,
        version = VERSION,
        "starting s3gate server",
    );

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let service = build_service(config)?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
