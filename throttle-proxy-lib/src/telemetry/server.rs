use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::Result;
use crate::proxy::{full_body, ProxyBody};
use crate::telemetry::{handle_metrics, health_check_response};

/// Bind `0.0.0.0:port` and serve observability endpoints until `shutdown`
/// resolves:
/// - `/metrics` - Prometheus metrics
/// - `/health` - Health check endpoint
pub async fn start_observability_server<F>(port: u16, registry: Registry, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    serve_observability(listener, registry, shutdown).await
}

/// Serve observability endpoints on an already bound listener
pub async fn serve_observability<F>(listener: TcpListener, registry: Registry, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let registry = Arc::new(registry);
    let addr = listener.local_addr()?;
    info!(?addr, "Observability server started (metrics + health checks)");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Observability server: shutting down");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "Observability server: accept error");
                        continue;
                    }
                };

                let registry = registry.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let registry = registry.clone();
                        async move { Ok::<_, Infallible>(route(req.uri().path(), &registry)) }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "Observability server: serve_connection error");
                    }
                });
            }
        }
    }

    info!("Observability server stopped");
    Ok(())
}

fn route(path: &str, registry: &Registry) -> Response<ProxyBody> {
    let result = match path {
        "/health" => health_check_response(),
        "/metrics" => handle_metrics(registry),
        _ => return plain(StatusCode::NOT_FOUND, "Not Found"),
    };

    result.unwrap_or_else(|e| {
        warn!(error = %e, path, "Observability server: handler failed");
        plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    })
}

fn plain(status: StatusCode, body: &'static str) -> Response<ProxyBody> {
    let mut resp = Response::new(full_body(body));
    *resp.status_mut() = status;
    resp
}
