use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::proxy::reverse_proxy::ReverseProxy;
use crate::tls::build_tls_acceptor;

/// Guard to decrement active connections counter when dropped
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Bind `config.listen` and serve until SIGTERM or SIGINT.
///
/// TLS is terminated locally when `config.tls` is set.
pub async fn run(config: &Config, proxy: Arc<ReverseProxy>) -> Result<()> {
    let tls_acceptor = config.tls.as_ref().map(build_tls_acceptor).transpose()?;
    let listener = TcpListener::bind(config.listen).await.map_err(ProxyError::Io)?;
    let shutdown = shutdown_signal()?;

    serve(
        listener,
        proxy,
        tls_acceptor,
        shutdown,
        Duration::from_secs(config.timeout.shutdown_secs),
    )
    .await
}

/// Resolves on the first SIGTERM or SIGINT
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
        ProxyError::Io(std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))
    })?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(|e| {
        ProxyError::Io(std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))
    })?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        }
    })
}

/// Accept connections on `listener` until `shutdown` resolves, then drain.
///
/// In-flight connections are asked to finish gracefully and get up to
/// `shutdown_timeout` to do so.
pub async fn serve<F>(
    listener: TcpListener,
    proxy: Arc<ReverseProxy>,
    tls_acceptor: Option<TlsAcceptor>,
    shutdown: F,
    shutdown_timeout: Duration,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let addr = listener.local_addr().map_err(ProxyError::Io)?;
    let builder = ConnBuilder::new(TokioExecutor::new());

    // Track active connections for graceful shutdown
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    info!(
        ?addr,
        tls = tls_acceptor.is_some(),
        upstream = %proxy.upstream(),
        "starting rate-limited reverse proxy"
    );

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };

                active_connections.fetch_add(1, Ordering::Relaxed);
                let guard = ConnectionGuard(active_connections.clone());
                let builder = builder.clone();
                let proxy = proxy.clone();
                let tls_acceptor = tls_acceptor.clone();
                let shutdown_rx = shutdown_rx.clone();

                tokio::spawn(async move {
                    // Ensure counter is decremented when connection finishes
                    let _guard = guard;
                    match tls_acceptor {
                        Some(acceptor) => match acceptor.accept(stream).await {
                            Ok(tls) => serve_io(builder, tls, proxy, peer, shutdown_rx).await,
                            Err(e) => warn!(?peer, error = %e, "TLS handshake failed"),
                        },
                        None => serve_io(builder, stream, proxy, peer, shutdown_rx).await,
                    }
                });
            }
        }
    }

    // Stop accepting before draining
    drop(listener);
    let _ = shutdown_tx.send(true);

    info!(
        "Waiting for active connections to finish (timeout: {}s)",
        shutdown_timeout.as_secs()
    );
    let start = std::time::Instant::now();

    loop {
        let active = active_connections.load(Ordering::Relaxed);
        if active == 0 {
            info!("All connections closed, shutdown complete");
            break;
        }

        if start.elapsed() >= shutdown_timeout {
            warn!(
                active_connections = active,
                "Shutdown timeout reached, {} connections still active", active
            );
            break;
        }

        debug!(active_connections = active, "Waiting for connections to close");
        sleep(Duration::from_millis(100)).await;
    }

    info!("Proxy server stopped");
    Ok(())
}

async fn serve_io<I>(
    builder: ConnBuilder<TokioExecutor>,
    io: I,
    proxy: Arc<ReverseProxy>,
    peer: SocketAddr,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
        let proxy = proxy.clone();
        async move { Ok::<_, Infallible>(proxy.handle(req.map(|b| b.boxed()), peer).await) }
    });

    let conn = builder.serve_connection(TokioIo::new(io), svc);
    tokio::pin!(conn);

    let result = tokio::select! {
        res = conn.as_mut() => res,
        _ = shutdown_rx.changed() => {
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };

    if let Err(e) = result {
        debug!(?peer, error = %e, "serve_connection error");
    }
}
