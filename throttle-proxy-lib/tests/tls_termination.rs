mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{seen, spawn_backend, RecordingObserver, TestResult};
use http::StatusCode;
use tempfile::NamedTempFile;
use throttle_proxy_lib::proxy::serve;
use throttle_proxy_lib::{build_tls_acceptor, Config, ReverseProxy, TlsConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

fn write_self_signed() -> TestResult<(NamedTempFile, NamedTempFile)> {
    let rcgen::CertifiedKey { cert, signing_key } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;
    let cert_file = NamedTempFile::new()?;
    let key_file = NamedTempFile::new()?;
    std::fs::write(cert_file.path(), cert.pem())?;
    std::fs::write(key_file.path(), signing_key.serialize_pem())?;
    Ok((cert_file, key_file))
}

#[tokio::test]
async fn terminates_tls_and_forwards_plain_http() -> TestResult<()> {
    let (_backend, backend_addr) = spawn_backend("over tls").await?;
    let (cert, key) = write_self_signed()?;

    let mut cfg = Config::for_upstream(backend_addr.ip().to_string(), backend_addr.port());
    cfg.tls = Some(TlsConfig::new(
        cert.path().display().to_string(),
        key.path().display().to_string(),
    ));
    let tls_cfg = cfg.tls.as_ref().ok_or("tls missing")?;
    let acceptor = build_tls_acceptor(tls_cfg)?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let observer = RecordingObserver::new();
    let proxy = Arc::new(ReverseProxy::new(&cfg, observer.clone())?);
    let (tx, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(serve(
        listener,
        proxy,
        Some(acceptor),
        async move {
            let _ = rx.await;
        },
        Duration::from_secs(2),
    ));

    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .resolve("localhost", addr)
        .timeout(Duration::from_secs(10))
        .build()?;

    let resp = client.get(format!("https://localhost:{}/secure", addr.port())).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    // ALPN offers h2 first
    assert_eq!(resp.version(), http::Version::HTTP_2);
    assert_eq!(resp.headers()[seen::PATH], "/secure");
    assert_eq!(resp.text().await?, "over tls");

    assert_eq!(observer.requests(), 1);
    assert!(observer.errors().is_empty());

    let _ = tx.send(());
    tokio::time::timeout(Duration::from_secs(5), task).await???;
    Ok(())
}

#[tokio::test]
async fn plain_http_client_is_refused_on_tls_listener() -> TestResult<()> {
    let (_backend, backend_addr) = spawn_backend("OK").await?;
    let (cert, key) = write_self_signed()?;
    let tls = TlsConfig::new(cert.path().display().to_string(), key.path().display().to_string());

    let cfg = Config::for_upstream(backend_addr.ip().to_string(), backend_addr.port());
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let observer = RecordingObserver::new();
    let proxy = Arc::new(ReverseProxy::new(&cfg, observer.clone())?);
    let (tx, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(serve(
        listener,
        proxy,
        Some(build_tls_acceptor(&tls)?),
        async move {
            let _ = rx.await;
        },
        Duration::from_secs(2),
    ));

    let result = helpers::client().get(format!("http://{addr}/")).send().await;
    assert!(result.is_err(), "plaintext request must fail the TLS handshake");
    assert_eq!(observer.requests(), 0);

    let _ = tx.send(());
    tokio::time::timeout(Duration::from_secs(5), task).await???;
    Ok(())
}
