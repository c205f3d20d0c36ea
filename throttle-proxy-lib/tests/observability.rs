mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{client, spawn_backend, start_proxy, TestResult};
use http::StatusCode;
use opentelemetry::metrics::MeterProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use throttle_proxy_lib::proxy::ProxyObserver;
use throttle_proxy_lib::telemetry::{serve_observability, Metrics};
use throttle_proxy_lib::{Config, TracingObserver};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Metrics wired to a private registry so tests do not touch the global provider
fn local_metrics() -> TestResult<(Arc<Metrics>, Registry, SdkMeterProvider)> {
    let registry = Registry::new();
    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .map_err(|e| format!("failed to build prometheus exporter: {e}"))?;
    let provider = SdkMeterProvider::builder().with_reader(exporter).build();
    let metrics = Arc::new(Metrics::new(provider.meter("throttle-proxy-test")));
    Ok((metrics, registry, provider))
}

#[tokio::test]
async fn health_metrics_and_not_found() -> TestResult<()> {
    let (_backend, backend_addr) = spawn_backend("OK").await?;
    let (metrics, registry, _provider) = local_metrics()?;

    let mut cfg = Config::for_upstream(backend_addr.ip().to_string(), backend_addr.port());
    cfg.rate_limit.burst = 2;
    cfg.rate_limit.refill_rate = 0.001;
    let observer: Arc<dyn ProxyObserver> = Arc::new(TracingObserver::with_metrics(metrics));
    let running = start_proxy(&cfg, observer).await?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let obs_addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel::<()>();
    let obs_task = tokio::spawn(serve_observability(listener, registry, async move {
        let _ = rx.await;
    }));

    let http = client();
    let mut statuses = Vec::new();
    for _ in 0..3 {
        statuses.push(http.get(running.url("/")).send().await?.status());
    }
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]);

    let health = http.get(format!("http://{obs_addr}/health")).send().await?;
    assert_eq!(health.status(), StatusCode::OK);
    let body: serde_json::Value = health.json().await?;
    assert_eq!(body["status"], "healthy");

    let metrics_resp = http.get(format!("http://{obs_addr}/metrics")).send().await?;
    assert_eq!(metrics_resp.status(), StatusCode::OK);
    let text = metrics_resp.text().await?;
    assert!(text.contains("throttle_requests_forwarded_total"), "{text}");
    assert!(text.contains("throttle_upstream_responses_total"), "{text}");
    assert!(text.contains("throttle_rate_limit_rejected_total"), "{text}");

    let missing = http.get(format!("http://{obs_addr}/nope")).send().await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let _ = tx.send(());
    tokio::time::timeout(Duration::from_secs(5), obs_task).await???;
    running.shutdown().await
}
