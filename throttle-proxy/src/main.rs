#![forbid(unsafe_code)]

mod cli;

use clap::Parser;
use std::sync::Arc;
use throttle_proxy_lib::config::LoggingConfig;
use throttle_proxy_lib::proxy::{run, shutdown_signal};
use throttle_proxy_lib::telemetry::{init_metrics, init_tracing, start_observability_server};
use throttle_proxy_lib::{ReverseProxy, TracingObserver};
use tracing::{error, info};

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            let _ = init_tracing(&LoggingConfig::default());
            error!(%err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&config.logging) {
        eprintln!("failed to initialise logging: {err}");
        std::process::exit(1);
    }

    info!(
        listen = %config.listen,
        refill_rate = config.rate_limit.refill_rate,
        burst = config.rate_limit.burst,
        tls = config.tls.is_some(),
        "configuration loaded"
    );

    let observer = match config.telemetry.metrics_port {
        Some(port) => {
            let (metrics, registry) = match init_metrics() {
                Ok(v) => v,
                Err(err) => {
                    error!(%err, "failed to initialise metrics");
                    std::process::exit(1);
                }
            };
            let shutdown = match shutdown_signal() {
                Ok(s) => s,
                Err(err) => {
                    error!(%err, "failed to install signal handlers");
                    std::process::exit(1);
                }
            };
            tokio::spawn(async move {
                if let Err(err) = start_observability_server(port, registry, shutdown).await {
                    error!(%err, "observability server exited with error");
                }
            });
            TracingObserver::with_metrics(metrics)
        }
        None => TracingObserver::new(),
    };

    let proxy = match ReverseProxy::new(&config, Arc::new(observer)) {
        Ok(p) => Arc::new(p),
        Err(err) => {
            error!(%err, "failed to create proxy");
            std::process::exit(1);
        }
    };

    info!(upstream = %proxy.upstream(), "Reverse Proxy running");
    if let Err(err) = run(&config, proxy).await {
        error!(%err, "proxy exited with error");
        std::process::exit(1);
    }
}
