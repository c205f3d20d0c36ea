use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{ProxyError, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `cfg.level`. With `cfg.file` set, records
/// are appended to that file instead of stdout.
pub fn init_tracing(cfg: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    let writer = match &cfg.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    ProxyError::Telemetry(format!(
                        "Failed to open log file {}: {e}",
                        path.display()
                    ))
                })?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };
    let ansi = cfg.file.is_none();

    let result = match cfg.format {
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(cfg.show_target)
                .with_ansi(ansi)
                .with_writer(writer);
            tracing::subscriber::set_global_default(Registry::default().with(env_filter).with(fmt_layer))
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(cfg.show_target)
                .with_writer(writer);
            tracing::subscriber::set_global_default(Registry::default().with(env_filter).with(fmt_layer))
        }
    };

    result.map_err(|e| ProxyError::Telemetry(format!("Failed to set global tracing subscriber: {e}")))
}
