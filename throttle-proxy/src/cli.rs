use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use throttle_proxy_lib::config::{validate, LogFormat, TlsConfig};
use throttle_proxy_lib::{load_from_path, Config, ProxyError, Result};

/// Listener protocol
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Http,
    Https,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Reverse proxy with per-client rate limiting")]
pub struct Cli {
    /// Path to configuration TOML file. Flags below override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The mode to run the proxy server in
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// The host to be proxied
    #[arg(long, required_unless_present = "config")]
    pub rhost: Option<String>,

    /// The port of the host to be proxied [default: 80]
    #[arg(long)]
    pub rport: Option<u16>,

    /// The port the proxy will listen on [default: 8080]
    #[arg(long)]
    pub lport: Option<u16>,

    /// Append JSON log lines to this file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub logging: Option<PathBuf>,

    /// Path to TLS certificate file (PEM)
    #[arg(long, value_name = "FILE")]
    pub cert: Option<String>,

    /// Path to TLS private key file (PEM)
    #[arg(long, value_name = "FILE")]
    pub key: Option<String>,

    /// Tokens per second refilled into each client's bucket
    #[arg(long)]
    pub rate: Option<f64>,

    /// Maximum burst per client
    #[arg(long)]
    pub burst: Option<u32>,

    /// Upper bound on tracked clients (least recently seen are evicted)
    #[arg(long)]
    pub max_clients: Option<usize>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormatArg>,

    /// Serve /metrics and /health on this port
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

impl Cli {
    /// Resolve the effective configuration: file (or defaults) first, then
    /// flag overrides, then validation.
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => load_from_path(path)?,
            None => {
                let host = self.rhost.clone().ok_or_else(|| {
                    ProxyError::Config("missing required argument --rhost".to_string())
                })?;
                Config::for_upstream(host, 80)
            }
        };

        self.apply_overrides(&mut config)?;
        validate(&config)?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(host) = &self.rhost {
            config.upstream.host = host.clone();
        }
        if let Some(port) = self.rport {
            config.upstream.port = port;
        }
        if let Some(port) = self.lport {
            config.listen.set_port(port);
        }

        if let Some(rate) = self.rate {
            config.rate_limit.refill_rate = rate;
        }
        if let Some(burst) = self.burst {
            config.rate_limit.burst = burst;
        }
        if let Some(max) = self.max_clients {
            config.rate_limit.max_clients = Some(max);
        }

        // A log file means JSON unless a format is given explicitly
        if let Some(file) = &self.logging {
            config.logging.file = Some(file.clone());
            config.logging.format = LogFormat::Json;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format.into();
        }
        if let Some(port) = self.metrics_port {
            config.telemetry.metrics_port = Some(port);
        }

        match (&self.cert, &self.key) {
            (Some(cert), Some(key)) => {
                let mut tls = TlsConfig::new(cert.clone(), key.clone());
                if let Some(existing) = config.tls.take() {
                    tls.alpn = existing.alpn;
                }
                config.tls = Some(tls);
            }
            (None, None) => {}
            _ => {
                return Err(ProxyError::Config("--cert and --key must be given together".to_string()))
            }
        }

        match self.mode {
            Some(Mode::Http) => config.tls = None,
            Some(Mode::Https) if config.tls.is_none() => {
                return Err(ProxyError::Config("https mode requires --cert and --key".to_string()))
            }
            _ => {}
        }

        Ok(())
    }
}
