use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{ProxyError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| ProxyError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: Config = toml::from_str(&txt)
        .map_err(|e| ProxyError::Config(format!("Failed to parse config: {e}")))?;

    validate(&cfg)?;

    Ok(cfg)
}

/// Check invariants that serde cannot express
pub fn validate(cfg: &Config) -> Result<()> {
    if cfg.upstream.host.trim().is_empty() {
        return Err(ProxyError::Config("upstream host cannot be empty".to_string()));
    }
    if cfg.upstream.port == 0 {
        return Err(ProxyError::Config("upstream port must be > 0".to_string()));
    }
    if cfg.upstream.scheme != "http" {
        return Err(ProxyError::Config(format!(
            "unsupported upstream scheme: {}",
            cfg.upstream.scheme
        )));
    }

    let rl = &cfg.rate_limit;
    if !rl.refill_rate.is_finite() || rl.refill_rate <= 0.0 {
        return Err(ProxyError::Config(format!(
            "rate_limit.refill_rate must be a positive number, got {}",
            rl.refill_rate
        )));
    }
    if rl.burst == 0 {
        return Err(ProxyError::Config("rate_limit.burst must be >= 1".to_string()));
    }
    if rl.max_clients == Some(0) {
        return Err(ProxyError::Config("rate_limit.max_clients must be >= 1".to_string()));
    }

    if let Some(tls) = &cfg.tls {
        if !Path::new(&tls.cert_path).exists() {
            return Err(ProxyError::Config(format!(
                "Certificate file not found: {}",
                tls.cert_path
            )));
        }
        if !Path::new(&tls.key_path).exists() {
            return Err(ProxyError::Config(format!("Key file not found: {}", tls.key_path)));
        }
    }

    Ok(())
}
