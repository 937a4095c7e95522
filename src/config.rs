use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tracing::{debug, error, info};

use crate::retry::RetryPolicy;

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub departments_url: String,
    pub search_url: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Read the configuration from environment variables.
    ///
    /// `DEPARTMENTS_JSON_URL` and `GOVDATA_API_URL` are required; the tuning
    /// knobs (`REQUEST_TIMEOUT_MS`, `RETRY_MAX_ATTEMPTS`,
    /// `RETRY_INITIAL_DELAY_MS`, `BIND_ADDR`) fall back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let departments_url = require_env("DEPARTMENTS_JSON_URL")?;
        let search_url = require_env("GOVDATA_API_URL")?;

        let request_timeout = Duration::from_millis(env_or("REQUEST_TIMEOUT_MS", 10_000u64)?);
        let retry = RetryPolicy {
            max_attempts: env_or("RETRY_MAX_ATTEMPTS", 3u32)?,
            initial_delay: Duration::from_millis(env_or("RETRY_INITIAL_DELAY_MS", 100u64)?),
        };

        let bind_addr = match std::env::var("BIND_ADDR") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("BIND_ADDR is not a valid socket address: {raw:?}"))?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        Ok(AppConfig {
            departments_url,
            search_url,
            request_timeout,
            retry,
            bind_addr,
        })
    }

    pub fn trace_loaded(&self) {
        info!(
            departments_url = %self.departments_url,
            search_url = %self.search_url,
            request_timeout_ms = self.request_timeout.as_millis() as u64,
            retry_max_attempts = self.retry.max_attempts,
            retry_initial_delay_ms = self.retry.initial_delay.as_millis() as u64,
            bind_addr = %self.bind_addr,
            "Loaded AppConfig"
        );
        debug!(?self, "AppConfig loaded (full debug)");
    }
}

fn require_env(name: &str) -> anyhow::Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => {
            error!(var = name, "Required environment variable is set but empty");
            Err(anyhow!("environment variable {name} is set but empty"))
        }
        Err(e) => {
            error!(var = name, error = ?e, "Required environment variable missing");
            Err(anyhow!("missing required environment variable {name}"))
        }
    }
}

fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{name} is not a valid number: {raw:?}")),
        Err(_) => Ok(default),
    }
}
