//! Process configuration from environment variables.
//!
//! Supported env vars:
//! - `DATABASE_URL` (default `sqlite:data/price_history.db?mode=rwc`)
//! - `API_BIND_ADDRESS`, `API_PORT` (default `0.0.0.0:3000`)
//! - `CRON_SCHEDULE` (default `0 0 * * *`, daily at midnight)
//! - `CHECK_CONCURRENCY` (default 4)
//! - `LOG_DIR` (default `logs`)
//! - `BROWSER_NO_SANDBOX`, `CHROME_PATH` for the headless browser fallback

use std::path::PathBuf;

use price_extractor::RendererConfig;

use crate::api::server::ApiServerConfig;
use crate::scheduler::{Cadence, DEFAULT_CADENCE, SchedulerConfig};
use crate::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/price_history.db?mode=rwc";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_API_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub api: ApiServerConfig,
    pub scheduler: SchedulerConfig,
    pub log_dir: String,
    pub renderer: RendererConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let mut api = ApiServerConfig {
            port: DEFAULT_API_PORT,
            ..ApiServerConfig::default()
        };
        if let Some(bind_address) = get("API_BIND_ADDRESS") {
            api.bind_address = bind_address;
        }
        if let Some(port) = get("API_PORT") {
            api.port = port
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("API_PORT must be a port number, got '{}'", port)))?;
        }

        let cadence_expr = get("CRON_SCHEDULE").unwrap_or_else(|| DEFAULT_CADENCE.to_string());
        let mut scheduler = SchedulerConfig::new(Cadence::parse(&cadence_expr)?);
        if let Some(concurrency) = get("CHECK_CONCURRENCY") {
            let parsed: usize = concurrency.trim().parse().map_err(|_| {
                Error::config(format!(
                    "CHECK_CONCURRENCY must be a positive integer, got '{}'",
                    concurrency
                ))
            })?;
            scheduler = scheduler.with_check_concurrency(parsed);
        }

        let log_dir = get("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());

        let renderer = RendererConfig {
            no_sandbox: get("BROWSER_NO_SANDBOX")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            executable: get("CHROME_PATH").map(PathBuf::from),
        };

        Ok(Self {
            database_url,
            api,
            scheduler,
            log_dir,
            renderer,
        })
    }
}
