//! # config — read settings from environment variables
//!
//! `main` loads an optional `.env` through `dotenvy` first, so every value
//! below can live either in the real environment or in that file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::countdown::DEFAULT_TICK;

const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_STORAGE_PATH: &str = ".scheduler-admin/storage.json";

/// Everything the admin client needs to reach the schedule backend.
#[derive(Debug, Clone)]
pub struct Config {
    /// REST base URL, e.g. `https://api.example.com`
    pub api_url: String,
    /// Socket.IO server for `tradeScheduleUpdated` pushes
    pub push_url: String,
    /// Local key/value file that keeps the login token
    pub storage_path: PathBuf,
    /// Countdown refresh cadence
    pub tick: Duration,
    /// Per-request timeout; `None` leaves it to the transport
    pub request_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url = std::env::var("SCHEDULER_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if api_url.is_empty() {
            bail!("SCHEDULER_API_URL must not be empty");
        }

        let push_url = std::env::var("SCHEDULER_PUSH_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| api_url.clone());

        let tick_ms: u64 = match std::env::var("COUNTDOWN_TICK_MS") {
            Ok(raw) => raw.parse().context("COUNTDOWN_TICK_MS must be a number")?,
            Err(_) => DEFAULT_TICK.as_millis() as u64,
        };
        if tick_ms == 0 {
            bail!("COUNTDOWN_TICK_MS must be greater than zero");
        }

        let request_timeout = match std::env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(
                raw.parse().context("REQUEST_TIMEOUT_SECS must be a number")?,
            )),
            Err(_) => None,
        };

        Ok(Self {
            api_url,
            push_url,
            storage_path: std::env::var("SCHEDULER_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_PATH)),
            tick: Duration::from_millis(tick_ms),
            request_timeout,
        })
    }

    /// Builds the shared HTTP client (connection pooling, optional timeout).
    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().context("Failed to build HTTP client")
    }
}
