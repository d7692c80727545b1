use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_JOBS_API_URL: &str = "http://localhost:3002";
const DEFAULT_AUTH_API_URL: &str = "http://localhost:3001";
const DEFAULT_ML_API_URL: &str = "http://localhost:3003";
const CREDENTIALS_FILE: &str = ".jobtrack/credentials.json";

/// Client configuration loaded from environment variables.
/// Every variable has a development default.
#[derive(Debug, Clone)]
pub struct Config {
    pub jobs_api_url: String,
    pub auth_api_url: String,
    pub ml_api_url: String,
    /// `None` when no home directory can be determined and
    /// `CREDENTIALS_PATH` is unset; credentials then live only in memory.
    pub credentials_path: Option<PathBuf>,
    pub request_timeout: Duration,
    pub refresh_timeout: Duration,
    pub poll_interval: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            jobs_api_url: api_root(&env_or("JOBS_API_URL", DEFAULT_JOBS_API_URL)),
            auth_api_url: api_root(&env_or("AUTH_API_URL", DEFAULT_AUTH_API_URL)),
            ml_api_url: api_root(&env_or("ML_API_URL", DEFAULT_ML_API_URL)),
            credentials_path: std::env::var_os("CREDENTIALS_PATH")
                .map(PathBuf::from)
                .or_else(|| dirs::home_dir().map(|home| home.join(CREDENTIALS_FILE))),
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 30)?),
            refresh_timeout: Duration::from_secs(parse_env("REFRESH_TIMEOUT_SECS", 15)?),
            poll_interval: Duration::from_millis(parse_env("POLL_INTERVAL_MS", 2000)?),
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Root of the auth service's `/auth` routes.
    pub fn auth_base_url(&self) -> String {
        format!("{}/auth", self.auth_api_url)
    }
}

/// Strips a trailing slash and appends the `/api/v1` prefix every service
/// mounts its routes under.
pub fn api_root(base_url: &str) -> String {
    format!("{}/api/v1", base_url.trim_end_matches('/'))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Reads a duration variable. Zero is rejected: every duration here is a
/// timeout or a polling period.
fn parse_env(key: &str, default: u64) -> Result<u64> {
    parse_positive(key, std::env::var(key).ok().as_deref(), default)
}

fn parse_positive(key: &str, value: Option<&str>, default: u64) -> Result<u64> {
    let Some(value) = value else {
        return Ok(default);
    };
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .with_context(|| format!("{key} must be a positive integer, got '{value}'"))
}
