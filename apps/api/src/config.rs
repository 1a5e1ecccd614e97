use std::path::PathBuf;

use anyhow::{ensure, Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails with context if a required variable is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub apify_token: String,
    pub port: u16,
    pub rust_log: String,
    /// Maximum job postings requested per dispatch (the "entries cap").
    pub jobs_entries_cap: usize,
    /// Maximum sessions held in memory before LRU eviction kicks in.
    pub max_sessions: usize,
    /// Directory for per-session history files. Unset = in-memory only.
    pub sessions_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            apify_token: require_env("APIFY_TOKEN")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            jobs_entries_cap: positive_env("JOBS_ENTRIES_CAP", 10)?,
            max_sessions: positive_env("MAX_SESSIONS", 1024)?,
            sessions_dir: std::env::var("SESSIONS_DIR").ok().map(PathBuf::from),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn positive_env(key: &str, default: usize) -> Result<usize> {
    match std::env::var(key) {
        Ok(raw) => parse_positive(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize> {
    let value = raw
        .parse::<usize>()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))?;
    ensure!(value > 0, "{key} must be at least 1");
    Ok(value)
}
