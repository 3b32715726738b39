use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Application configuration loaded from environment variables.
///
/// The API key is optional here: a missing key is reported on the first
/// analysis attempt rather than at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: Option<String>,
    pub host: String,
    pub port: u16,
    pub analysis_timeout: Duration,
    pub enable_web_search: bool,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so parsing can be tested
    /// without touching the process environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let timeout_secs = match lookup("ANALYSIS_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("ANALYSIS_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            bail!("ANALYSIS_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Config {
            anthropic_api_key: lookup("ANTHROPIC_API_KEY")
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            analysis_timeout: Duration::from_secs(timeout_secs),
            enable_web_search: match lookup("ENABLE_WEB_SEARCH") {
                Some(raw) => parse_flag(&raw).with_context(|| {
                    format!("ENABLE_WEB_SEARCH must be true or false, got '{raw}'")
                })?,
                None => true,
            },
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognised flag value '{other}'"),
    }
}
