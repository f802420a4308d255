use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Ten years; anything longer is a misconfiguration.
const MAX_SESSION_TTL_HOURS: i64 = 87_600;

/// Placeholder session secrets that must not be used outside development.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
}

impl Config {
    /// Read `FEEDBACK_*` variables, falling back to development defaults.
    pub fn from_env() -> Result<Self> {
        let host = env_or("FEEDBACK_HOST", "0.0.0.0");
        let port: u16 = env_or("FEEDBACK_PORT", "3000")
            .parse()
            .context("FEEDBACK_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let session_ttl_hours = parse_ttl_hours(&env_or("FEEDBACK_SESSION_TTL_HOURS", "168"))?; // 7 days
        let cookie_secure: bool = env_or("FEEDBACK_COOKIE_SECURE", "false")
            .parse()
            .context("FEEDBACK_COOKIE_SECURE must be true or false")?;

        Ok(Self {
            addr,
            db_path: env_or("FEEDBACK_DB_PATH", "feedback.db").into(),
            session_secret: env_or("FEEDBACK_SESSION_SECRET", "dev-secret-change-me"),
            session_ttl_hours,
            cookie_secure,
        })
    }

    pub fn has_placeholder_secret(&self) -> bool {
        self.session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.session_secret.as_str())
    }
}

fn parse_ttl_hours(raw: &str) -> Result<i64> {
    let hours: i64 = raw
        .parse()
        .context("FEEDBACK_SESSION_TTL_HOURS must be a whole number of hours")?;
    if !(1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
        anyhow::bail!(
            "FEEDBACK_SESSION_TTL_HOURS must be between 1 and {}, got {}",
            MAX_SESSION_TTL_HOURS,
            hours
        );
    }
    Ok(hours)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}
