// src/config.rs

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_TOSS_API_BASE: &str = "https://api.tosspayments.com";

/// A credential that must never reach logs or responses.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Process-wide settings, read once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub database_url: Secret,
    pub toss_secret_key: Option<Secret>,
    pub toss_api_base: String,
    pub auth_url: Option<String>,
    pub auth_api_key: Option<Secret>,
    pub gateway_timeout: Duration,
}

/// Borrowed view of the auth service settings, present only when both are set.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings<'a> {
    pub base_url: &'a str,
    pub api_key: &'a Secret,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url = get("DATABASE_URL")
            .map(Secret::new)
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let toss_secret_key = get("TOSS_SECRET_KEY").map(Secret::new);
        if toss_secret_key.is_none() {
            log::warn!("TOSS_SECRET_KEY not set, payment confirmation will be refused");
        }

        let auth_url = get("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string());
        let auth_api_key = get("SUPABASE_ANON_KEY")
            .or_else(|| get("SUPABASE_PUBLISHABLE_KEY"))
            .map(Secret::new);
        if auth_url.is_none() || auth_api_key.is_none() {
            log::warn!(
                "auth service not configured (has_url={} has_key={})",
                auth_url.is_some(),
                auth_api_key.is_some()
            );
        }

        let toss_api_base = get("TOSS_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_TOSS_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs: u64 = parse_or("GATEWAY_TIMEOUT_SECS", get("GATEWAY_TIMEOUT_SECS"), 10)?;

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", get("PORT"), 8065)?,
            database_url,
            toss_secret_key,
            toss_api_base,
            auth_url,
            auth_api_key,
            gateway_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn auth_settings(&self) -> Option<AuthSettings<'_>> {
        match (self.auth_url.as_deref(), self.auth_api_key.as_ref()) {
            (Some(base_url), Some(api_key)) => Some(AuthSettings { base_url, api_key }),
            _ => None,
        }
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    match raw {
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
