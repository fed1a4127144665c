use {
    crate::{
        domain::error::ActivityError,
        services::{fallback::DEFAULT_WINDOW, stats::DEFAULT_SAMPLE_SIZE},
    },
    std::{env, str::FromStr, time::Duration},
};

/// Knobs for the read paths that do not depend on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    /// Rows read per primary table during reconstruction.
    pub fallback_window: u32,
    /// Most recent records scanned for the top-5 lists.
    pub stats_sample_size: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            fallback_window: DEFAULT_WINDOW,
            stats_sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub request_timeout: Duration,
    pub tuning: Tuning,
}

impl AppConfig {
    /// Read from the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> Result<Self, ActivityError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ActivityError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ActivityError::Config("DATABASE_URL must be set".into()))?;

        Ok(Self {
            database_url,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", 20)?,
            acquire_timeout: Duration::from_secs(parse(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS", 3)?),
            request_timeout: Duration::from_secs(parse(&lookup, "REQUEST_TIMEOUT_SECS", 10)?),
            tuning: Tuning {
                fallback_window: parse(&lookup, "FALLBACK_WINDOW", DEFAULT_WINDOW)?,
                stats_sample_size: parse(&lookup, "STATS_SAMPLE_SIZE", DEFAULT_SAMPLE_SIZE)?,
            },
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ActivityError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ActivityError::Config(format!("{key} is not a valid number: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://db")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.acquire_timeout, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.tuning, Tuning::default());
    }

    #[test]
    fn database_url_is_required() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ActivityError::Config(_)));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("FALLBACK_WINDOW", "15"),
            ("STATS_SAMPLE_SIZE", " 500 "),
        ]))
        .unwrap();
        assert_eq!(config.tuning.fallback_window, 15);
        assert_eq!(config.tuning.stats_sample_size, 500);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ActivityError::Config(msg) if msg.contains("REQUEST_TIMEOUT_SECS")));
    }
}
