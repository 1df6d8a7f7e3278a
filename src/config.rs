//! Environment configuration for the server and the game.

use crate::types::GameConfig;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_POOL_STORE_PATH: &str = "data/question_pool.json";

/// Read an env var, treating blank values as unset
pub(crate) fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Parse an env var, falling back to `default` when unset or unparsable
fn parsed_env<T: FromStr>(name: &str, default: T) -> T {
    match non_empty_env(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", name, raw);
            default
        }),
        None => default,
    }
}

/// Where the HTTP server listens and keeps its files
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// JSON file backing the question pools
    pub pool_store_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            pool_store_path: PathBuf::from(DEFAULT_POOL_STORE_PATH),
        }
    }
}

impl ServerConfig {
    /// Load from PORT and POOL_STORE_PATH
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed_env("PORT", defaults.port),
            pool_store_path: non_empty_env("POOL_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.pool_store_path),
        }
    }
}

impl GameConfig {
    /// Load from POOL_SIZE, TOPIC_COUNT and SPIN_TICKS. Zero sizes fall back
    /// to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let positive = |name: &str, default: usize| match parsed_env(name, default) {
            0 => default,
            n => n,
        };

        Self {
            pool_size: positive("POOL_SIZE", defaults.pool_size),
            topic_count: positive("TOPIC_COUNT", defaults.topic_count),
            spin_ticks: parsed_env("SPIN_TICKS", defaults.spin_ticks),
        }
    }
}
