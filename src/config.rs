// Configuration module for ripple
// Reads from environment variables with sensible defaults

use std::env;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-analysis deadline in seconds (RIPPLE_ANALYSIS_TIMEOUT_SECS)
    pub analysis_timeout_secs: u64,

    /// Documents requested from the retrieval collaborator (RIPPLE_RETRIEVAL_K)
    pub retrieval_k: usize,

    /// Database connection pool size (RIPPLE_POOL_SIZE)
    pub pool_size: u32,

    /// Database connection pool minimum idle connections (RIPPLE_POOL_MIN_IDLE)
    pub pool_min_idle: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analysis_timeout_secs: 30,
            retrieval_k: 10,
            pool_size: 10,
            pool_min_idle: 2,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(val) = env::var("RIPPLE_ANALYSIS_TIMEOUT_SECS") {
            if let Ok(parsed) = val.parse() {
                config.analysis_timeout_secs = parsed;
            } else {
                tracing::warn!(
                    "invalid RIPPLE_ANALYSIS_TIMEOUT_SECS value: {}, using default: {}",
                    val,
                    config.analysis_timeout_secs
                );
            }
        }

        if let Ok(val) = env::var("RIPPLE_RETRIEVAL_K") {
            if let Ok(parsed) = val.parse() {
                config.retrieval_k = parsed;
            } else {
                tracing::warn!(
                    "invalid RIPPLE_RETRIEVAL_K value: {}, using default: {}",
                    val,
                    config.retrieval_k
                );
            }
        }

        if let Ok(val) = env::var("RIPPLE_POOL_SIZE") {
            if let Ok(parsed) = val.parse() {
                config.pool_size = parsed;
            } else {
                tracing::warn!(
                    "invalid RIPPLE_POOL_SIZE value: {}, using default: {}",
                    val,
                    config.pool_size
                );
            }
        }

        if let Ok(val) = env::var("RIPPLE_POOL_MIN_IDLE") {
            if let Ok(parsed) = val.parse() {
                config.pool_min_idle = parsed;
            } else {
                tracing::warn!(
                    "invalid RIPPLE_POOL_MIN_IDLE value: {}, using default: {}",
                    val,
                    config.pool_min_idle
                );
            }
        }

        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }
}
