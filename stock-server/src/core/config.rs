//! Server configuration
//!
//! All knobs can be overridden through environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | DATABASE_PATH | stockmaster.db | SQLite database file |
//! | POLL_INTERVAL_SECS | 60 | Scheduled-work poller tick |
//! | SYNC_INTERVAL_SECS | 3600 | Periodic full-sync interval |
//! | SYNC_MAX_ATTEMPTS | 3 | Bounded retries per sync invocation |
//! | SYNC_RETRY_DELAY_SECS | 60 | Fixed delay between sync retries |
//! | WEBHOOK_BASE_URL | (unset) | Public base URL of the webhook receiver |
//! | ENVIRONMENT | development | development \| staging \| production |

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file path.
    pub database_path: String,
    /// Scheduled-work poller tick interval.
    pub poll_interval: Duration,
    /// Periodic full-sync interval.
    pub sync_interval: Duration,
    /// Bounded attempts per synchronize invocation.
    pub sync_max_attempts: u32,
    /// Fixed delay between sync attempts.
    pub sync_retry_delay: Duration,
    /// Public base URL the webhook receiver is reachable on; webhook
    /// registration is skipped when unset.
    pub webhook_base_url: Option<String>,
    /// development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "stockmaster.db".into()),
            poll_interval: Duration::from_secs(env_u64("POLL_INTERVAL_SECS", 60)),
            sync_interval: Duration::from_secs(env_u64("SYNC_INTERVAL_SECS", 3600)),
            sync_max_attempts: env_u64("SYNC_MAX_ATTEMPTS", 3) as u32,
            sync_retry_delay: Duration::from_secs(env_u64("SYNC_RETRY_DELAY_SECS", 60)),
            webhook_base_url: std::env::var("WEBHOOK_BASE_URL").ok().filter(|v| !v.is_empty()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
