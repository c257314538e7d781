//! Configuration and data directory management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_STORAGE_KEY: &str = "cookie-consent";
pub const DEFAULT_BANNER_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_AGE_YEARS: u32 = 1;
pub const DEFAULT_SYNC_TIMEOUT_MS: u64 = 5000;

/// Paths to all Consentry data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// File-backed consent slots (`data/consent/`).
    pub consent_dir: PathBuf,
    /// SQLite consent database (`data/consent.db`).
    pub consent_db: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            consent_dir: root.join("consent"),
            consent_db: root.join("consent.db"),
            root,
        };
        std::fs::create_dir_all(&paths.consent_dir)?;
        Ok(paths)
    }
}

/// How consent is collected, stored and expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPolicy {
    /// Storage key of the single consent slot.
    pub storage_key: String,
    /// Records older than this many calendar years must be re-collected.
    pub max_age_years: u32,
    /// Delete expired records when they are found.
    pub purge_expired: bool,
    /// Delay before showing the banner on a page without valid consent.
    pub banner_delay_ms: u64,
}

impl Default for ConsentPolicy {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.into(),
            max_age_years: DEFAULT_MAX_AGE_YEARS,
            purge_expired: true,
            banner_delay_ms: DEFAULT_BANNER_DELAY_MS,
        }
    }
}

impl ConsentPolicy {
    pub fn banner_delay(&self) -> Duration {
        Duration::from_millis(self.banner_delay_ms)
    }

    /// Policy with no banner delay (for tests and non-interactive callers).
    pub fn immediate() -> Self {
        Self {
            banner_delay_ms: 0,
            ..Self::default()
        }
    }
}

/// Top-level Consentry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Consent collection policy.
    pub policy: ConsentPolicy,
    /// Endpoint that receives consent signals. Unset means no downstream.
    pub sync_webhook: Option<String>,
    /// Per-request timeout for webhook delivery.
    pub sync_timeout_ms: u64,
}

impl ConsentConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3004);

        let data_paths = DataPaths::new(data_dir)?;
        let defaults = ConsentPolicy::default();

        let storage_key = std::env::var("CONSENTRY_STORAGE_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or(defaults.storage_key);
        let max_age_years = env_parse("CONSENTRY_MAX_AGE_YEARS")?.unwrap_or(defaults.max_age_years);
        if max_age_years == 0 {
            return Err(Error::Config("CONSENTRY_MAX_AGE_YEARS must be at least 1".into()));
        }
        let purge_expired = env_parse("CONSENTRY_PURGE_EXPIRED")?.unwrap_or(defaults.purge_expired);
        let banner_delay_ms =
            env_parse("CONSENTRY_BANNER_DELAY_MS")?.unwrap_or(defaults.banner_delay_ms);

        let sync_webhook = std::env::var("CONSENTRY_SYNC_WEBHOOK")
            .ok()
            .filter(|u| !u.trim().is_empty());
        let sync_timeout_ms =
            env_parse("CONSENTRY_SYNC_TIMEOUT_MS")?.unwrap_or(DEFAULT_SYNC_TIMEOUT_MS);
        if sync_timeout_ms == 0 {
            return Err(Error::Config("CONSENTRY_SYNC_TIMEOUT_MS must be at least 1".into()));
        }

        Ok(Self {
            port,
            data_paths,
            policy: ConsentPolicy {
                storage_key,
                max_age_years,
                purge_expired,
                banner_delay_ms,
            },
            sync_webhook,
            sync_timeout_ms,
        })
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("invalid value for {}: {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}
