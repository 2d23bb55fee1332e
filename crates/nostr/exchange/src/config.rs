//! Exchange configuration.
//!
//! Stored as camelCase JSON. Every field has a default, so a partial file (or
//! `{}`) is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use nostr_exchange::{ExchangeConfig, load_config, save_config};
//!
//! let config = load_config("exchange.json").unwrap();
//! println!("Relays: {:?}", config.relays);
//!
//! save_config("exchange.json", &ExchangeConfig::default()).unwrap();
//! ```

use crate::DEFAULT_RELAYS;
use crate::error::{ExchangeError, Result};
use nostr::is_valid_relay_url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Deadlines, cooldowns and the initial relay set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeConfig {
    /// Initial relay set
    #[serde(default = "default_relays")]
    pub relays: Vec<String>,

    /// Deadline for a single profile read
    #[serde(default = "default_profile_timeout_ms")]
    pub profile_timeout_ms: u64,

    /// Deadline for a single role read
    #[serde(default = "default_role_timeout_ms")]
    pub role_timeout_ms: u64,

    /// Deadline for batched profile reads
    #[serde(default = "default_multiple_profiles_timeout_ms")]
    pub multiple_profiles_timeout_ms: u64,

    /// Deadline for latest-wins profile queries
    #[serde(default = "default_query_profiles_timeout_ms")]
    pub query_profiles_timeout_ms: u64,

    /// Deadline for follow list reads
    #[serde(default = "default_follow_list_timeout_ms")]
    pub follow_list_timeout_ms: u64,

    /// Default deadline for relay acknowledgment of a publish
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,

    /// Minimum spacing between profile fetches
    #[serde(default = "default_fetch_profile_interval_ms")]
    pub fetch_profile_interval_ms: u64,

    /// Minimum spacing between publishes
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,

    /// WebSocket connect timeout for the relay pool
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Default limit for profile discovery queries
    #[serde(default = "default_query_limit")]
    pub query_limit: u64,
}

fn default_relays() -> Vec<String> {
    DEFAULT_RELAYS.iter().map(|s| s.to_string()).collect()
}

fn default_profile_timeout_ms() -> u64 {
    3000
}

fn default_role_timeout_ms() -> u64 {
    3000
}

fn default_multiple_profiles_timeout_ms() -> u64 {
    5000
}

fn default_query_profiles_timeout_ms() -> u64 {
    5000
}

fn default_follow_list_timeout_ms() -> u64 {
    10_000
}

fn default_publish_timeout_ms() -> u64 {
    1000
}

fn default_fetch_profile_interval_ms() -> u64 {
    500
}

fn default_publish_interval_ms() -> u64 {
    1000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_query_limit() -> u64 {
    100
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            relays: default_relays(),
            profile_timeout_ms: default_profile_timeout_ms(),
            role_timeout_ms: default_role_timeout_ms(),
            multiple_profiles_timeout_ms: default_multiple_profiles_timeout_ms(),
            query_profiles_timeout_ms: default_query_profiles_timeout_ms(),
            follow_list_timeout_ms: default_follow_list_timeout_ms(),
            publish_timeout_ms: default_publish_timeout_ms(),
            fetch_profile_interval_ms: default_fetch_profile_interval_ms(),
            publish_interval_ms: default_publish_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            query_limit: default_query_limit(),
        }
    }
}

impl ExchangeConfig {
    /// Same defaults with a different initial relay set.
    pub fn with_relays(relays: Vec<String>) -> Self {
        Self {
            relays,
            ..Self::default()
        }
    }

    /// Reject the whole configuration if any relay URL is invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self.relays.iter().find(|url| !is_valid_relay_url(url)) {
            return Err(ExchangeError::InvalidRelayUrl(bad.clone()));
        }
        if self.query_limit == 0 {
            return Err(ExchangeError::Config("queryLimit must be positive".to_string()));
        }
        Ok(())
    }

    pub fn profile_timeout(&self) -> Duration {
        Duration::from_millis(self.profile_timeout_ms)
    }

    pub fn role_timeout(&self) -> Duration {
        Duration::from_millis(self.role_timeout_ms)
    }

    pub fn multiple_profiles_timeout(&self) -> Duration {
        Duration::from_millis(self.multiple_profiles_timeout_ms)
    }

    pub fn query_profiles_timeout(&self) -> Duration {
        Duration::from_millis(self.query_profiles_timeout_ms)
    }

    pub fn follow_list_timeout(&self) -> Duration {
        Duration::from_millis(self.follow_list_timeout_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub fn fetch_profile_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_profile_interval_ms)
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ExchangeConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let config: ExchangeConfig = serde_json::from_str(&content)?;
    config.validate()?;
    info!("Loaded exchange config from {}", path.display());
    Ok(config)
}

/// Write a configuration file, creating parent directories as needed.
pub fn save_config(path: impl AsRef<Path>, config: &ExchangeConfig) -> Result<()> {
    let path = path.as_ref();
    config.validate()?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}
