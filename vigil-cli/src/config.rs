use std::path::{Path, PathBuf};

use serde::Deserialize;
use vigil_cooldown::CooldownDurations;

fn default_check_store_path() -> PathBuf {
    PathBuf::from("./data/check_store.json")
}

fn default_cooldown_store_path() -> PathBuf {
    PathBuf::from("./data/cooldowns.json")
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_sweep_interval_ms() -> u64 {
    60_000
}

fn default_steam_api_base_url() -> String {
    "https://api.steampowered.com".to_string()
}

fn default_cooldown_ms() -> u64 {
    60_000
}

fn default_claim_batch_size() -> u32 {
    vigil_worker::DEFAULT_CLAIM_COUNT
}

/// Queue service connection details. Absent entirely when this instance
/// runs store-only (no remote queue configured).
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default)]
    pub instance_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CooldownDurationsConfig {
    #[serde(default = "default_cooldown_ms")]
    pub connection_reset_ms: u64,
    #[serde(default = "default_cooldown_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cooldown_ms")]
    pub dns_failure_ms: u64,
}

impl Default for CooldownDurationsConfig {
    fn default() -> Self {
        Self {
            connection_reset_ms: default_cooldown_ms(),
            timeout_ms: default_cooldown_ms(),
            dns_failure_ms: default_cooldown_ms(),
        }
    }
}

impl From<CooldownDurationsConfig> for CooldownDurations {
    fn from(c: CooldownDurationsConfig) -> Self {
        CooldownDurations {
            connection_reset: c.connection_reset_ms,
            timeout: c.timeout_ms,
            dns_failure: c.dns_failure_ms,
        }
    }
}

/// Top-level configuration, loaded from TOML with every field defaulted so
/// a missing or partial file still produces a runnable configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    #[serde(default = "default_check_store_path")]
    pub check_store_path: PathBuf,
    #[serde(default = "default_cooldown_store_path")]
    pub cooldown_store_path: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_claim_batch_size")]
    pub claim_batch_size: u32,
    #[serde(default)]
    pub backoff_minutes: Vec<u64>,
    #[serde(default)]
    pub cooldown_durations: CooldownDurationsConfig,
    #[serde(default = "default_steam_api_base_url")]
    pub steam_api_base_url: String,
    #[serde(default)]
    pub queue: Option<QueueConfig>,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            check_store_path: default_check_store_path(),
            cooldown_store_path: default_cooldown_store_path(),
            poll_interval_ms: default_poll_interval_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            claim_batch_size: default_claim_batch_size(),
            backoff_minutes: Vec::new(),
            cooldown_durations: CooldownDurationsConfig::default(),
            steam_api_base_url: default_steam_api_base_url(),
            queue: None,
        }
    }
}

const DEFAULT_CONFIG_FILENAME: &str = "vigil.toml";

/// Loads configuration from `path`, or `./vigil.toml` if no path was given
/// and it exists, falling back to defaults (logged) when no file is found
/// or the file fails to parse. Never fails startup over a config problem.
pub fn load(path: Option<&Path>) -> VigilConfig {
    let resolved = match path {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let candidate = PathBuf::from(DEFAULT_CONFIG_FILENAME);
            candidate.exists().then_some(candidate)
        }
    };

    let Some(resolved) = resolved else {
        tracing::debug!("no config file found, using defaults");
        return VigilConfig::default();
    };

    match std::fs::read_to_string(&resolved) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!(path = %resolved.display(), "loaded configuration");
                config
            }
            Err(e) => {
                tracing::error!(error = %e, path = %resolved.display(), "failed to parse config, using defaults");
                VigilConfig::default()
            }
        },
        Err(e) => {
            tracing::error!(error = %e, path = %resolved.display(), "failed to read config, using defaults");
            VigilConfig::default()
        }
    }
}
