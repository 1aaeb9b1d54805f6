// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://grabarr.db".to_string(),
            pool_max_size: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Cadence settings for the feed-sync cycles. The engine clamps the
/// interval to 15..=60 minutes when computing the next sync time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub interval_minutes: u32,
    pub movies_enabled: bool,
    pub series_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            movies_enabled: true,
            series_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadClientConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub movie_category: String,
    pub series_category: String,
}

impl Default for DownloadClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            movie_category: "grabarr-movies".to_string(),
            series_category: "grabarr-series".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerSeed {
    pub name: String,
    pub feed_url: String,
    pub priority: i32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexersConfig {
    pub seeds: Vec<IndexerSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
    pub sync: SyncConfig,
    pub download_client: DownloadClientConfig,
    pub indexers: IndexersConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: GRABARR_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("GRABARR_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}
