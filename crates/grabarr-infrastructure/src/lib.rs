// SPDX-License-Identifier: GPL-3.0-or-later
pub mod sqlite_store;
pub mod store;

pub use sqlite_store::SqliteConfigStore;
pub use store::{ConfigStore, MemoryConfigStore, StoreError};

use anyhow::Result;
use grabarr_config::AppConfig;
use reqwest::Client;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

pub fn http_client() -> Client {
    Client::builder()
        .pool_max_idle_per_host(8)
        .build()
        .expect("http client")
}

/// Open the SQLite pool backing the config store, creating the database
/// file and its parent directory when missing.
pub async fn connect_pool(config: &AppConfig) -> Result<SqlitePool> {
    let db_url = if config.database.url.starts_with("sqlite://")
        && !config.database.url.starts_with("sqlite://:memory:")
    {
        let db_path = config.database.url.trim_start_matches("sqlite://");
        let path = Path::new(db_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let absolute_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        // Forward slashes work on all platforms SQLite supports
        let path_str = absolute_path.to_string_lossy().replace('\\', "/");
        format!("sqlite://{}?mode=rwc", path_str)
    } else {
        config.database.url.clone()
    };

    info!(target: "infrastructure", db_url = %db_url, "connecting to database");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.pool_max_size)
        .connect(&db_url)
        .await?;

    Ok(pool)
}
