// SPDX-License-Identifier: GPL-3.0-or-later

//! Generic per-instance JSON blob store.
//!
//! Every piece of engine configuration (profiles, custom formats, size
//! tables, processed-id records, sync status) lives under an
//! `(instance_id, key)` pair as one JSON document. Absence of a document is
//! a normal answer, not an error; each reader carries its own fallback.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),
    #[error("stored value under '{key}' is not valid JSON: {reason}")]
    Corrupt { key: String, reason: String },
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, instance_id: &str, key: &str) -> Result<Option<Value>, StoreError>;

    async fn save(&self, instance_id: &str, key: &str, value: &Value) -> Result<(), StoreError>;
}

/// Process-local store used by tests and single-binary deployments that do
/// not need durability across restarts.
#[derive(Default)]
pub struct MemoryConfigStore {
    blobs: Mutex<HashMap<(String, String), Value>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Value>> {
        self.blobs.lock().unwrap_or_else(|poisoned| {
            warn!(target: "store", "memory store mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, instance_id: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let blobs = self.lock();
        Ok(blobs
            .get(&(instance_id.to_string(), key.to_string()))
            .cloned())
    }

    async fn save(&self, instance_id: &str, key: &str, value: &Value) -> Result<(), StoreError> {
        let mut blobs = self.lock();
        blobs.insert(
            (instance_id.to_string(), key.to_string()),
            value.clone(),
        );
        Ok(())
    }
}
