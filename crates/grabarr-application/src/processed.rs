// SPDX-License-Identifier: GPL-3.0-or-later

//! Processed-identifier dedup store.
//!
//! A TTL-windowed memory of release identifiers already considered, keyed
//! per instance and managed kind. Entries expire lazily at read time;
//! nothing is ever proactively swept. The caller merges the identifiers it
//! considered this cycle into the window read at cycle start, so expired
//! entries fall out naturally on the next read.

use chrono::{DateTime, Duration, Utc};
use grabarr_domain::MediaKind;
use grabarr_infrastructure::{ConfigStore, StoreError};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

const TTL_HOURS: i64 = 24;

pub fn processed_key(kind: MediaKind) -> String {
    format!("processed_ids_{}", kind.as_str())
}

/// The identifiers still suppressing re-evaluation, with their original
/// first-seen timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedWindow {
    entries: HashMap<String, DateTime<Utc>>,
}

impl ProcessedWindow {
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn mark(&mut self, identifier: impl Into<String>, seen_at: DateTime<Utc>) {
        self.entries.insert(identifier.into(), seen_at);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_value(&self) -> Value {
        let entries: serde_json::Map<String, Value> = self
            .entries
            .iter()
            .map(|(id, seen_at)| (id.clone(), Value::String(seen_at.to_rfc3339())))
            .collect();
        json!({ "entries": entries })
    }
}

/// Read the persisted window, keeping only entries younger than 24 hours as
/// of `now`. Unreadable timestamps are dropped with the expired ones.
pub async fn load_window(
    store: &dyn ConfigStore,
    instance_id: &str,
    kind: MediaKind,
    now: DateTime<Utc>,
) -> Result<ProcessedWindow, StoreError> {
    let blob = store.get(instance_id, &processed_key(kind)).await?;
    let Some(blob) = blob else {
        return Ok(ProcessedWindow::default());
    };

    let Some(raw_entries) = blob.get("entries").and_then(Value::as_object) else {
        return Ok(ProcessedWindow::default());
    };

    let cutoff = now - Duration::hours(TTL_HOURS);
    let mut window = ProcessedWindow::default();
    for (identifier, stamp) in raw_entries {
        let Some(seen_at) = stamp
            .as_str()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
        else {
            debug!(target: "processed", identifier = %identifier, "dropping unreadable timestamp");
            continue;
        };
        if seen_at > cutoff {
            window.mark(identifier.clone(), seen_at);
        }
    }

    Ok(window)
}

/// Overwrite the persisted window. Callers extend the window returned by
/// [`load_window`] before saving, so anything outside the TTL is shed on
/// the next read rather than deleted here.
pub async fn save_window(
    store: &dyn ConfigStore,
    instance_id: &str,
    kind: MediaKind,
    window: &ProcessedWindow,
) -> Result<(), StoreError> {
    store
        .save(instance_id, &processed_key(kind), &window.to_value())
        .await
}
