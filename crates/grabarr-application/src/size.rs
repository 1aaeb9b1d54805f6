// SPDX-License-Identifier: GPL-3.0-or-later

//! Size gate and preference scoring.
//!
//! A release's byte size is converted into megabytes per minute of runtime
//! and checked against the per-quality band. Inside the band, closeness to
//! the preferred rate maps onto a 0..=100 score.

use grabarr_domain::SizeTable;
use grabarr_infrastructure::{ConfigStore, StoreError};
use serde_json::Value;
use tracing::debug;

pub const SIZE_LIMITS_KEY: &str = "size_limits";

/// Score assumed when the size or runtime is unknown. An unknown size never
/// blocks a grab.
const UNKNOWN_SIZE_PREFERENCE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeDecision {
    pub passes: bool,
    /// 0..=100 closeness to the preferred rate; `None` when the gate failed.
    pub preference: Option<f64>,
}

impl SizeDecision {
    fn pass(preference: f64) -> Self {
        Self {
            passes: true,
            preference: Some(preference),
        }
    }

    fn fail() -> Self {
        Self {
            passes: false,
            preference: None,
        }
    }
}

pub fn evaluate_size(
    size_bytes: Option<u64>,
    quality_name: &str,
    runtime_minutes: u32,
    sizes: &SizeTable,
) -> SizeDecision {
    let Some(size_bytes) = size_bytes.filter(|&bytes| bytes > 0) else {
        return SizeDecision::pass(UNKNOWN_SIZE_PREFERENCE);
    };
    if runtime_minutes == 0 {
        return SizeDecision::pass(UNKNOWN_SIZE_PREFERENCE);
    }

    let mb_per_minute = size_bytes as f64 / (1024.0 * 1024.0) / runtime_minutes as f64;
    let limit = sizes.limit_for(quality_name);

    if mb_per_minute < limit.min || mb_per_minute > limit.max {
        return SizeDecision::fail();
    }

    // An inverted or collapsed band carries no preference gradient.
    if limit.max <= limit.min {
        return SizeDecision::pass(100.0);
    }

    let distance = (mb_per_minute - limit.preferred).abs();
    let preference = 100.0 - 100.0 * distance / (limit.max - limit.min);
    SizeDecision::pass(preference.clamp(0.0, 100.0))
}

/// Load the per-quality size bands for an instance. A missing or malformed
/// blob yields an empty table, which scores every quality on the default
/// band.
pub async fn load_size_table(
    store: &dyn ConfigStore,
    instance_id: &str,
) -> Result<SizeTable, StoreError> {
    let blob = store.get(instance_id, SIZE_LIMITS_KEY).await?;
    Ok(table_from_blob(blob.as_ref()))
}

pub fn table_from_blob(blob: Option<&Value>) -> SizeTable {
    let Some(blob) = blob else {
        return SizeTable::default();
    };

    let map = match blob {
        Value::Object(map) => match map.get("limits") {
            Some(Value::Object(inner)) => inner,
            Some(_) => return SizeTable::default(),
            None => map,
        },
        _ => return SizeTable::default(),
    };

    let mut table = SizeTable::default();
    for (quality_name, limit) in map {
        match serde_json::from_value(limit.clone()) {
            Ok(limit) => {
                table.limits.insert(quality_name.clone(), limit);
            }
            Err(error) => {
                debug!(
                    target: "size",
                    quality = %quality_name,
                    error = %error,
                    "skipping malformed size band"
                );
            }
        }
    }
    table
}
