// SPDX-License-Identifier: GPL-3.0-or-later

//! Quality-profile resolution.
//!
//! Profile lookup is total: a blank or unknown name falls back to the
//! instance's default profile, then to the first stored profile, then to
//! the built-in template. Downstream scorers never see a partial profile.

use grabarr_domain::QualityProfile;
use grabarr_infrastructure::{ConfigStore, StoreError};
use serde_json::Value;
use tracing::debug;

pub const PROFILES_KEY: &str = "quality_profiles";

/// Load the stored profile list for an instance. A missing or malformed
/// blob yields an empty list; individual malformed entries are skipped.
pub async fn load_profiles(
    store: &dyn ConfigStore,
    instance_id: &str,
) -> Result<Vec<QualityProfile>, StoreError> {
    let blob = store.get(instance_id, PROFILES_KEY).await?;
    Ok(profiles_from_blob(blob.as_ref()))
}

pub fn profiles_from_blob(blob: Option<&Value>) -> Vec<QualityProfile> {
    let Some(blob) = blob else {
        return Vec::new();
    };

    let list = match blob {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("profiles").and_then(Value::as_array) {
            Some(items) => items.as_slice(),
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    list.iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(profile) => Some(profile),
            Err(error) => {
                debug!(target: "profiles", error = %error, "skipping malformed profile");
                None
            }
        })
        .collect()
}

/// Resolve a profile by name against an instance's stored list.
pub async fn resolve_profile(
    store: &dyn ConfigStore,
    instance_id: &str,
    name: Option<&str>,
) -> Result<QualityProfile, StoreError> {
    let profiles = load_profiles(store, instance_id).await?;
    Ok(resolve_from(&profiles, name))
}

/// Pure resolution over an already-loaded list. Never fails.
pub fn resolve_from(profiles: &[QualityProfile], name: Option<&str>) -> QualityProfile {
    if let Some(wanted) = name.map(canonical_name).filter(|name| !name.is_empty()) {
        if let Some(profile) = profiles
            .iter()
            .find(|profile| canonical_name(&profile.name) == wanted)
        {
            return profile.clone();
        }
        debug!(target: "profiles", name = %wanted, "unknown profile name, using fallback");
    }

    profiles
        .iter()
        .find(|profile| profile.is_default)
        .or_else(|| profiles.first())
        .cloned()
        .unwrap_or_else(QualityProfile::builtin)
}

/// Case-insensitive comparison key, ignoring a trailing "(Default)" marker.
fn canonical_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    lowered
        .strip_suffix("(default)")
        .map(str::trim_end)
        .unwrap_or(&lowered)
        .to_string()
}
