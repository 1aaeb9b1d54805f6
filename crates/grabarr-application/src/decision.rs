// SPDX-License-Identifier: GPL-3.0-or-later

//! The single-pair grab decision.
//!
//! `evaluate_pair` walks the per-entry state machine: monitoring, quality
//! gate, size gate, format-score floor, upgrade policy. Business outcomes
//! are values with a displayable reason, never errors.

use crate::custom_formats::{self, CompiledFormat};
use crate::profiles;
use crate::quality::quality_matches;
use crate::size::{self, evaluate_size};
use grabarr_domain::{CollectionEntry, QualityProfile, Release, SizeTable};
use grabarr_infrastructure::{ConfigStore, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub approved: bool,
    pub reason: String,
    pub score: i64,
}

impl Decision {
    fn reject(reason: impl Into<String>, score: i64) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
            score,
        }
    }

    fn approve(reason: impl Into<String>, score: i64) -> Self {
        Self {
            approved: true,
            reason: reason.into(),
            score,
        }
    }
}

/// Pure decision over already-loaded configuration. The cycle orchestrator
/// loads profiles, formats and size bands once and calls this per pair.
pub fn evaluate_pair(
    release: &Release,
    entry: &CollectionEntry,
    profile: &QualityProfile,
    sizes: &SizeTable,
    formats: &[CompiledFormat],
) -> Decision {
    if !entry.monitored {
        return Decision::reject("Not monitored", 0);
    }

    let matched_quality = if profile.accepts_any_quality() {
        Some("")
    } else {
        profile
            .enabled_qualities()
            .find(|quality| quality_matches(&release.title, &quality.name))
            .map(|quality| quality.name.as_str())
    };
    let Some(quality_name) = matched_quality else {
        return Decision::reject("Quality not in profile", 0);
    };

    let size = evaluate_size(
        release.size_bytes,
        quality_name,
        entry.runtime_or_default(),
        sizes,
    );
    let Some(preference) = size.preference else {
        return Decision::reject("Size outside limits", 0);
    };

    let (format_score, _breakdown) = custom_formats::score_title(&release.title, formats);
    if format_score < profile.min_custom_format_score {
        return Decision::reject(
            format!(
                "CF score {} below minimum {}",
                format_score, profile.min_custom_format_score
            ),
            format_score,
        );
    }

    let total = format_score + preference.round() as i64;
    if entry.has_file && !profile.upgrades_allowed {
        return Decision::reject("Upgrades disabled", total);
    }

    if entry.has_file {
        Decision::approve("Upgrade candidate", total)
    } else {
        Decision::approve("Missing/wanted", total)
    }
}

/// Store-backed convenience wrapper: resolves the profile by name and loads
/// the instance's formats and size bands before deciding one pair.
pub async fn evaluate(
    store: &dyn ConfigStore,
    instance_id: &str,
    release: &Release,
    entry: &CollectionEntry,
    profile_name: Option<&str>,
) -> Result<Decision, StoreError> {
    let profile = profiles::resolve_profile(store, instance_id, profile_name).await?;
    let sizes = size::load_size_table(store, instance_id).await?;
    let formats_blob = store
        .get(instance_id, custom_formats::CUSTOM_FORMATS_KEY)
        .await?;
    let formats =
        custom_formats::compile_formats(&custom_formats::formats_from_blob(formats_blob.as_ref()));

    Ok(evaluate_pair(release, entry, &profile, &sizes, &formats))
}

#[cfg(test)]
mod tests {
    use super::{evaluate, evaluate_pair};
    use crate::custom_formats::compile_formats;
    use grabarr_domain::{
        CollectionEntry, CustomFormat, FormatSpecification, MediaKind, ProfileQuality,
        QualityProfile, Release, SizeLimit, SizeTable,
    };
    use grabarr_infrastructure::{ConfigStore, MemoryConfigStore};
    use serde_json::json;

    fn hd_profile() -> QualityProfile {
        let mut profile = QualityProfile::new("HD");
        profile.qualities = vec![ProfileQuality {
            id: 1,
            name: "1080p WEB".into(),
            enabled: true,
        }];
        profile
    }

    fn wanted_movie() -> CollectionEntry {
        CollectionEntry {
            year: Some(2020),
            ..CollectionEntry::new(MediaKind::Movie, "Movie Title")
        }
    }

    fn web_release() -> Release {
        Release {
            size_bytes: Some(4_000_000_000),
            ..Release::new("Movie.Title.2020.1080p.WEB-DL", "feed")
        }
    }

    #[test]
    fn unmonitored_entry_is_terminal_regardless_of_release() {
        let mut entry = wanted_movie();
        entry.monitored = false;

        let decision = evaluate_pair(
            &web_release(),
            &entry,
            &hd_profile(),
            &SizeTable::default(),
            &[],
        );
        assert_eq!(decision.approved, false);
        assert_eq!(decision.reason, "Not monitored");
        assert_eq!(decision.score, 0);
    }

    #[test]
    fn quality_outside_profile_rejects_with_zero_score() {
        let release = Release {
            size_bytes: Some(700_000_000),
            ..Release::new("Movie.Title.2020.480p.DVDRip", "feed")
        };
        let decision = evaluate_pair(
            &release,
            &wanted_movie(),
            &hd_profile(),
            &SizeTable::default(),
            &[],
        );
        assert_eq!(decision.reason, "Quality not in profile");
        assert_eq!(decision.score, 0);
    }

    #[test]
    fn size_gate_failure_rejects() {
        let mut sizes = SizeTable::default();
        sizes.limits.insert(
            "1080p WEB".into(),
            SizeLimit {
                min: 0.0,
                preferred: 10.0,
                max: 20.0,
            },
        );
        let decision = evaluate_pair(
            &Release {
                size_bytes: Some(8_000_000_000),
                ..web_release()
            },
            &wanted_movie(),
            &hd_profile(),
            &sizes,
            &[],
        );
        assert_eq!(decision.reason, "Size outside limits");
    }

    #[test]
    fn below_minimum_score_carries_the_shortfall() {
        let mut profile = hd_profile();
        profile.min_custom_format_score = 10;

        let mut penalty = CustomFormat::new("x264 penalty", -5);
        penalty.specifications.push(FormatSpecification {
            pattern: "WEB".into(),
            negate: false,
            required: true,
            implementation: None,
        });
        let formats = compile_formats(&[penalty]);

        let decision = evaluate_pair(
            &web_release(),
            &wanted_movie(),
            &profile,
            &SizeTable::default(),
            &formats,
        );
        assert!(!decision.approved);
        assert_eq!(decision.reason, "CF score -5 below minimum 10");
        assert_eq!(decision.score, -5);
    }

    #[test]
    fn upgrades_disabled_rejects_entries_with_files() {
        let mut profile = hd_profile();
        profile.upgrades_allowed = false;
        let mut entry = wanted_movie();
        entry.has_file = true;

        let decision = evaluate_pair(
            &web_release(),
            &entry,
            &profile,
            &SizeTable::default(),
            &[],
        );
        assert!(!decision.approved);
        assert_eq!(decision.reason, "Upgrades disabled");
        assert!(decision.score > 0);
    }

    #[test]
    fn missing_entry_approves_with_combined_score() {
        let decision = evaluate_pair(
            &web_release(),
            &wanted_movie(),
            &hd_profile(),
            &SizeTable::default(),
            &[],
        );
        assert!(decision.approved);
        assert_eq!(decision.reason, "Missing/wanted");
        // format score 0 plus the size preference for ~42 MB/min on the
        // default (0, 0, 400) band: 100 - 100*42.4/400 ≈ 89
        assert_eq!(decision.score, 89);
    }

    #[test]
    fn entries_with_files_approve_as_upgrade_candidates() {
        let mut entry = wanted_movie();
        entry.has_file = true;

        let decision = evaluate_pair(
            &web_release(),
            &entry,
            &hd_profile(),
            &SizeTable::default(),
            &[],
        );
        assert!(decision.approved);
        assert_eq!(decision.reason, "Upgrade candidate");
    }

    #[tokio::test]
    async fn store_backed_evaluate_resolves_configuration() {
        let store = MemoryConfigStore::new();
        store
            .save(
                "default",
                crate::profiles::PROFILES_KEY,
                &json!({"profiles": [{
                    "name": "HD",
                    "is_default": true,
                    "qualities": [{"name": "1080p WEB"}]
                }]}),
            )
            .await
            .unwrap();

        let decision = evaluate(
            &store,
            "default",
            &web_release(),
            &wanted_movie(),
            None,
        )
        .await
        .unwrap();
        assert!(decision.approved);
        assert_eq!(decision.reason, "Missing/wanted");
    }
}
