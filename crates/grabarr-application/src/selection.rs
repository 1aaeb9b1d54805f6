// SPDX-License-Identifier: GPL-3.0-or-later

//! Best-result selection over a batch of candidate releases.
//!
//! Releases are gated by quality and size, scored by custom formats, and
//! ranked with deterministic tie-breaks. The cross-indexer variant ranks
//! indexer priority above the format score.

use crate::custom_formats::{self, CompiledFormat};
use crate::quality::quality_matches;
use crate::size::evaluate_size;
use grabarr_domain::{QualityProfile, Release, SizeTable};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionOutcome {
    pub winner: Option<Release>,
    pub score: i64,
    pub breakdown: String,
}

impl SelectionOutcome {
    fn none() -> Self {
        Self {
            winner: None,
            score: 0,
            breakdown: String::new(),
        }
    }
}

struct Candidate<'a> {
    release: &'a Release,
    score: i64,
    preference: f64,
    breakdown: String,
}

/// Pick the surviving release maximizing `(format score, size preference)`,
/// ties broken by title ascending.
pub fn select_best(
    releases: &[Release],
    profile: &QualityProfile,
    runtime_minutes: u32,
    sizes: &SizeTable,
    formats: &[CompiledFormat],
) -> SelectionOutcome {
    let mut candidates = survivors(releases, profile, runtime_minutes, sizes, formats);

    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.preference.total_cmp(&a.preference))
            .then_with(|| a.release.title.cmp(&b.release.title))
    });

    into_outcome(candidates)
}

/// Cross-indexer variant: candidates are ranked by indexer priority first
/// (lower preferred), then format score, so that one grab results even when
/// several indexers answered independently.
pub fn select_across_indexers(
    releases: &[Release],
    profile: &QualityProfile,
    runtime_minutes: u32,
    sizes: &SizeTable,
    formats: &[CompiledFormat],
) -> SelectionOutcome {
    let mut candidates = survivors(releases, profile, runtime_minutes, sizes, formats);

    candidates.sort_by(|a, b| {
        a.release
            .indexer_priority
            .cmp(&b.release.indexer_priority)
            .then_with(|| b.score.cmp(&a.score))
            .then_with(|| a.release.title.cmp(&b.release.title))
    });

    into_outcome(candidates)
}

fn into_outcome(candidates: Vec<Candidate<'_>>) -> SelectionOutcome {
    match candidates.into_iter().next() {
        Some(candidate) => SelectionOutcome {
            winner: Some(candidate.release.clone()),
            score: candidate.score,
            breakdown: candidate.breakdown,
        },
        None => SelectionOutcome::none(),
    }
}

fn survivors<'a>(
    releases: &'a [Release],
    profile: &QualityProfile,
    runtime_minutes: u32,
    sizes: &SizeTable,
    formats: &[CompiledFormat],
) -> Vec<Candidate<'a>> {
    releases
        .iter()
        .filter_map(|release| {
            let quality_name = gate_quality(release, profile)?;
            let size = evaluate_size(release.size_bytes, quality_name, runtime_minutes, sizes);
            let preference = size.preference?;
            let (score, breakdown) = custom_formats::score_title(&release.title, formats);
            Some(Candidate {
                release,
                score,
                preference,
                breakdown,
            })
        })
        .collect()
}

/// The quality name the size check runs under, or `None` when the release
/// clears no enabled quality. The first enabled quality a release matches
/// is binding; a failed size check is not retried against later tiers.
fn gate_quality<'a>(release: &Release, profile: &'a QualityProfile) -> Option<&'a str> {
    if profile.accepts_any_quality() {
        return Some("");
    }
    profile
        .enabled_qualities()
        .find(|quality| quality_matches(&release.title, &quality.name))
        .map(|quality| quality.name.as_str())
}
