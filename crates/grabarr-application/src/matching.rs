// SPDX-License-Identifier: GPL-3.0-or-later

//! Release-to-collection linkage.
//!
//! The matcher implements a fallback chain per release:
//! 1. External numeric id lookup (exact, highest confidence)
//! 2. Normalized-title substring scan with year tolerance
//!
//! The substring pass takes the *first* textual match in collection order,
//! not the best one. Releases matching nothing are dropped, not errors.

use crate::titles;
use grabarr_domain::{CollectionEntry, MediaKind, Release};
use std::collections::HashMap;
use tracing::debug;

/// A release linked to a collection entry. Season and episode are 0 for
/// movies and for series releases carrying no episode token.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRelease {
    pub release: Release,
    pub entry: CollectionEntry,
    pub season: u32,
    pub episode: u32,
}

pub fn match_releases(
    releases: &[Release],
    entries: &[CollectionEntry],
) -> Vec<MatchedRelease> {
    let mut by_external_id: HashMap<(MediaKind, i64), usize> = HashMap::new();
    for (index, entry) in entries.iter().enumerate() {
        if let Some(id) = entry.external_ids.linkage_id(entry.kind) {
            by_external_id.entry((entry.kind, id)).or_insert(index);
        }
    }

    // collection order: the substring pass is first-match-wins
    let by_title: Vec<(String, Option<i32>, usize)> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| (titles::normalize(&entry.title), entry.year, index))
        .collect();

    let mut matched = Vec::new();
    for release in releases {
        let Some(entry_index) = link_release(release, &by_external_id, &by_title) else {
            debug!(target: "matching", title = %release.title, "release matched no collection entry");
            continue;
        };

        let entry = &entries[entry_index];
        let (season, episode) = match entry.kind {
            MediaKind::Movie => (0, 0),
            MediaKind::Series => match (release.season, release.episode) {
                (Some(season), Some(episode)) => (season, episode),
                _ => titles::extract_season_episode(&release.title),
            },
        };

        matched.push(MatchedRelease {
            release: release.clone(),
            entry: entry.clone(),
            season,
            episode,
        });
    }

    matched
}

fn link_release(
    release: &Release,
    by_external_id: &HashMap<(MediaKind, i64), usize>,
    by_title: &[(String, Option<i32>, usize)],
) -> Option<usize> {
    if let Some(id) = release.external_ids.tmdb_id {
        if let Some(&index) = by_external_id.get(&(MediaKind::Movie, id)) {
            return Some(index);
        }
    }
    if let Some(id) = release.external_ids.tvdb_id {
        if let Some(&index) = by_external_id.get(&(MediaKind::Series, id)) {
            return Some(index);
        }
    }

    let release_title = titles::normalize(&release.title);
    if release_title.is_empty() {
        return None;
    }
    let release_year = titles::extract_year(&release.title);

    by_title
        .iter()
        .find(|(entry_title, entry_year, _)| {
            !entry_title.is_empty()
                && release_title.contains(entry_title.as_str())
                && years_compatible(release_year, *entry_year)
        })
        .map(|&(_, _, index)| index)
}

// A year is only binding when both sides carry one.
fn years_compatible(release_year: i32, entry_year: Option<i32>) -> bool {
    match entry_year {
        Some(entry_year) if release_year != 0 => release_year == entry_year,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::{match_releases, MatchedRelease};
    use grabarr_domain::{CollectionEntry, MediaKind, Release};

    fn movie(title: &str, year: i32) -> CollectionEntry {
        CollectionEntry {
            year: Some(year),
            ..CollectionEntry::new(MediaKind::Movie, title)
        }
    }

    fn release(title: &str) -> Release {
        Release::new(title, "feed")
    }

    #[test]
    fn external_id_match_wins_over_title() {
        let mut entry_a = movie("Heat", 1995);
        entry_a.external_ids.tmdb_id = Some(949);
        let entry_b = movie("Heat", 1995);

        let mut heat = release("Totally.Different.Name.2160p");
        heat.external_ids.tmdb_id = Some(949);

        let matched = match_releases(&[heat], &[entry_b, entry_a]);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].entry.external_ids.tmdb_id, Some(949));
    }

    #[test]
    fn title_substring_with_matching_year_links() {
        let entries = vec![movie("Movie Title", 2020)];
        let matched = match_releases(
            &[release("Movie.Title.2020.1080p.WEB-DL")],
            &entries,
        );
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].entry.title, "Movie Title");
    }

    #[test]
    fn year_mismatch_blocks_title_link() {
        let entries = vec![movie("Movie Title", 2019)];
        let matched = match_releases(&[release("Movie.Title.2020.1080p")], &entries);
        assert!(matched.is_empty());
    }

    #[test]
    fn missing_year_on_either_side_is_tolerated() {
        let undated_entry = CollectionEntry::new(MediaKind::Movie, "Movie Title");
        let matched = match_releases(&[release("Movie.Title.2020.1080p")], &[undated_entry]);
        assert_eq!(matched.len(), 1);

        let dated_entry = movie("Movie Title", 2020);
        let matched = match_releases(&[release("Movie.Title.1080p.WEB")], &[dated_entry]);
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn unmatched_releases_are_dropped_silently() {
        let entries = vec![movie("Movie Title", 2020)];
        let matched = match_releases(&[release("Unrelated.Show.S01E01")], &entries);
        assert!(matched.is_empty());
    }

    #[test]
    fn substring_pass_takes_first_match_not_best() {
        // documented trade-off: "Batman Begins" releases link to whichever
        // entry appears first in the collection snapshot
        let entries = vec![movie("Batman", 2005), movie("Batman Begins", 2005)];
        let matched = match_releases(&[release("Batman.Begins.2005.1080p")], &entries);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].entry.title, "Batman");
    }

    #[test]
    fn series_season_episode_prefers_release_fields() {
        let series = CollectionEntry::new(MediaKind::Series, "The Wire");

        let mut tagged = release("The.Wire.S02E05.720p");
        tagged.season = Some(4);
        tagged.episode = Some(11);

        let matched = match_releases(&[tagged, release("The.Wire.S02E05.720p")], &[series]);
        assert_eq!(
            matched
                .iter()
                .map(|m: &MatchedRelease| (m.season, m.episode))
                .collect::<Vec<_>>(),
            vec![(4, 11), (2, 5)]
        );
    }
}
