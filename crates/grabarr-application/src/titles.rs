// SPDX-License-Identifier: GPL-3.0-or-later

//! Release-title text utilities: normalization plus year and
//! season/episode extraction from free-text scene names.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lower-case, fold diacritics, replace every non-alphanumeric character
/// with a space and collapse runs of whitespace. Total: any input yields a
/// (possibly empty) string.
pub fn normalize(title: &str) -> String {
    let folded: String = title
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    folded.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// First 4-digit year in 1900..=2099, or 0 when the title carries none.
pub fn extract_year(title: &str) -> i32 {
    lazy_static! {
        static ref YEAR_REGEX: Regex =
            Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("valid year regex");
    }

    YEAR_REGEX
        .find(title)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// First season/episode token (`S01E02`, `s1e2`, `1x02`), or `(0, 0)` when
/// the title carries none.
pub fn extract_season_episode(title: &str) -> (u32, u32) {
    lazy_static! {
        static ref SEASON_EPISODE_REGEX: Regex =
            Regex::new(r"(?i)\bs(\d{1,2})\s?e(\d{1,3})\b|\b(\d{1,2})x(\d{1,3})\b")
                .expect("valid season/episode regex");
    }

    let Some(captures) = SEASON_EPISODE_REGEX.captures(title) else {
        return (0, 0);
    };

    let number_at = |first: usize, second: usize| {
        captures
            .get(first)
            .or_else(|| captures.get(second))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    (number_at(1, 3), number_at(2, 4))
}

#[cfg(test)]
mod tests {
    use super::{extract_season_episode, extract_year, normalize};

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("Movie.Title.2020.1080p.WEB-DL"), "movie title 2020 1080p web dl");
        assert_eq!(normalize("  Spaced   out  "), "spaced out");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_folds_diacritics() {
        assert_eq!(normalize("Amélie"), "amelie");
        assert_eq!(normalize("Léon: The Professional"), "leon the professional");
    }

    #[test]
    fn year_extraction_bounds() {
        assert_eq!(extract_year("Movie.Title.2020.1080p"), 2020);
        assert_eq!(extract_year("Old.Film.1937.DVDRip"), 1937);
        // 2160 reads as a resolution, not a year
        assert_eq!(extract_year("Show.2160p.WEB"), 0);
        assert_eq!(extract_year("No year here"), 0);
    }

    #[test]
    fn year_extraction_takes_first_match() {
        assert_eq!(extract_year("Blade.Runner.2049.1982.Remaster"), 2049);
    }

    #[test]
    fn season_episode_tokens() {
        assert_eq!(extract_season_episode("Show.S01E02.1080p"), (1, 2));
        assert_eq!(extract_season_episode("show s1 e2"), (1, 2));
        assert_eq!(extract_season_episode("Show.3x114.HDTV"), (3, 114));
        assert_eq!(extract_season_episode("Movie.Title.2020"), (0, 0));
    }
}
