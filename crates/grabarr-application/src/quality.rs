// SPDX-License-Identifier: GPL-3.0-or-later

//! Keyword-presence check between a release title and a named quality tier.
//!
//! Deliberately permissive: a quality name that encodes no recognizable
//! resolution or source token matches everything. False positives are
//! acceptable here; silently dropping a real candidate is not.

const RESOLUTION_TOKENS: [&str; 4] = ["2160", "1080", "720", "480"];

const SOURCE_TOKENS: [(&str, &[&str]); 6] = [
    ("remux", &["remux"]),
    ("bluray", &["bluray", "blu-ray", "bdrip", "brrip"]),
    ("web", &["web"]),
    ("hdtv", &["hdtv"]),
    ("sdtv", &["sdtv"]),
    ("dvd", &["dvd"]),
];

/// Whether the release title text is consistent with the named quality tier.
pub fn quality_matches(release_title: &str, quality_name: &str) -> bool {
    let title = release_title.to_lowercase();
    let name = quality_name.to_lowercase();

    if let Some(resolution) = RESOLUTION_TOKENS.iter().find(|token| name.contains(*token)) {
        if !title.contains(resolution) {
            return false;
        }
    }

    // remux is checked before bluray so "Remux-2160p" does not fall through
    // to the broader bluray aliases
    if let Some((_, aliases)) = SOURCE_TOKENS
        .iter()
        .find(|(token, _)| name.contains(token))
    {
        if !aliases.iter().any(|alias| title.contains(alias)) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::quality_matches;

    #[test]
    fn resolution_must_be_present_when_name_encodes_one() {
        assert!(quality_matches("Movie.2020.1080p.WEB-DL", "1080p WEB"));
        assert!(!quality_matches("Movie.2020.720p.WEB-DL", "1080p WEB"));
    }

    #[test]
    fn source_aliases_cover_common_spellings() {
        assert!(quality_matches("Movie.2020.1080p.Blu-Ray.x264", "1080p BluRay"));
        assert!(quality_matches("Movie.2020.1080p.BDRip", "1080p BluRay"));
        assert!(!quality_matches("Movie.2020.1080p.HDTV", "1080p BluRay"));
    }

    #[test]
    fn web_matches_both_webdl_and_webrip() {
        assert!(quality_matches("Show.S01E01.1080p.WEB-DL", "WEBDL-1080p"));
        assert!(quality_matches("Show.S01E01.1080p.WEBRip", "WEBDL-1080p"));
    }

    #[test]
    fn remux_does_not_satisfy_plain_bluray_title() {
        assert!(!quality_matches("Movie.2020.2160p.BluRay.x265", "Remux-2160p"));
        assert!(quality_matches("Movie.2020.2160p.BluRay.REMUX", "Remux-2160p"));
    }

    #[test]
    fn tokenless_quality_name_matches_everything() {
        assert!(quality_matches("Movie.2020.Whatever", "Unknown"));
        assert!(quality_matches("", "Unknown"));
    }
}
