// SPDX-License-Identifier: GPL-3.0-or-later

//! Release-feed edge: fetches indexer RSS/Torznab feeds and converts their
//! items into [`Release`] records stamped with the indexer's priority.

use async_trait::async_trait;
use grabarr_config::IndexerSeed;
use grabarr_domain::{ExternalIds, MediaKind, Release};
use quick_xml::de::from_str;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("feed parse error: {0}")]
    FeedParse(String),
}

/// Produces the release batch for one cycle. The HTTP implementation polls
/// every enabled indexer; tests substitute canned batches.
#[async_trait]
pub trait ReleaseFetcher: Send + Sync {
    async fn fetch(&self, kind: MediaKind) -> Result<Vec<Release>, IndexerError>;
}

pub struct HttpReleaseFetcher {
    client: reqwest::Client,
    seeds: Vec<IndexerSeed>,
}

impl HttpReleaseFetcher {
    pub fn new(client: reqwest::Client, seeds: Vec<IndexerSeed>) -> Self {
        Self { client, seeds }
    }
}

#[async_trait]
impl ReleaseFetcher for HttpReleaseFetcher {
    /// Fetch every enabled feed. A failing indexer is skipped with a
    /// warning so the remaining feeds still contribute to the cycle.
    async fn fetch(&self, _kind: MediaKind) -> Result<Vec<Release>, IndexerError> {
        let mut releases = Vec::new();

        for seed in self.seeds.iter().filter(|seed| seed.enabled) {
            let body = match self.fetch_feed_body(&seed.feed_url).await {
                Ok(body) => body,
                Err(error) => {
                    warn!(target: "indexers", indexer = %seed.name, error = %error, "feed fetch failed, skipping indexer");
                    continue;
                }
            };

            match parse_feed(&body, &seed.name, seed.priority) {
                Ok(mut parsed) => releases.append(&mut parsed),
                Err(error) => {
                    warn!(target: "indexers", indexer = %seed.name, error = %error, "feed parse failed, skipping indexer");
                }
            }
        }

        Ok(releases)
    }
}

impl HttpReleaseFetcher {
    async fn fetch_feed_body(&self, feed_url: &str) -> Result<String, IndexerError> {
        let response = self
            .client
            .get(feed_url)
            .send()
            .await
            .map_err(|error| IndexerError::Request(error.to_string()))?;

        if !response.status().is_success() {
            return Err(IndexerError::Request(format!(
                "feed responded with status {}",
                response.status().as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|error| IndexerError::Request(error.to_string()))
    }
}

/// Parse one RSS/Torznab document into releases. Items without a title are
/// skipped; everything else degrades field-by-field.
pub fn parse_feed(
    xml: &str,
    indexer_name: &str,
    indexer_priority: i32,
) -> Result<Vec<Release>, IndexerError> {
    let envelope: RssEnvelope =
        from_str(xml).map_err(|error| IndexerError::FeedParse(error.to_string()))?;

    let mut releases = Vec::new();
    for item in envelope.channel.items {
        let Some(title) = item.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
        else {
            debug!(target: "indexers", indexer = %indexer_name, "skipping feed item without title");
            continue;
        };

        let guid = item
            .guid
            .as_ref()
            .and_then(|guid| guid.value.clone())
            .or_else(|| item.link.clone());

        let size_bytes = item
            .size
            .or_else(|| attr_value(&item.attrs, "size").and_then(|raw| raw.parse().ok()))
            .or_else(|| {
                item.enclosure
                    .as_ref()
                    .and_then(|enclosure| enclosure.length.as_deref())
                    .and_then(|raw| raw.parse().ok())
            })
            .filter(|&bytes| bytes > 0);

        let download_url = item
            .enclosure
            .as_ref()
            .and_then(|enclosure| enclosure.url.clone())
            .or_else(|| item.link.clone());

        releases.push(Release {
            title: title.to_string(),
            guid,
            external_ids: ExternalIds {
                tmdb_id: attr_value(&item.attrs, "tmdbid").and_then(|raw| raw.parse().ok()),
                tvdb_id: attr_value(&item.attrs, "tvdbid").and_then(|raw| raw.parse().ok()),
                imdb_id: attr_value(&item.attrs, "imdbid"),
            },
            size_bytes,
            season: attr_value(&item.attrs, "season").and_then(|raw| raw.parse().ok()),
            episode: attr_value(&item.attrs, "episode").and_then(|raw| raw.parse().ok()),
            download_url,
            indexer: indexer_name.to_string(),
            indexer_priority,
        });
    }

    Ok(releases)
}

fn attr_value(attrs: &[TorznabAttr], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| attr.name.eq_ignore_ascii_case(name))
        .map(|attr| attr.value.clone())
}

#[derive(Debug, Deserialize)]
struct RssEnvelope {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssRawItem>,
}

#[derive(Debug, Deserialize)]
struct RssRawItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    guid: Option<RssGuid>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    enclosure: Option<RssEnclosure>,
    #[serde(rename = "attr", alias = "torznab:attr", alias = "newznab:attr", default)]
    attrs: Vec<TorznabAttr>,
}

#[derive(Debug, Deserialize)]
struct RssGuid {
    #[serde(rename = "$text", default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RssEnclosure {
    #[serde(rename = "@url", default)]
    url: Option<String>,
    #[serde(rename = "@length", default)]
    length: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TorznabAttr {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@value")]
    value: String,
}

#[cfg(test)]
mod tests {
    use super::{parse_feed, HttpReleaseFetcher, ReleaseFetcher};
    use grabarr_config::IndexerSeed;
    use grabarr_domain::MediaKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"
        <rss>
            <channel>
                <item>
                    <title>Movie.Title.2020.1080p.WEB-DL</title>
                    <guid isPermaLink="false">abc-123</guid>
                    <link>https://example.org/get/abc</link>
                    <size>4000000000</size>
                    <torznab:attr name="tmdbid" value="949"/>
                </item>
                <item>
                    <title>Show.S01E02.720p.HDTV</title>
                    <guid>def-456</guid>
                    <enclosure url="https://example.org/get/def" length="900000000"/>
                    <torznab:attr name="season" value="1"/>
                    <torznab:attr name="episode" value="2"/>
                    <torznab:attr name="tvdbid" value="79126"/>
                </item>
                <item>
                    <guid>no-title</guid>
                </item>
            </channel>
        </rss>
    "#;

    #[test]
    fn parses_releases_with_torznab_attributes() {
        let releases = parse_feed(FEED, "acme", 5).expect("feed should parse");
        assert_eq!(releases.len(), 2);

        let movie = &releases[0];
        assert_eq!(movie.title, "Movie.Title.2020.1080p.WEB-DL");
        assert_eq!(movie.guid.as_deref(), Some("abc-123"));
        assert_eq!(movie.size_bytes, Some(4_000_000_000));
        assert_eq!(movie.external_ids.tmdb_id, Some(949));
        assert_eq!(movie.download_url.as_deref(), Some("https://example.org/get/abc"));
        assert_eq!(movie.indexer, "acme");
        assert_eq!(movie.indexer_priority, 5);

        let episode = &releases[1];
        assert_eq!(episode.season, Some(1));
        assert_eq!(episode.episode, Some(2));
        assert_eq!(episode.external_ids.tvdb_id, Some(79126));
        assert_eq!(episode.size_bytes, Some(900_000_000));
        assert_eq!(
            episode.download_url.as_deref(),
            Some("https://example.org/get/def")
        );
    }

    #[test]
    fn errors_on_invalid_feed() {
        let result = parse_feed("<rss><broken></rss>", "acme", 0);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn http_fetcher_skips_failing_indexers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/good"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let seeds = vec![
            IndexerSeed {
                name: "bad".into(),
                feed_url: format!("{}/bad", server.uri()),
                priority: 1,
                enabled: true,
            },
            IndexerSeed {
                name: "good".into(),
                feed_url: format!("{}/good", server.uri()),
                priority: 2,
                enabled: true,
            },
            IndexerSeed {
                name: "disabled".into(),
                feed_url: format!("{}/never", server.uri()),
                priority: 3,
                enabled: false,
            },
        ];

        let fetcher = HttpReleaseFetcher::new(reqwest::Client::new(), seeds);
        let releases = fetcher.fetch(MediaKind::Movie).await.unwrap();
        assert_eq!(releases.len(), 2);
        assert!(releases.iter().all(|release| release.indexer == "good"));
    }
}
