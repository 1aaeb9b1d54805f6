// SPDX-License-Identifier: GPL-3.0-or-later

//! Grab-submission edge.
//!
//! The orchestrator hands an approved release to a [`GrabClient`] and only
//! consumes the boolean outcome; queue management stays with the download
//! client itself.

use async_trait::async_trait;
use grabarr_config::DownloadClientConfig;
use grabarr_domain::{MediaKind, Release};
use reqwest::{Client, Url};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DownloadClientError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("authentication failed")]
    Authentication,
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("download client responded with status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("release '{0}' has no download url")]
    NoDownloadUrl(String),
}

#[async_trait]
pub trait GrabClient: Send + Sync {
    async fn test_connection(&self) -> Result<(), DownloadClientError>;

    /// Submit one approved release. Success means the client accepted the
    /// queue entry; anything else is a per-candidate failure the cycle
    /// survives.
    async fn submit(&self, release: &Release, kind: MediaKind) -> Result<(), DownloadClientError>;
}

/// qBittorrent WebUI v2 adapter.
pub struct QBittorrentClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    movie_category: String,
    series_category: String,
}

impl QBittorrentClient {
    pub fn new(client: Client, base_url: String, config: &DownloadClientConfig) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            movie_category: config.movie_category.clone(),
            series_category: config.series_category.clone(),
        }
    }

    fn category_for(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Movie => &self.movie_category,
            MediaKind::Series => &self.series_category,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, DownloadClientError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|error| DownloadClientError::InvalidBaseUrl(error.to_string()))
    }

    async fn authenticate_if_configured(&self) -> Result<(), DownloadClientError> {
        let Some(username) = self.username.as_deref() else {
            return Ok(());
        };
        let Some(password) = self.password.as_deref() else {
            return Ok(());
        };

        let url = self.endpoint("/api/v2/auth/login")?;
        let response = self
            .client
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|error| DownloadClientError::Request(error.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| DownloadClientError::Request(error.to_string()))?;

        if !status.is_success() {
            return Err(DownloadClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim() != "Ok." {
            return Err(DownloadClientError::Authentication);
        }

        Ok(())
    }

    async fn post_form(
        &self,
        path: &str,
        form: &HashMap<&str, String>,
    ) -> Result<(), DownloadClientError> {
        self.authenticate_if_configured().await?;
        let url = self.endpoint(path)?;

        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|error| DownloadClientError::Request(error.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| DownloadClientError::Request(error.to_string()))?;

        if !status.is_success() {
            return Err(DownloadClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl GrabClient for QBittorrentClient {
    async fn test_connection(&self) -> Result<(), DownloadClientError> {
        self.authenticate_if_configured().await?;
        let url = self.endpoint("/api/v2/app/version")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| DownloadClientError::Request(error.to_string()))?;

        if !response.status().is_success() {
            return Err(DownloadClientError::HttpStatus {
                status: response.status().as_u16(),
                body: response
                    .text()
                    .await
                    .map_err(|error| DownloadClientError::Request(error.to_string()))?,
            });
        }

        Ok(())
    }

    async fn submit(&self, release: &Release, kind: MediaKind) -> Result<(), DownloadClientError> {
        let Some(download_url) = release.download_url.as_deref() else {
            return Err(DownloadClientError::NoDownloadUrl(release.title.clone()));
        };

        debug!(
            target: "download_clients",
            title = %release.title,
            category = %self.category_for(kind),
            "submitting release to qbittorrent"
        );

        let mut form = HashMap::new();
        form.insert("urls", download_url.to_string());
        form.insert("category", self.category_for(kind).to_string());

        self.post_form("/api/v2/torrents/add", &form).await
    }
}
