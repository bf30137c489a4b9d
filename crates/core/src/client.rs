//! HTTP access to the Karakeep REST API and to external image hosts.
//!
//! [`KarakeepClient`] wraps a single `reqwest::Client` configured with the
//! image timeout and user agent. Requests to the bookmarking API carry the
//! bearer token; requests to third-party hosts never do.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use url::Url;

use crate::bookmark::{Bookmark, BookmarkPage};
use crate::config::{ImageConfig, KarakeepConfig};
use crate::{KindleKeepError, Result};

/// Bytes and declared content type of a fetched resource.
#[derive(Debug, Clone)]
pub struct FetchedBytes {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Client for the bookmarking API.
#[derive(Debug, Clone)]
pub struct KarakeepClient {
    http: Client,
    api_url: String,
    api_key: String,
    timeout: u64,
}

impl KarakeepClient {
    /// Builds a client for the configured API.
    pub fn new(karakeep: &KarakeepConfig, images: &ImageConfig) -> Result<Self> {
        let parsed = Url::parse(&karakeep.api_url).map_err(|e| KindleKeepError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(KindleKeepError::InvalidUrl(
                "API URL must use http:// or https://".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(images.timeout_secs))
            .user_agent(images.user_agent.clone())
            .build()
            .map_err(KindleKeepError::HttpError)?;

        Ok(Self {
            http,
            api_url: karakeep.api_url.trim_end_matches('/').to_string(),
            api_key: karakeep.api_key.clone(),
            timeout: images.timeout_secs,
        })
    }

    /// Base URL of the API without a trailing slash.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// URL of an asset in the asset store.
    pub fn asset_url(&self, asset_id: &str) -> String {
        format!("{}/assets/{}", self.api_url, asset_id)
    }

    /// Lists every unarchived bookmark, newest first.
    ///
    /// Follows `nextCursor` until the API stops returning one. The archived
    /// filter is applied locally as well, since the server-side filter is
    /// only a hint on older API versions.
    pub async fn list_unarchived(&self) -> Result<Vec<Bookmark>> {
        let endpoint = format!("{}/bookmarks", self.api_url);
        let mut cursor: Option<String> = None;
        let mut unarchived = Vec::new();

        loop {
            let mut request = self
                .http
                .get(&endpoint)
                .bearer_auth(&self.api_key)
                .header("Content-Type", "application/json")
                .query(&[("sortOrder", "desc"), ("archived", "false")]);
            if let Some(cursor) = &cursor {
                request = request.query(&[("cursor", cursor.as_str())]);
            }

            let response = request.send().await.map_err(|e| self.map_send_error(e))?;
            let response = check_status(response, &endpoint)?;
            let page: BookmarkPage = response.json().await?;

            tracing::debug!(count = page.bookmarks.len(), cursor = ?cursor, "Fetched bookmark page");
            unarchived.extend(page.bookmarks.into_iter().filter(|bookmark| !bookmark.archived));

            match page.next_cursor {
                Some(next) if !next.is_empty() && cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }

        tracing::info!("Found {} unarchived articles (sorted newest to oldest)", unarchived.len());
        Ok(unarchived)
    }

    /// Downloads an asset from the asset store.
    pub async fn fetch_asset(&self, asset_id: &str) -> Result<FetchedBytes> {
        let endpoint = self.asset_url(asset_id);
        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        read_bytes(check_status(response, &endpoint)?).await
    }

    /// Downloads a resource from a third-party host without credentials.
    pub async fn fetch_external(&self, url: &str) -> Result<FetchedBytes> {
        let parsed = Url::parse(url).map_err(|e| KindleKeepError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(KindleKeepError::InvalidUrl(format!("unsupported scheme in {}", url)));
        }

        let response = self
            .http
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        read_bytes(check_status(response, url)?).await
    }

    /// Marks a bookmark as archived.
    pub async fn archive(&self, bookmark_id: &str) -> Result<()> {
        let endpoint = format!("{}/bookmarks/{}", self.api_url, bookmark_id);
        let response = self
            .http
            .patch(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({ "archived": true }))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        check_status(response, &endpoint)?;
        tracing::info!("Successfully archived article {}", bookmark_id);
        Ok(())
    }

    fn map_send_error(&self, e: reqwest::Error) -> KindleKeepError {
        if e.is_timeout() { KindleKeepError::Timeout { timeout: self.timeout } } else { KindleKeepError::HttpError(e) }
    }
}

fn check_status(response: Response, endpoint: &str) -> Result<Response> {
    let status: StatusCode = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(KindleKeepError::ApiStatus { endpoint: endpoint.to_string(), status: status.as_u16() })
    }
}

async fn read_bytes(response: Response) -> Result<FetchedBytes> {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    let bytes = response.bytes().await?.to_vec();

    Ok(FetchedBytes { bytes, content_type })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn karakeep(url: &str) -> KarakeepConfig {
        KarakeepConfig { api_url: url.to_string(), api_key: "key".to_string() }
    }

    #[test]
    fn test_client_rejects_invalid_url() {
        let result = KarakeepClient::new(&karakeep("not-a-url"), &ImageConfig::default());
        assert!(matches!(result, Err(KindleKeepError::InvalidUrl(_))));
    }

    #[test]
    fn test_client_rejects_non_http_scheme() {
        let result = KarakeepClient::new(&karakeep("ftp://example.org/api"), &ImageConfig::default());
        assert!(matches!(result, Err(KindleKeepError::InvalidUrl(_))));
    }

    #[test]
    fn test_asset_url_trims_trailing_slash() {
        let client = KarakeepClient::new(&karakeep("https://k.example.org/api/v1/"), &ImageConfig::default()).unwrap();
        assert_eq!(client.api_url(), "https://k.example.org/api/v1");
        assert_eq!(client.asset_url("abc"), "https://k.example.org/api/v1/assets/abc");
    }

    #[test]
    fn test_fetch_external_rejects_data_scheme() {
        let client = KarakeepClient::new(&karakeep("https://k.example.org/api/v1"), &ImageConfig::default()).unwrap();
        let result = std::thread::spawn(move || {
            tokio::runtime::Runtime::new()
                .unwrap()
                .block_on(async move { client.fetch_external("data:image/png;base64,AAAA").await })
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(KindleKeepError::InvalidUrl(_))));
    }
}
