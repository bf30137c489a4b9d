//! Image resolution and inlining.
//!
//! Every `<img src>` in an article is resolved to bytes and replaced by a
//! base64 `data:` URI so the generated document is self-contained. Sources
//! that point at the bookmarking API's asset store are fetched from there
//! first; everything else (and every asset store failure) falls back to the
//! original URL. Both outcomes are cached for the whole run, keyed by asset
//! id when known and by URL otherwise.

use std::collections::HashMap;
use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use url::Url;

use crate::client::{FetchedBytes, KarakeepClient};
use crate::{KindleKeepError, Result};

/// Content type used when neither the response nor the URL says otherwise.
pub const FALLBACK_IMAGE_TYPE: &str = "image/jpeg";

static ASSET_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/api(?:/v1)?/assets/([A-Za-z0-9_-]+)/?$").expect("valid asset regex"));

/// Counters for one embedder's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageStats {
    /// Images fetched and inlined.
    pub embedded: usize,
    /// Lookups answered from the cache.
    pub cache_hits: usize,
    /// Images left pointing at their original source.
    pub failed: usize,
    /// Images that already were `data:` URIs.
    pub skipped: usize,
}

/// Resolves image references to `data:` URIs under a byte ceiling.
pub struct ImageEmbedder {
    client: KarakeepClient,
    max_bytes: usize,
    cache: HashMap<String, Option<String>>,
    stats: ImageStats,
}

impl ImageEmbedder {
    pub fn new(client: KarakeepClient, max_bytes: usize) -> Self {
        Self { client, max_bytes, cache: HashMap::new(), stats: ImageStats::default() }
    }

    /// The client used for asset store and external requests.
    pub fn client(&self) -> &KarakeepClient {
        &self.client
    }

    pub fn stats(&self) -> ImageStats {
        self.stats
    }

    /// Number of distinct cache entries, successful or not.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Resolves one image to a `data:` URI.
    ///
    /// The asset store is tried first when `asset_id` is given. An asset that
    /// exceeds the byte ceiling is final: the external URL is not tried,
    /// since it would serve the same oversized image. Failures are cached
    /// as `None` so a broken image is requested once per run.
    pub async fn resolve(&mut self, url: Option<&str>, asset_id: Option<&str>) -> Option<String> {
        let key = match (asset_id, url) {
            (Some(id), _) => id.to_string(),
            (None, Some(url)) => url.to_string(),
            (None, None) => return None,
        };

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Using cached image: {}", key);
            self.stats.cache_hits += 1;
            return cached.clone();
        }

        let resolved = self.fetch_uncached(url, asset_id).await;
        if resolved.is_some() {
            self.stats.embedded += 1;
        } else {
            self.stats.failed += 1;
        }
        self.cache.insert(key, resolved.clone());
        resolved
    }

    async fn fetch_uncached(&self, url: Option<&str>, asset_id: Option<&str>) -> Option<String> {
        if let Some(asset_id) = asset_id {
            match self.client.fetch_asset(asset_id).await {
                Ok(fetched) => {
                    if fetched.bytes.len() > self.max_bytes {
                        tracing::warn!(
                            "Karakeep asset {} too large ({} bytes), skipping",
                            asset_id,
                            fetched.bytes.len()
                        );
                        return None;
                    }
                    let content_type = declared_type(&fetched).unwrap_or_else(|| FALLBACK_IMAGE_TYPE.to_string());
                    tracing::info!("Downloaded Karakeep asset: {} ({} bytes)", asset_id, fetched.bytes.len());
                    return Some(data_uri(&content_type, &fetched.bytes));
                }
                Err(e) => tracing::warn!("Failed to download Karakeep asset {}: {}", asset_id, e),
            }
        }

        let url = url?;
        match self.fetch_external(url).await {
            Ok(uri) => Some(uri),
            Err(e) => {
                tracing::warn!("Failed to download image {}: {}", url, e);
                None
            }
        }
    }

    async fn fetch_external(&self, url: &str) -> Result<String> {
        let fetched = self.client.fetch_external(url).await?;
        if fetched.bytes.len() > self.max_bytes {
            return Err(KindleKeepError::ImageTooLarge { size: fetched.bytes.len(), limit: self.max_bytes });
        }

        let content_type = declared_type(&fetched)
            .filter(|ct| ct.starts_with("image/"))
            .or_else(|| guess_type(url))
            .unwrap_or_else(|| FALLBACK_IMAGE_TYPE.to_string());

        tracing::info!("Downloaded external image: {} ({} bytes)", url, fetched.bytes.len());
        Ok(data_uri(&content_type, &fetched.bytes))
    }

    /// Inlines every image of an HTML fragment.
    ///
    /// Relative sources are resolved against `base_url` (the article's own
    /// URL). Images that cannot be resolved keep their original tag.
    pub async fn embed_images(&mut self, html: &str, base_url: Option<&str>) -> Result<String> {
        if html.trim().is_empty() {
            return Ok(html.to_string());
        }

        let base = base_url.and_then(|u| Url::parse(u).ok());
        let sources = collect_image_sources(html)?;
        if sources.is_empty() {
            return Ok(html.to_string());
        }

        tracing::info!("Processing {} images for embedding...", sources.len());

        let mut replacements = HashMap::new();
        for src in sources {
            if src.trim_start().starts_with("data:") {
                self.stats.skipped += 1;
                continue;
            }

            let Some(absolute) = absolutize(&src, base.as_ref()) else {
                tracing::warn!("Cannot resolve relative image source {}", src);
                self.stats.failed += 1;
                continue;
            };
            let asset_id = self.asset_id_for(&absolute);

            if let Some(uri) = self.resolve(Some(&absolute), asset_id.as_deref()).await {
                replacements.insert(src, uri);
            }
        }

        replace_image_sources(html, &replacements)
    }

    /// Recognizes references into the asset store.
    ///
    /// Only URLs on the configured API's origin count. An `/api/assets/{id}`
    /// path on any other host is an ordinary external image.
    fn asset_id_for(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/assets/", self.client.api_url());
        if let Some(rest) = url.strip_prefix(&prefix) {
            let id = rest.trim_end_matches('/');
            if !id.is_empty() && !id.contains('/') {
                return Some(id.to_string());
            }
        }

        let parsed = Url::parse(url).ok()?;
        let api = Url::parse(self.client.api_url()).ok()?;
        if parsed.origin() != api.origin() {
            return None;
        }

        ASSET_PATH
            .captures(parsed.path())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Builds a base64 `data:` URI.
pub fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

/// Splits a base64 `data:` URI into content type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.trim().strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let content_type = meta.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    let content_type = if content_type.is_empty() { FALLBACK_IMAGE_TYPE } else { content_type };

    Some((content_type.to_string(), bytes))
}

/// File extension for an image content type.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/bmp" => "bmp",
        "image/avif" => "avif",
        _ => "jpg",
    }
}

fn declared_type(fetched: &FetchedBytes) -> Option<String> {
    fetched
        .content_type
        .as_deref()
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_lowercase())
        .filter(|ct| !ct.is_empty())
}

fn guess_type(url: &str) -> Option<String> {
    let path = Url::parse(url).map(|u| u.path().to_string()).unwrap_or_else(|_| url.to_string());
    mime_guess::from_path(path)
        .first_raw()
        .filter(|ct| ct.starts_with("image/"))
        .map(str::to_string)
}

fn absolutize(src: &str, base: Option<&Url>) -> Option<String> {
    let src = src.trim().replace("&amp;", "&");
    match Url::parse(&src) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.and_then(|b| b.join(&src).ok()).map(|u| u.to_string()),
        Err(_) => None,
    }
}

/// Returns every distinct `img` source in document order.
pub fn collect_image_sources(html: &str) -> Result<Vec<String>> {
    let mut sources: Vec<String> = Vec::new();
    {
        let mut rewriter = lol_html::HtmlRewriter::new(
            lol_html::Settings {
                element_content_handlers: vec![lol_html::element!("img[src]", |el| {
                    if let Some(src) = el.get_attribute("src")
                        && !src.trim().is_empty()
                        && !sources.contains(&src)
                    {
                        sources.push(src);
                    }
                    Ok(())
                })],
                ..Default::default()
            },
            |_: &[u8]| {},
        );

        rewriter
            .write(html.as_bytes())
            .map_err(|e| KindleKeepError::HtmlRewriteError(e.to_string()))?;
        rewriter.end().map_err(|e| KindleKeepError::HtmlRewriteError(e.to_string()))?;
    }

    Ok(sources)
}

/// Swaps `img` sources according to `replacements`, dropping `srcset` on
/// every image that was replaced.
pub fn replace_image_sources(html: &str, replacements: &HashMap<String, String>) -> Result<String> {
    if replacements.is_empty() {
        return Ok(html.to_string());
    }

    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("img[src]", |el| {
                if let Some(src) = el.get_attribute("src")
                    && let Some(uri) = replacements.get(&src)
                {
                    el.set_attribute("src", uri)?;
                    el.remove_attribute("srcset");
                }
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| KindleKeepError::HtmlRewriteError(e.to_string()))?;
    rewriter.end().map_err(|e| KindleKeepError::HtmlRewriteError(e.to_string()))?;

    String::from_utf8(output).map_err(|e| KindleKeepError::HtmlRewriteError(e.to_string()))
}
