//! Bookmark wire types returned by the Karakeep REST API.
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! payload is ignored. Missing fields fall back to their defaults so partial
//! or older API responses still deserialize.

use serde::{Deserialize, Serialize};

use crate::render::escape_html;

/// Display fallback when neither the bookmark nor its content has a title.
pub const UNTITLED: &str = "Untitled Article";

/// Display fallback for a missing author.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// One saved bookmark.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Bookmark {
    pub id: String,
    pub archived: bool,
    /// User-assigned title, which overrides the crawled one.
    pub title: Option<String>,
    pub content: BookmarkContent,
    pub assets: Vec<BookmarkAsset>,
}

/// Kind of payload a bookmark carries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Link,
    Text,
    Asset,
    #[serde(other)]
    Unknown,
}

/// Crawled or user-provided content of a bookmark.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmarkContent {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub html_content: Option<String>,
    pub url: Option<String>,
    /// Body of a plain-text bookmark.
    pub text: Option<String>,
    /// Lead image as crawled.
    pub image_url: Option<String>,
    /// Lead image as stored in the asset store.
    pub image_asset_id: Option<String>,
    /// Uploaded file of an asset bookmark.
    pub asset_id: Option<String>,
    /// `image` or `pdf` for asset bookmarks.
    pub asset_type: Option<String>,
    pub source_url: Option<String>,
}

/// Asset attached to a bookmark (screenshots, banner images, archives).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmarkAsset {
    pub id: String,
    pub asset_type: String,
}

/// One page of `GET /bookmarks`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmarkPage {
    pub bookmarks: Vec<Bookmark>,
    pub next_cursor: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl Bookmark {
    /// Title shown in documents and file names.
    pub fn display_title(&self) -> &str {
        non_empty(self.title.as_ref())
            .or_else(|| non_empty(self.content.title.as_ref()))
            .unwrap_or(UNTITLED)
    }

    /// Raw author, if the crawler found one.
    pub fn author(&self) -> Option<&str> {
        non_empty(self.content.author.as_ref())
    }

    /// Author for display, with the `Unknown Author` fallback.
    pub fn display_author(&self) -> &str {
        self.author().unwrap_or(UNKNOWN_AUTHOR)
    }

    pub fn publisher(&self) -> Option<&str> {
        non_empty(self.content.publisher.as_ref())
    }

    /// Original location of the content.
    pub fn source_url(&self) -> Option<&str> {
        non_empty(self.content.url.as_ref()).or_else(|| non_empty(self.content.source_url.as_ref()))
    }

    /// Lead image: asset id (preferred) and crawled URL (fallback).
    pub fn lead_image(&self) -> Option<(Option<&str>, Option<&str>)> {
        let asset_id = non_empty(self.content.image_asset_id.as_ref()).or_else(|| {
            self.assets
                .iter()
                .find(|asset| asset.asset_type == "bannerImage")
                .map(|asset| asset.id.as_str())
        });
        let url = non_empty(self.content.image_url.as_ref());

        if asset_id.is_none() && url.is_none() { None } else { Some((asset_id, url)) }
    }

    /// Body markup for the document, before image embedding.
    ///
    /// `asset_url` maps an asset id to the URL the embedder will recognize as
    /// an asset store reference.
    pub fn body_html(&self, asset_url: impl Fn(&str) -> String) -> String {
        match self.content.kind {
            ContentKind::Text => text_to_html(self.content.text.as_deref().unwrap_or_default()),
            ContentKind::Asset => match (self.content.asset_type.as_deref(), non_empty(self.content.asset_id.as_ref())) {
                (Some("image"), Some(id)) => {
                    format!(
                        r#"<img src="{}" alt="{}">"#,
                        escape_html(&asset_url(id)),
                        escape_html(self.display_title())
                    )
                }
                (_, Some(id)) => format!(
                    r#"<p>Attached file: <a href="{0}">{0}</a></p>"#,
                    escape_html(&asset_url(id))
                ),
                _ => String::new(),
            },
            ContentKind::Link | ContentKind::Unknown => self
                .content
                .html_content
                .clone()
                .or_else(|| self.content.text.as_deref().map(text_to_html))
                .unwrap_or_default(),
        }
    }
}

/// Renders plain text as escaped paragraphs, one per blank-line block.
fn text_to_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| format!("<p>{}</p>", escape_html(block).replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK_BOOKMARK: &str = r#"{
        "id": "bm1",
        "createdAt": "2025-01-02T03:04:05.000Z",
        "title": null,
        "archived": false,
        "favourited": false,
        "content": {
            "type": "link",
            "url": "https://blog.example.org/post",
            "title": "A Post",
            "author": "Jane Doe",
            "publisher": "Example Blog",
            "imageUrl": "https://blog.example.org/lead.png",
            "imageAssetId": "asset-lead",
            "htmlContent": "<p>Hello</p>"
        },
        "assets": [{"id": "asset-lead", "assetType": "bannerImage"}],
        "tags": []
    }"#;

    fn asset_url(id: &str) -> String {
        format!("https://k.example.org/api/v1/assets/{}", id)
    }

    #[test]
    fn test_deserialize_link_bookmark() {
        let bookmark: Bookmark = serde_json::from_str(LINK_BOOKMARK).unwrap();
        assert_eq!(bookmark.id, "bm1");
        assert!(!bookmark.archived);
        assert_eq!(bookmark.content.kind, ContentKind::Link);
        assert_eq!(bookmark.display_title(), "A Post");
        assert_eq!(bookmark.display_author(), "Jane Doe");
        assert_eq!(bookmark.publisher(), Some("Example Blog"));
        assert_eq!(bookmark.source_url(), Some("https://blog.example.org/post"));
        assert_eq!(
            bookmark.lead_image(),
            Some((Some("asset-lead"), Some("https://blog.example.org/lead.png")))
        );
        assert_eq!(bookmark.body_html(asset_url), "<p>Hello</p>");
    }

    #[test]
    fn test_missing_fields_use_fallbacks() {
        let bookmark: Bookmark = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert_eq!(bookmark.display_title(), UNTITLED);
        assert_eq!(bookmark.display_author(), UNKNOWN_AUTHOR);
        assert_eq!(bookmark.publisher(), None);
        assert_eq!(bookmark.lead_image(), None);
        assert_eq!(bookmark.body_html(asset_url), "");
    }

    #[test]
    fn test_user_title_overrides_crawled_title() {
        let bookmark = Bookmark {
            title: Some("Mine".to_string()),
            content: BookmarkContent { title: Some("Crawled".to_string()), ..Default::default() },
            ..Default::default()
        };
        assert_eq!(bookmark.display_title(), "Mine");
    }

    #[test]
    fn test_text_bookmark_is_escaped() {
        let bookmark: Bookmark = serde_json::from_str(
            r#"{"id": "t", "content": {"type": "text", "text": "a < b\nline two\n\nsecond"}}"#,
        )
        .unwrap();
        assert_eq!(
            bookmark.body_html(asset_url),
            "<p>a &lt; b<br>line two</p>\n<p>second</p>"
        );
    }

    #[test]
    fn test_image_asset_bookmark_points_at_asset_store() {
        let bookmark: Bookmark = serde_json::from_str(
            r#"{"id": "i", "content": {"type": "asset", "assetType": "image", "assetId": "abc"}}"#,
        )
        .unwrap();
        let html = bookmark.body_html(asset_url);
        assert!(html.contains(r#"src="https://k.example.org/api/v1/assets/abc""#));
    }

    #[test]
    fn test_unknown_content_type() {
        let bookmark: Bookmark =
            serde_json::from_str(r#"{"id": "u", "content": {"type": "video", "htmlContent": "<p>v</p>"}}"#).unwrap();
        assert_eq!(bookmark.content.kind, ContentKind::Unknown);
        assert_eq!(bookmark.body_html(asset_url), "<p>v</p>");
    }

    #[test]
    fn test_page_with_cursor() {
        let page: BookmarkPage =
            serde_json::from_str(r#"{"bookmarks": [{"id": "a"}], "nextCursor": "c2"}"#).unwrap();
        assert_eq!(page.bookmarks.len(), 1);
        assert_eq!(page.next_cursor.as_deref(), Some("c2"));
    }
}
