//! Assembly of the unified HTML documents.
//!
//! Two layouts exist: a standalone page for a single bookmark and a
//! compilation with cover, table of contents and one section per bookmark.
//! Every compilation section is a `div.article` with an `article-{n}` id,
//! which the EPUB converter relies on to split chapters.

use chrono::{DateTime, Local};

use crate::Result;
use crate::bookmark::Bookmark;
use crate::images::ImageEmbedder;

/// Title of a compilation document.
pub const COMPILATION_TITLE: &str = "Karakeep Articles";

const ARTICLE_CSS: &str = r#"
        body { font-family: Georgia, serif; line-height: 1.6; margin: 40px; max-width: 800px; }
        h1 { color: #333; border-bottom: 2px solid #333; }
        .meta { color: #666; font-style: italic; margin-bottom: 20px; }
        .content { margin-top: 20px; }
        .main-image { text-align: center; margin: 20px 0; }
        img { max-width: 100%; height: auto; display: block; margin: 10px auto; }
        a { color: #0066cc; }
        figure { margin: 20px 0; text-align: center; }
        figcaption { font-style: italic; color: #666; margin-top: 5px; }
        table { border-collapse: collapse; width: 100%; margin: 20px 0; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #f2f2f2; }
        blockquote { border-left: 4px solid #ccc; margin: 20px 0; padding-left: 20px; font-style: italic; }
        pre { background-color: #f4f4f4; padding: 15px; border-radius: 5px; overflow-x: auto; }
        code { background-color: #f4f4f4; padding: 2px 4px; border-radius: 3px; }
"#;

const COMPILATION_CSS: &str = r#"
        body { font-family: Georgia, serif; line-height: 1.6; max-width: 1000px; margin: 0 auto; padding: 20px; }
        .cover { text-align: center; margin-bottom: 3em; padding: 2em; border-bottom: 3px solid #333; }
        .cover h1 { font-size: 2.5em; color: #333; margin-bottom: 0.5em; }
        .cover p { color: #666; font-size: 1.1em; }
        .toc { background-color: #f9f9f9; padding: 1.5em; margin-bottom: 2em; border-radius: 5px; }
        .toc h2 { margin-top: 0; color: #333; }
        .toc ul { list-style-type: none; padding-left: 0; }
        .toc li { margin-bottom: 0.5em; }
        .toc a { color: #0066cc; text-decoration: none; }
        .article { margin-bottom: 3em; padding-bottom: 2em; border-bottom: 1px solid #eee; }
        .article-title { font-size: 1.8em; color: #333; border-bottom: 2px solid #333; padding-bottom: 0.5em; margin-bottom: 1em; }
        .article-meta { background-color: #f9f9f9; padding: 1em; margin-bottom: 1.5em; border-left: 4px solid #ccc; color: #666; }
        .article-content { margin-top: 1em; }
        .main-image { text-align: center; margin: 1em 0; }
        img { max-width: 100%; height: auto; display: block; margin: 1em auto; }
        figure { margin: 1.5em 0; text-align: center; }
        figcaption { font-style: italic; color: #666; margin-top: 0.5em; }
        blockquote { border-left: 4px solid #ccc; margin: 1.5em 0; padding-left: 1em; font-style: italic; }
        pre { background-color: #f4f4f4; padding: 1em; border-radius: 5px; overflow-x: auto; }
        code { background-color: #f4f4f4; padding: 0.2em 0.4em; border-radius: 3px; }
        table { border-collapse: collapse; width: 100%; margin: 1em 0; }
        th, td { border: 1px solid #ddd; padding: 0.5em; text-align: left; }
        th { background-color: #f2f2f2; }
"#;

/// Escapes text for use in HTML content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Lead image block and body of a bookmark, with all images inlined.
///
/// Rewriting failures are logged and the raw body is used instead.
async fn embedded_parts(bookmark: &Bookmark, embedder: &mut ImageEmbedder) -> (String, String) {
    let body = bookmark.body_html(|id| embedder.client().asset_url(id));
    let lead = lead_image(bookmark, &body, embedder).await.unwrap_or_default();
    (lead, embedded_body(bookmark, body, embedder).await)
}

async fn embedded_body(bookmark: &Bookmark, body: String, embedder: &mut ImageEmbedder) -> String {
    match embedder.embed_images(&body, bookmark.source_url()).await {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!("Image embedding failed for {}: {}", bookmark.display_title(), e);
            body
        }
    }
}

/// Lead image block, unless the body already shows that picture.
async fn lead_image(bookmark: &Bookmark, body: &str, embedder: &mut ImageEmbedder) -> Option<String> {
    let (asset_id, url) = bookmark.lead_image()?;
    if let Some(url) = url
        && body.contains(url)
    {
        return None;
    }

    let uri = embedder.resolve(url, asset_id).await?;
    Some(format!(
        r#"<div class="main-image"><img src="{}" alt="{}"></div>"#,
        uri,
        escape_html(bookmark.display_title())
    ))
}

fn meta_paragraphs(bookmark: &Bookmark) -> String {
    let url = bookmark.source_url().unwrap_or_default();
    format!(
        r#"<p><strong>Author:</strong> {}</p>
            <p><strong>Publisher:</strong> {}</p>
            <p><strong>Source:</strong> <a href="{url}">{url}</a></p>"#,
        escape_html(bookmark.display_author()),
        escape_html(bookmark.publisher().unwrap_or_default()),
        url = escape_html(url),
    )
}

/// Renders one bookmark as a standalone HTML page.
pub async fn render_article(
    bookmark: &Bookmark, embedder: &mut ImageEmbedder, retrieved: DateTime<Local>,
) -> Result<String> {
    let title = escape_html(bookmark.display_title());
    let (lead, body) = embedded_parts(bookmark, embedder).await;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <h1>{title}</h1>
    <div class="meta">
            {meta}
            <p><strong>Retrieved:</strong> {retrieved}</p>
    </div>
    {lead}
    <div class="content">
        {body}
    </div>
</body>
</html>"#,
        css = ARTICLE_CSS,
        meta = meta_paragraphs(bookmark),
        retrieved = retrieved.format("%Y-%m-%d %H:%M:%S"),
    ))
}

/// Renders all bookmarks into one document with cover and table of contents.
///
/// Sections are numbered from 1 in the order given.
pub async fn render_compilation(
    bookmarks: &[Bookmark], embedder: &mut ImageEmbedder, generated: DateTime<Local>,
) -> Result<String> {
    tracing::info!("Creating compilation HTML with {} articles...", bookmarks.len());

    let mut html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <div class="cover">
        <h1>{title}</h1>
        <p>Collection of saved articles</p>
        <p>Generated on {date}</p>
        <p>{count} articles</p>
    </div>

    <div class="toc">
        <h2>Table of Contents</h2>
        <ul>
"#,
        title = COMPILATION_TITLE,
        css = COMPILATION_CSS,
        date = generated.format("%B %d, %Y"),
        count = bookmarks.len(),
    );

    for (i, bookmark) in bookmarks.iter().enumerate() {
        let n = i + 1;
        html.push_str(&format!(
            "            <li><a href=\"#article-{n}\">{n}. {}</a></li>\n",
            escape_html(bookmark.display_title())
        ));
    }
    html.push_str("        </ul>\n    </div>\n");

    for (i, bookmark) in bookmarks.iter().enumerate() {
        let n = i + 1;
        let title = bookmark.display_title();
        tracing::info!(
            "Processing article {}/{}: {}...",
            n,
            bookmarks.len(),
            title.chars().take(50).collect::<String>()
        );

        let (lead, body) = embedded_parts(bookmark, embedder).await;

        html.push_str(&format!(
            r#"
    <div class="article" id="article-{n}">
        <h1 class="article-title">{title}</h1>
        <div class="article-meta">
            {meta}
        </div>
        {lead}
        <div class="article-content">
            {body}
        </div>
    </div>
"#,
            title = escape_html(title),
            meta = meta_paragraphs(bookmark),
        ));
    }

    html.push_str("</body>\n</html>\n");
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmark::BookmarkContent;
    use crate::client::KarakeepClient;
    use crate::config::{ImageConfig, KarakeepConfig};
    use chrono::TimeZone;

    fn embedder() -> ImageEmbedder {
        let client = KarakeepClient::new(
            &KarakeepConfig { api_url: "https://k.example.org/api/v1".to_string(), api_key: "k".to_string() },
            &ImageConfig::default(),
        )
        .unwrap();
        ImageEmbedder::new(client, 1024)
    }

    fn bookmark(id: &str, title: &str, html: &str) -> Bookmark {
        Bookmark {
            id: id.to_string(),
            content: BookmarkContent {
                title: Some(title.to_string()),
                author: Some("Ann".to_string()),
                url: Some(format!("https://e.org/{}", id)),
                html_content: Some(html.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[tokio::test]
    async fn test_render_article() {
        let mut embedder = embedder();
        let bm = bookmark("a", "Fish & Chips", "<p>Body text</p>");

        let html = render_article(&bm, &mut embedder, at()).await.unwrap();
        assert!(html.contains("<title>Fish &amp; Chips</title>"));
        assert!(html.contains("<h1>Fish &amp; Chips</h1>"));
        assert!(html.contains("<strong>Author:</strong> Ann"));
        assert!(html.contains(r#"<a href="https://e.org/a">https://e.org/a</a>"#));
        assert!(html.contains("Retrieved:</strong> 2025-03-09 14:05:07"));
        assert!(html.contains("<p>Body text</p>"));
    }

    #[tokio::test]
    async fn test_render_compilation_structure() {
        let mut embedder = embedder();
        let bookmarks = vec![bookmark("a", "First", "<p>one</p>"), bookmark("b", "Second <2>", "<p>two</p>")];

        let html = render_compilation(&bookmarks, &mut embedder, at()).await.unwrap();
        assert!(html.contains("Generated on March 09, 2025"));
        assert!(html.contains("<p>2 articles</p>"));
        assert!(html.contains(r##"<a href="#article-1">1. First</a>"##));
        assert!(html.contains(r##"<a href="#article-2">2. Second &lt;2&gt;</a>"##));
        assert!(html.contains(r#"<div class="article" id="article-1">"#));
        assert!(html.contains(r#"<div class="article" id="article-2">"#));
        assert!(html.find("<p>one</p>").unwrap() < html.find("<p>two</p>").unwrap());
    }

    #[tokio::test]
    async fn test_render_compilation_empty() {
        let mut embedder = embedder();
        let html = render_compilation(&[], &mut embedder, at()).await.unwrap();
        assert!(html.contains("<p>0 articles</p>"));
        assert!(!html.contains("class=\"article\""));
    }
}
