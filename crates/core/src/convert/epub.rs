//! EPUB derivation with `epub-builder`.
//!
//! Compilations become one chapter per `div.article`; any other document
//! becomes a single chapter made of its body. Inline `data:` images are
//! packaged as separate resources, since several readers refuse data URIs.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Local;
use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ReferenceType, ZipLibrary};
use scraper::{Html, Selector};

use super::xhtml::{fragment_to_xhtml, xhtml_document};
use crate::images::{decode_data_uri, extension_for};
use crate::{KindleKeepError, Result};

const STYLESHEET: &str = "stylesheet.css";

fn epub_err(e: impl std::fmt::Display) -> KindleKeepError {
    KindleKeepError::EpubError(e.to_string())
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| KindleKeepError::HtmlRewriteError(format!("Invalid selector: {}", e)))
}

/// A chapter before XHTML conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub title: String,
    pub html: String,
}

/// Parsed pieces of the unified HTML.
#[derive(Debug, Clone)]
pub struct BookParts {
    pub title: String,
    pub css: String,
    pub chapters: Vec<Chapter>,
}

/// Splits a unified HTML document into title, stylesheet and chapters.
pub fn split_chapters(html: &str, fallback_title: &str) -> Result<BookParts> {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&selector("title")?)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_title.to_string());

    let css = doc
        .select(&selector("style")?)
        .map(|el| el.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");

    let title_selector = selector(".article-title")?;
    let mut chapters: Vec<Chapter> = doc
        .select(&selector("div.article")?)
        .enumerate()
        .map(|(i, el)| Chapter {
            title: el
                .select(&title_selector)
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| format!("Article {}", i + 1)),
            html: el.inner_html(),
        })
        .collect();

    if chapters.is_empty() {
        let body = doc
            .select(&selector("body")?)
            .next()
            .map(|el| el.inner_html())
            .unwrap_or_else(|| html.to_string());
        chapters.push(Chapter { title: title.clone(), html: body });
    }

    Ok(BookParts { title, css, chapters })
}

/// Converts an HTML file to EPUB next to it.
pub fn html_to_epub(html_path: &Path) -> Result<PathBuf> {
    let html = fs::read_to_string(html_path)?;
    let stem = html_path.file_stem().and_then(|s| s.to_str()).unwrap_or("Karakeep");
    let parts = split_chapters(&html, stem)?;

    let mut builder = EpubBuilder::new(ZipLibrary::new().map_err(epub_err)?).map_err(epub_err)?;
    builder.epub_version(EpubVersion::V30);
    builder.metadata("title", parts.title.as_str()).map_err(epub_err)?;
    builder.metadata("lang", "en").map_err(epub_err)?;
    builder.metadata("generator", "kindlekeep").map_err(epub_err)?;
    builder
        .metadata("description", format!("karakeep_{}", Local::now().format("%Y%m%d_%H%M%S")))
        .map_err(epub_err)?;
    builder.stylesheet(parts.css.as_bytes()).map_err(epub_err)?;

    let mut packaged: HashMap<String, String> = HashMap::new();
    let mut resources: Vec<(String, String, Vec<u8>)> = Vec::new();

    let mut chapter_docs = Vec::with_capacity(parts.chapters.len());
    for (i, chapter) in parts.chapters.iter().enumerate() {
        let body = fragment_to_xhtml(&chapter.html, &mut |src| {
            if let Some(path) = packaged.get(src) {
                return Some(path.clone());
            }
            let (content_type, bytes) = decode_data_uri(src)?;
            let path = format!("images/img_{}.{}", resources.len() + 1, extension_for(&content_type));
            packaged.insert(src.to_string(), path.clone());
            resources.push((path.clone(), content_type, bytes));
            Some(path)
        });

        chapter_docs.push((
            format!("chapter_{:03}.xhtml", i + 1),
            chapter.title.clone(),
            xhtml_document(&chapter.title, &body, Some(STYLESHEET)),
        ));
    }

    for (path, content_type, bytes) in &resources {
        builder
            .add_resource(path.as_str(), bytes.as_slice(), content_type.as_str())
            .map_err(epub_err)?;
    }

    for (href, title, doc) in &chapter_docs {
        builder
            .add_content(
                EpubContent::new(href.as_str(), doc.as_bytes())
                    .title(title.as_str())
                    .reftype(ReferenceType::Text),
            )
            .map_err(epub_err)?;
    }

    if chapter_docs.len() > 1 {
        builder.inline_toc();
    }

    let epub_path = html_path.with_extension("epub");
    let mut file = File::create(&epub_path)?;
    builder.generate(&mut file).map_err(epub_err)?;

    tracing::info!(
        chapters = chapter_docs.len(),
        images = resources.len(),
        "Converted HTML to EPUB: {}",
        epub_path.display()
    );
    Ok(epub_path)
}
