//! Derivation of the delivered document from the unified HTML file.
//!
//! HTML is always written first. Every other format is produced from that
//! file, and a failed derivation degrades to sending the HTML itself.

#[cfg(feature = "epub")]
pub mod epub;
pub mod mobi;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod xhtml;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::OutputFormat;
use crate::images::{collect_image_sources, decode_data_uri, extension_for, replace_image_sources};
use crate::{KindleKeepError, Result};

/// An inline image moved out of the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftedImage {
    /// Reference now used as the `img` source.
    pub key: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Replaces every base64 `data:` image source with `{prefix}_{n}.{ext}` and
/// returns the decoded images. Identical URIs share one key.
pub fn lift_data_uris(html: &str, prefix: &str) -> Result<(String, Vec<LiftedImage>)> {
    let mut replacements = HashMap::new();
    let mut lifted = Vec::new();

    for src in collect_image_sources(html)? {
        if let Some((content_type, bytes)) = decode_data_uri(&src) {
            let key = format!("{}_{}.{}", prefix, lifted.len() + 1, extension_for(&content_type));
            replacements.insert(src, key.clone());
            lifted.push(LiftedImage { key, content_type, bytes });
        }
    }

    Ok((replace_image_sources(html, &replacements)?, lifted))
}

fn to_pdf(html_path: &Path) -> Result<PathBuf> {
    #[cfg(feature = "pdf")]
    {
        pdf::html_to_pdf(html_path)
    }
    #[cfg(not(feature = "pdf"))]
    {
        let _ = html_path;
        Err(KindleKeepError::FormatUnavailable("pdf"))
    }
}

fn to_epub(html_path: &Path) -> Result<PathBuf> {
    #[cfg(feature = "epub")]
    {
        epub::html_to_epub(html_path)
    }
    #[cfg(not(feature = "epub"))]
    {
        let _ = html_path;
        Err(KindleKeepError::FormatUnavailable("epub"))
    }
}

/// Converts an HTML file into `format`, failing on any conversion error.
pub async fn convert_html(html_path: &Path, format: OutputFormat) -> Result<PathBuf> {
    if !html_path.exists() {
        return Err(KindleKeepError::FileNotFound(html_path.to_path_buf()));
    }

    match format {
        OutputFormat::Html => Ok(html_path.to_path_buf()),
        OutputFormat::Pdf => to_pdf(html_path),
        OutputFormat::Epub => to_epub(html_path),
        OutputFormat::Mobi => mobi::html_to_mobi(html_path).await,
    }
}

/// Converts an HTML file into `format`, falling back to the HTML file.
pub async fn derive(html_path: &Path, format: OutputFormat) -> PathBuf {
    match convert_html(html_path, format).await {
        Ok(path) => path,
        Err(e) => {
            tracing::error!("Error converting HTML to {}: {}; sending HTML instead", format, e);
            html_path.to_path_buf()
        }
    }
}
