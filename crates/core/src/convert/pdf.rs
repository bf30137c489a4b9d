//! PDF derivation through printpdf's HTML layout engine.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use printpdf::{Base64OrRaw, GeneratePdfOptions, PdfDocument, PdfSaveOptions};

use super::lift_data_uris;
use crate::{KindleKeepError, Result};

/// Converts an HTML file to PDF next to it.
///
/// The layout engine resolves images by key rather than by URI, so inline
/// `data:` images are moved into the image table first.
pub fn html_to_pdf(html_path: &Path) -> Result<PathBuf> {
    let html = fs::read_to_string(html_path)?;
    let (html, lifted) = lift_data_uris(&html, "img")?;

    let images: BTreeMap<String, Base64OrRaw> = lifted
        .into_iter()
        .map(|image| (image.key, Base64OrRaw::Raw(image.bytes)))
        .collect();
    let fonts = BTreeMap::new();

    let mut warnings = Vec::new();
    let doc = PdfDocument::from_html(&html, &images, &fonts, &GeneratePdfOptions::default(), &mut warnings)
        .map_err(|e| KindleKeepError::PdfError(e.to_string()))?;
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);

    if !warnings.is_empty() {
        tracing::debug!(count = warnings.len(), "PDF layout produced warnings");
    }

    let pdf_path = html_path.with_extension("pdf");
    fs::write(&pdf_path, bytes)?;
    tracing::info!("Converted HTML to PDF: {}", pdf_path.display());
    Ok(pdf_path)
}
