//! MOBI derivation through external tools.
//!
//! Tried in order: Calibre's `ebook-convert` on the HTML, `kindlegen` on the
//! HTML, then `ebook-convert` on an intermediate EPUB.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

use crate::{KindleKeepError, Result};

/// Wall-clock limit for each external conversion.
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(300);

async fn run_tool(program: &str, args: &[&OsStr]) -> Result<Output> {
    let child = Command::new(program).args(args).kill_on_drop(true).output();

    match tokio::time::timeout(TOOL_TIMEOUT, child).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(KindleKeepError::MobiError(format!("{} not available: {}", program, e))),
        Err(_) => Err(KindleKeepError::MobiError(format!(
            "{} timed out after {} seconds",
            program,
            TOOL_TIMEOUT.as_secs()
        ))),
    }
}

async fn ebook_convert(input: &Path, output: &Path, extra: &[&str]) -> Result<()> {
    let mut args: Vec<&OsStr> = vec![input.as_os_str(), output.as_os_str(), OsStr::new("--output-profile"), OsStr::new("kindle")];
    args.extend(extra.iter().map(OsStr::new));

    let result = run_tool("ebook-convert", &args).await?;
    if result.status.success() {
        Ok(())
    } else {
        Err(KindleKeepError::MobiError(format!(
            "ebook-convert failed: {}",
            String::from_utf8_lossy(&result.stderr).trim()
        )))
    }
}

async fn kindlegen(input: &Path, output: &Path) -> Result<()> {
    let name = output.file_name().unwrap_or_default();
    let result = run_tool("kindlegen", &[input.as_os_str(), OsStr::new("-o"), name]).await?;

    // exit code 1 means "built with warnings"
    match result.status.code() {
        Some(0) | Some(1) => Ok(()),
        _ => Err(KindleKeepError::MobiError(format!(
            "kindlegen failed: {}",
            String::from_utf8_lossy(&result.stderr).trim()
        ))),
    }
}

/// Converts an HTML file to MOBI next to it.
pub async fn html_to_mobi(html_path: &Path) -> Result<PathBuf> {
    let mobi_path = html_path.with_extension("mobi");

    match ebook_convert(html_path, &mobi_path, &["--mobi-file-type", "new"]).await {
        Ok(()) => {
            tracing::info!("Converted HTML to MOBI using ebook-convert: {}", mobi_path.display());
            return Ok(mobi_path);
        }
        Err(e) => tracing::warn!("{}", e),
    }

    match kindlegen(html_path, &mobi_path).await {
        Ok(()) => {
            tracing::info!("Converted HTML to MOBI using kindlegen: {}", mobi_path.display());
            return Ok(mobi_path);
        }
        Err(e) => tracing::warn!("{}", e),
    }

    tracing::info!("Trying MOBI conversion via EPUB...");
    let epub_path = super::to_epub(html_path)?;
    let converted = ebook_convert(&epub_path, &mobi_path, &[]).await;
    if converted.is_ok() {
        tracing::info!("Converted EPUB to MOBI: {}", mobi_path.display());
        crate::cleanup::cleanup_file(&epub_path);
    }

    converted.map(|()| mobi_path)
}
