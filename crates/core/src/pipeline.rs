//! The fetch, convert, send and archive run.
//!
//! A [`Processor`] performs one pass over the unarchived bookmarks, either
//! producing one document per bookmark or a single compilation. Per-item
//! failures are logged and counted; they never abort the run. A bookmark is
//! archived only after the document containing it was delivered.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::bookmark::Bookmark;
use crate::cleanup::cleanup_file;
use crate::client::KarakeepClient;
use crate::config::{Config, OutputFormat};
use crate::convert::derive;
use crate::filename::{article_filename, compilation_filename};
use crate::images::{ImageEmbedder, ImageStats};
use crate::mail::Delivery;
use crate::render::{render_article, render_compilation};
use crate::{KindleKeepError, Result};

/// Switches for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Only report what would happen.
    pub dry_run: bool,
    /// One document for all bookmarks instead of one per bookmark.
    pub compilation: bool,
    /// Delete generated files after successful delivery.
    pub cleanup: bool,
    /// Overrides the configured output format.
    pub format: Option<OutputFormat>,
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Unarchived bookmarks returned by the API.
    pub found: usize,
    /// Bookmarks delivered and archived.
    pub processed: usize,
    /// Archive calls that succeeded.
    pub archived: usize,
    /// Bookmarks that were not delivered, or delivered but not archived.
    pub failed: usize,
    /// Documents delivered (paths may be gone after cleanup).
    pub delivered: Vec<PathBuf>,
    pub images: ImageStats,
}

/// Drives a run against the bookmarking API and a delivery channel.
pub struct Processor<D: Delivery> {
    config: Config,
    client: KarakeepClient,
    embedder: ImageEmbedder,
    delivery: D,
}

impl<D: Delivery> Processor<D> {
    pub fn new(config: Config, delivery: D) -> Result<Self> {
        let client = KarakeepClient::new(&config.karakeep, &config.images)?;
        let embedder = ImageEmbedder::new(client.clone(), config.images.max_bytes);

        Ok(Self { config, client, embedder, delivery })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the full pipeline once.
    pub async fn process(&mut self, options: RunOptions) -> Result<RunSummary> {
        tracing::info!("Starting article processing...");

        let bookmarks = self.client.list_unarchived().await?;
        let mut summary = RunSummary { found: bookmarks.len(), ..Default::default() };

        if bookmarks.is_empty() {
            tracing::info!("No unarchived articles found");
            return Ok(summary);
        }

        let format = options.format.unwrap_or_else(|| self.config.output.format());

        if options.compilation {
            self.process_compilation(&bookmarks, format, options, &mut summary).await?;
        } else {
            self.process_individually(&bookmarks, format, options, &mut summary).await?;
        }

        summary.images = self.embedder.stats();
        Ok(summary)
    }

    fn output_dir(&self) -> Result<&Path> {
        let dir = self.config.output.output_dir.as_path();
        fs::create_dir_all(dir)?;
        Ok(dir)
    }

    async fn process_compilation(
        &mut self, bookmarks: &[Bookmark], format: OutputFormat, options: RunOptions, summary: &mut RunSummary,
    ) -> Result<()> {
        tracing::info!("COMPILATION MODE: Creating single document with {} articles", bookmarks.len());

        if options.dry_run {
            tracing::info!("DRY RUN: Would create compilation document with {} articles", bookmarks.len());
            return Ok(());
        }

        let (html_path, document) = match self.build_compilation(bookmarks, format).await {
            Ok(paths) => paths,
            Err(e) => {
                tracing::error!("Failed to create compilation document: {}", e);
                summary.failed = bookmarks.len();
                return Ok(());
            }
        };

        if let Err(e) = self.delivery.send(&document).await {
            tracing::error!("Failed to send compilation document: {}", e);
            summary.failed = bookmarks.len();
            return Ok(());
        }
        summary.delivered.push(document.clone());

        for bookmark in bookmarks {
            if self.archive(bookmark).await {
                summary.archived += 1;
            }
        }
        summary.processed = summary.archived;
        summary.failed = bookmarks.len() - summary.archived;

        tracing::info!("Successfully processed compilation with {} articles", bookmarks.len());
        tracing::info!("Archived {}/{} articles", summary.archived, bookmarks.len());

        if options.cleanup {
            remove_outputs(&document, &html_path);
        }
        Ok(())
    }

    async fn process_individually(
        &mut self, bookmarks: &[Bookmark], format: OutputFormat, options: RunOptions, summary: &mut RunSummary,
    ) -> Result<()> {
        for bookmark in bookmarks {
            let title = bookmark.display_title();
            tracing::info!("Processing article: {}", title);

            if options.dry_run {
                tracing::info!("DRY RUN: Would process article {}", bookmark.id);
                continue;
            }

            let (html_path, document) = match self.build_document(bookmark, format).await {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::error!("Failed to create document for {}: {}", title, e);
                    summary.failed += 1;
                    continue;
                }
            };

            if let Err(e) = self.delivery.send(&document).await {
                tracing::error!("Failed to send article {}: {}", title, e);
                summary.failed += 1;
                continue;
            }
            summary.delivered.push(document.clone());

            if self.archive(bookmark).await {
                summary.archived += 1;
                summary.processed += 1;
                tracing::info!("Successfully processed article: {}", title);

                if options.cleanup {
                    remove_outputs(&document, &html_path);
                }
            } else {
                tracing::warn!("Article sent but not archived: {}", title);
                summary.failed += 1;
            }
        }

        tracing::info!("Processing complete. Successfully processed {} articles.", summary.processed);
        Ok(())
    }

    /// Writes the compilation HTML and derives the configured format.
    async fn build_compilation(&mut self, bookmarks: &[Bookmark], format: OutputFormat) -> Result<(PathBuf, PathBuf)> {
        let now = Local::now();
        let html = render_compilation(bookmarks, &mut self.embedder, now).await?;
        let html_path = self.output_dir()?.join(compilation_filename(bookmarks.len(), now));
        fs::write(&html_path, html)?;
        tracing::info!("Created compilation HTML: {} ({} articles)", html_path.display(), bookmarks.len());

        let document = derive(&html_path, format).await;
        Ok((html_path, document))
    }

    /// Writes the HTML for one bookmark and derives the configured format.
    async fn build_document(&mut self, bookmark: &Bookmark, format: OutputFormat) -> Result<(PathBuf, PathBuf)> {
        let now = Local::now();
        let html = render_article(bookmark, &mut self.embedder, now).await?;
        let html_path = self.output_dir()?.join(article_filename(bookmark, now));
        fs::write(&html_path, html)?;
        tracing::info!("Created HTML file: {}", html_path.display());

        let document = derive(&html_path, format).await;
        Ok((html_path, document))
    }

    async fn archive(&self, bookmark: &Bookmark) -> bool {
        match self.client.archive(&bookmark.id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error archiving article {}: {}", bookmark.id, e);
                false
            }
        }
    }

    /// Sends an existing file, bypassing the bookmark pipeline.
    ///
    /// Returns whether a message was sent.
    pub async fn send_file(&self, path: &Path, dry_run: bool, cleanup: bool) -> Result<bool> {
        if !path.is_file() {
            return Err(KindleKeepError::FileNotFound(path.to_path_buf()));
        }

        if dry_run {
            tracing::info!("DRY RUN: Would send file '{}' to Kindle", path.display());
            return Ok(false);
        }

        self.delivery.send(path).await?;
        if cleanup {
            cleanup_file(path);
        }
        Ok(true)
    }
}

/// Deletes the delivered document and, when different, its HTML source.
fn remove_outputs(document: &Path, html_path: &Path) {
    cleanup_file(document);
    if document != html_path {
        cleanup_file(html_path);
    }
}
