pub mod bookmark;
pub mod cleanup;
pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod filename;
pub mod images;
pub mod mail;
pub mod pipeline;
pub mod render;
pub mod setup;

pub use bookmark::{Bookmark, BookmarkAsset, BookmarkContent, BookmarkPage, ContentKind};
pub use cleanup::{cleanup_file, cleanup_output_directory};
pub use client::{FetchedBytes, KarakeepClient};
pub use config::{CONFIG_FILE, Config, ImageConfig, KarakeepConfig, KindleConfig, OutputConfig, OutputFormat};
pub use convert::{convert_html, derive};
pub use error::{KindleKeepError, Result};
pub use filename::{article_filename, compilation_filename};
pub use images::{ImageEmbedder, ImageStats};
pub use mail::{Delivery, SmtpDelivery};
pub use pipeline::{Processor, RunOptions, RunSummary};
#[doc(hidden)]
pub use render::escape_html;
pub use render::{render_article, render_compilation};
pub use setup::{Prompter, run_setup};
