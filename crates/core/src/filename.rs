//! Output file naming.

use chrono::{DateTime, Local};

use crate::bookmark::{Bookmark, UNKNOWN_AUTHOR};

const TITLE_CHARS: usize = 60;
const AUTHOR_CHARS: usize = 30;
const PUBLISHER_CHARS: usize = 25;
const STEM_CHARS: usize = 120;

/// Keeps alphanumerics, spaces and the `extra` characters, then collapses
/// whitespace.
fn clean(text: &str, extra: &[char]) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || extra.contains(c))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect::<String>().trim_end().to_string()
}

/// Descriptive, filesystem-safe stem for a single bookmark:
/// `Title - by Author - (Publisher)`.
pub fn article_stem(bookmark: &Bookmark) -> String {
    let mut parts = Vec::new();

    let title = truncate(&clean(bookmark.display_title(), &['-', '_', '.']), TITLE_CHARS);
    parts.push(if title.is_empty() { "Article".to_string() } else { title });

    let author = bookmark.author().filter(|a| *a != UNKNOWN_AUTHOR);
    if let Some(author) = author {
        let cleaned = clean(author, &['-', '_']);
        if !cleaned.is_empty() {
            parts.push(format!("by {}", truncate(&cleaned, AUTHOR_CHARS)));
        }
    }

    if let Some(publisher) = bookmark.publisher()
        && Some(publisher) != bookmark.author()
    {
        let cleaned = clean(publisher, &['-', '_']);
        if cleaned.chars().count() > 2 {
            parts.push(format!("({})", truncate(&cleaned, PUBLISHER_CHARS)));
        }
    }

    truncate(&parts.join(" - "), STEM_CHARS)
}

/// HTML file name for a single bookmark, with a timestamp suffix.
pub fn article_filename(bookmark: &Bookmark, now: DateTime<Local>) -> String {
    format!("{}_{}.html", article_stem(bookmark), now.format("%Y%m%d_%H%M%S"))
}

/// HTML file name for a compilation.
pub fn compilation_filename(count: usize, now: DateTime<Local>) -> String {
    format!(
        "Karakeep {} at {} - {} Articles -.html",
        now.format("%Y-%m-%d"),
        now.format("%H%M"),
        count
    )
}
