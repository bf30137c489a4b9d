use std::path::Path;

use kindlekeep_core::RunSummary;
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "kindlekeep".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Send unread Karakeep bookmarks to your Kindle\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print the outcome of a processing run
pub fn print_summary(summary: &RunSummary, dry_run: bool) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    let heading = if dry_run { "Dry Run Summary" } else { "Run Summary" };
    eprintln!("{}", heading.bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    eprintln!("  {} {}", "Found:".dimmed(), summary.found.to_string().bright_white());
    if dry_run {
        eprintln!();
        return;
    }

    eprintln!("  {} {}", "Processed:".dimmed(), summary.processed.to_string().bright_white());
    eprintln!("  {} {}", "Archived:".dimmed(), summary.archived.to_string().bright_white());
    if summary.failed > 0 {
        eprintln!("  {} {}", "Failed:".dimmed(), summary.failed.to_string().bright_red());
    }

    let images = summary.images;
    eprintln!(
        "  {} {} embedded, {} cached, {} failed",
        "Images:".dimmed(),
        images.embedded.to_string().bright_white(),
        images.cache_hits,
        images.failed
    );

    for path in &summary.delivered {
        eprintln!("  {} {}", "Sent:".dimmed(), file_name(path).bright_white());
    }
    eprintln!();
}

/// Last path component for display
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/tmp/out/a.epub")), "a.epub");
        assert_eq!(file_name(Path::new("/")), "/");
    }
}
