//! JSON configuration file handling.
//!
//! The configuration lives in a single JSON document (default `config.json`)
//! with one section per collaborator: the bookmarking API, the Kindle mail
//! route, the output settings and the image fetch limits.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{KindleKeepError, Result};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "config.json";

/// Default log file name, relative to the working directory.
pub const LOG_FILE: &str = "kindlekeep.log";

/// Document format sent to the Kindle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Self-contained HTML with inlined images.
    Html,
    /// PDF rendered from the HTML.
    #[default]
    Pdf,
    /// EPUB with one chapter per article.
    Epub,
    /// MOBI produced by external Calibre/kindlegen tools.
    Mobi,
}

impl OutputFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Epub => "epub",
            Self::Mobi => "mobi",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" | "htm" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            "epub" => Ok(Self::Epub),
            "mobi" => Ok(Self::Mobi),
            _ => Err(format!("Invalid format: {}. Valid options: pdf, epub, html, mobi", s)),
        }
    }
}

/// Bookmarking service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KarakeepConfig {
    /// Base URL of the REST API, e.g. `https://bookmarks.example.org/api/v1`.
    pub api_url: String,
    /// Bearer token.
    pub api_key: String,
}

impl Default for KarakeepConfig {
    fn default() -> Self {
        Self { api_url: "https://karakeep.example.com/api/v1".to_string(), api_key: String::new() }
    }
}

/// Kindle address and the SMTP account used to reach it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KindleConfig {
    /// Send-to-Kindle address (usually `@kindle.com`).
    pub email: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    /// Also used as the From address.
    pub smtp_user: String,
    pub smtp_password: String,
}

impl Default for KindleConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_user: String::new(),
            smtp_password: String::new(),
        }
    }
}

/// Where and how documents are written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// Kept as free text so an unknown value degrades to HTML instead of
    /// rejecting the whole file.
    pub format: String,
    pub output_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: "pdf".to_string(), output_dir: PathBuf::from("./output") }
    }
}

impl OutputConfig {
    /// Parsed output format; unknown values fall back to HTML.
    pub fn format(&self) -> OutputFormat {
        match self.format.parse() {
            Ok(format) => format,
            Err(_) => {
                tracing::warn!(format = %self.format, "Unknown output format, producing HTML");
                OutputFormat::Html
            }
        }
    }
}

/// Limits applied to every image request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImageConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Byte ceiling per image; larger images are left as links.
    pub max_bytes: usize,
    /// User-Agent sent with every request.
    pub user_agent: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_bytes: 5 * 1024 * 1024,
            user_agent: "Mozilla/5.0 (compatible; kindlekeep/1.0)".to_string(),
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub karakeep: KarakeepConfig,
    pub kindle: KindleConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_log_file() -> PathBuf {
    PathBuf::from(LOG_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            karakeep: KarakeepConfig::default(),
            kindle: KindleConfig::default(),
            output: OutputConfig::default(),
            images: ImageConfig::default(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// Loads the configuration from `path`.
    ///
    /// When the file does not exist a default one is written there and
    /// [`KindleKeepError::ConfigCreated`] is returned so the caller can stop
    /// and let the user fill it in.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            Self::default().save(path)?;
            tracing::info!(path = %path.display(), "Created default config file");
            return Err(KindleKeepError::ConfigCreated(path.to_path_buf()));
        }

        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| KindleKeepError::ConfigError(format!("{}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Lists every problem that would make a real run fail.
    ///
    /// Dry runs can proceed with an incomplete mail section, so this does not
    /// return an error on its own.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        match Url::parse(&self.karakeep.api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => problems.push(format!("karakeep.api_url has unsupported scheme '{}'", url.scheme())),
            Err(e) => problems.push(format!("karakeep.api_url is not a valid URL: {}", e)),
        }

        if self.karakeep.api_key.trim().is_empty() {
            problems.push("karakeep.api_key is empty".to_string());
        }
        if self.kindle.email.trim().is_empty() {
            problems.push("kindle.email is empty".to_string());
        }
        if self.kindle.smtp_user.trim().is_empty() {
            problems.push("kindle.smtp_user is empty".to_string());
        }
        if self.kindle.smtp_server.trim().is_empty() {
            problems.push("kindle.smtp_server is empty".to_string());
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.kindle.smtp_port, 587);
        assert_eq!(config.kindle.smtp_server, "smtp.gmail.com");
        assert_eq!(config.output.format(), OutputFormat::Pdf);
        assert_eq!(config.images.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.images.timeout_secs, 15);
    }

    #[test]
    fn test_load_missing_creates_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");

        let result = Config::load(&path);
        assert!(matches!(result, Err(KindleKeepError::ConfigCreated(_))));
        assert!(path.exists());

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded, Config::default());
    }

    #[test]
    fn test_load_minimal_file_without_optional_sections() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "karakeep": {"api_url": "https://k.example.org/api/v1", "api_key": "secret"},
                "kindle": {"email": "me@kindle.com", "smtp_server": "smtp.example.org",
                           "smtp_port": 465, "smtp_user": "me@example.org", "smtp_password": "pw"},
                "output": {"format": "EPUB", "output_dir": "./out"}
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.output.format(), OutputFormat::Epub);
        assert_eq!(config.kindle.smtp_port, 465);
        assert_eq!(config.images, ImageConfig::default());
        assert_eq!(config.log_file, PathBuf::from(LOG_FILE));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_load_invalid_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Config::load(&path), Err(KindleKeepError::ConfigError(_))));
    }

    #[test]
    fn test_unknown_format_falls_back_to_html() {
        let output = OutputConfig { format: "docx".to_string(), output_dir: PathBuf::from(".") };
        assert_eq!(output.format(), OutputFormat::Html);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("PDF".parse::<OutputFormat>(), Ok(OutputFormat::Pdf));
        assert_eq!("mobi".parse::<OutputFormat>(), Ok(OutputFormat::Mobi));
        assert!("doc".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let problems = Config::default().validate();
        assert!(problems.iter().any(|p| p.contains("api_key")));
        assert!(problems.iter().any(|p| p.contains("kindle.email")));
        assert!(problems.iter().any(|p| p.contains("smtp_user")));
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let mut config = Config::default();
        config.karakeep.api_url = "ftp://example.org".to_string();
        assert!(config.validate().iter().any(|p| p.contains("scheme")));
    }
}
