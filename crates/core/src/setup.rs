//! Interactive creation of the configuration file.
//!
//! Prompts are read line by line from any [`BufRead`] so the flow can be
//! driven from stdin or from a test buffer.

use std::io::{BufRead, Write};
use std::path::Path;

use crate::config::{Config, OutputFormat};
use crate::{KindleKeepError, Result};

/// Line-oriented question/answer helper.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self, label: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(default) if !default.is_empty() => write!(self.output, "{} [{}]: ", label, default)?,
            _ => write!(self.output, "{}: ", label)?,
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(KindleKeepError::ConfigError("setup cancelled: input closed".to_string()));
        }
        Ok(line.trim().to_string())
    }

    /// Asks once; an empty answer yields `default`.
    pub fn ask(&mut self, label: &str, default: &str) -> Result<String> {
        let answer = self.read_answer(label, Some(default))?;
        Ok(if answer.is_empty() { default.to_string() } else { answer })
    }

    /// Asks until a non-empty answer (or a non-empty default) is available.
    pub fn ask_required(&mut self, label: &str, default: Option<&str>) -> Result<String> {
        loop {
            let answer = self.read_answer(label, default)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            if let Some(default) = default.filter(|d| !d.is_empty()) {
                return Ok(default.to_string());
            }
            writeln!(self.output, "This field is required!")?;
        }
    }

    /// Yes/no question defaulting to no.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{} (y/n)", question), "n")?;
        Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
    }

    pub fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }
}

/// Walks through every setting and returns the resulting configuration.
pub fn prompt_config<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<Config> {
    let mut config = Config::default();

    prompter.say("1. Karakeep Settings")?;
    config.karakeep.api_url = prompter.ask_required("Karakeep API URL", Some(config.karakeep.api_url.as_str()))?;
    config.karakeep.api_key = prompter.ask_required("Karakeep API Key", None)?;

    prompter.say("\n2. Kindle Settings")?;
    config.kindle.email = prompter.ask_required("Your Kindle email address (ends with @kindle.com)", None)?;

    prompter.say("\n3. Email Settings (for sending to Kindle)")?;
    config.kindle.smtp_server = prompter.ask_required("SMTP Server", Some(config.kindle.smtp_server.as_str()))?;
    config.kindle.smtp_port = loop {
        let port = prompter.ask_required("SMTP Port", Some("587"))?;
        match port.parse::<u16>() {
            Ok(port) => break port,
            Err(_) => prompter.say("Please enter a valid port number.")?,
        }
    };
    config.kindle.smtp_user = prompter.ask_required("Your email address", None)?;

    prompter.say("\nFor Gmail users:")?;
    prompter.say("- Enable 2-factor authentication")?;
    prompter.say("- Generate an app-specific password")?;
    prompter.say("- Use the app password here, not your regular password")?;
    config.kindle.smtp_password = prompter.ask_required("Email password (or app password)", None)?;

    prompter.say("\n4. Output Settings")?;
    let format = prompter.ask("Output format (pdf/epub)", "pdf")?;
    config.output.format = match format.parse() {
        Ok(OutputFormat::Epub) => OutputFormat::Epub.to_string(),
        _ => OutputFormat::Pdf.to_string(),
    };
    let output_dir = prompter.ask("Output directory", "./output")?;
    config.output.output_dir = output_dir.into();

    Ok(config)
}

/// Runs the full setup flow and writes `path`.
///
/// Returns `false` when the user declined to overwrite an existing file.
pub fn run_setup<R: BufRead, W: Write>(path: &Path, prompter: &mut Prompter<R, W>) -> Result<bool> {
    prompter.say("=== Karakeep to Kindle Configuration Setup ===\n")?;
    let config = prompt_config(prompter)?;

    if path.exists() && !prompter.confirm(&format!("\n{} already exists. Overwrite?", path.display()))? {
        prompter.say("Configuration not saved.")?;
        return Ok(false);
    }

    config.save(path)?;
    tracing::info!(path = %path.display(), "Configuration saved");
    Ok(true)
}
