mod echo;

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use kindlekeep_core::{
    CONFIG_FILE, Config, Delivery, KindleKeepError, OutputFormat, Processor, Prompter, RunOptions, SmtpDelivery,
    cleanup_output_directory, run_setup,
};
use owo_colors::OwoColorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::echo::{
    file_name, format_size, print_banner, print_error, print_info, print_step, print_success, print_summary,
    print_warning,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Send unread Karakeep bookmarks to a Kindle and archive them
#[derive(Parser, Debug)]
#[command(name = "kindlekeep")]
#[command(author = "kindlekeep Contributors")]
#[command(version)]
#[command(about = "Send unread Karakeep bookmarks to your Kindle", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Configuration file path
    #[arg(short, long, default_value = CONFIG_FILE, value_name = "FILE", global = true)]
    config: PathBuf,

    /// Show what would be done without sending or archiving anything
    #[arg(long)]
    dry_run: bool,

    /// Output format, overrides the configured one (pdf, epub, html, mobi)
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Create a single document with all articles instead of one per article
    #[arg(long)]
    compilation: bool,

    /// Delete generated files after successful delivery
    #[arg(long)]
    cleanup: bool,

    /// Send the given file to the Kindle, bypassing article processing
    #[arg(long, value_name = "FILE")]
    send_email: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the configuration file interactively
    Setup,
    /// Delete generated files from the output directory
    Clean {
        /// Keep files modified within the last hour
        #[arg(long)]
        keep_recent: bool,
    },
    /// Generate a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Delivery used for dry runs: nothing leaves the machine.
struct DryRunDelivery;

impl Delivery for DryRunDelivery {
    async fn send(&self, path: &Path) -> kindlekeep_core::Result<()> {
        tracing::info!("DRY RUN: Would send {} to Kindle", path.display());
        Ok(())
    }
}

/// Initialize the tracing subscriber: console plus an optional append-only log file
fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("warn,kindlekeep={0},kindlekeep_core={0}", level)))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_target(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    match Config::load(path) {
        Ok(config) => Ok(config),
        Err(KindleKeepError::ConfigCreated(path)) => {
            print_warning(&format!("Created default config file at {}", path.display()));
            print_info("Please edit it with your settings (or run `kindlekeep setup`) and run again");
            anyhow::bail!("configuration required")
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load config: {}", path.display())),
    }
}

fn setup(path: &Path) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    if run_setup(path, &mut prompter).context("Setup failed")? {
        print_success(&format!("Configuration saved to {}", path.display().bright_white()));
        eprintln!("\nNext steps:");
        eprintln!("1. Add your sending address to the approved sender list in your Amazon account");
        eprintln!("2. Test the configuration with: kindlekeep --dry-run");
        eprintln!("3. Run: kindlekeep");
    }
    Ok(())
}

async fn send_file<D: Delivery>(processor: &Processor<D>, path: &Path, args: &Args) -> anyhow::Result<()> {
    if !args.dry_run && let Ok(meta) = std::fs::metadata(path) {
        print_info(&format!("Sending file '{}' ({}) to Kindle...", path.display(), format_size(meta.len())));
    }

    match processor.send_file(path, args.dry_run, args.cleanup).await {
        Ok(true) => print_success(&format!("Successfully sent '{}' to Kindle", file_name(path))),
        Ok(false) => print_info(&format!("DRY RUN: Would send file '{}' to Kindle", path.display())),
        Err(e) => {
            print_error(&format!("Failed to send '{}' to Kindle", file_name(path)));
            return Err(e).context("Delivery failed");
        }
    }
    Ok(())
}

async fn run<D: Delivery>(config: Config, delivery: D, args: &Args) -> anyhow::Result<()> {
    let mut processor = Processor::new(config, delivery).context("Failed to create processor")?;

    if let Some(path) = &args.send_email {
        return send_file(&processor, path, args).await;
    }

    let format = args.format.unwrap_or_else(|| processor.config().output.format());
    if args.verbose {
        let api_url = &processor.config().karakeep.api_url;
        let mode = if args.compilation { "compilation" } else { "individual" };
        print_step(2, 2, &format!("Processing bookmarks from {}", api_url.bright_white()));
        eprintln!("  {} {}", "Format:".dimmed(), format.to_string().bright_white());
        eprintln!("  {} {}\n", "Mode:".dimmed(), mode.bright_white());
    }

    let options =
        RunOptions { dry_run: args.dry_run, compilation: args.compilation, cleanup: args.cleanup, format: Some(format) };
    let summary = processor.process(options).await.context("Processing failed")?;

    print_summary(&summary, args.dry_run);
    if summary.failed > 0 {
        print_warning(&format!("{} article(s) were not delivered or not archived", summary.failed));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match &args.command {
        Some(Command::Completions { shell }) => {
            clap_complete::generate(*shell, &mut Args::command(), "kindlekeep", &mut io::stdout());
            return Ok(());
        }
        Some(Command::Setup) => {
            init_logging(args.verbose, None)?;
            return setup(&args.config);
        }
        _ => {}
    }

    if args.verbose {
        print_banner();
        print_step(1, 2, &format!("Loading configuration from {}", args.config.display().bright_white()));
    }

    let config = load_config(&args.config)?;
    init_logging(args.verbose, Some(&config.log_file))?;

    if let Some(Command::Clean { keep_recent }) = &args.command {
        let removed = cleanup_output_directory(&config.output.output_dir, *keep_recent);
        print_success(&format!("Removed {} file(s) from {}", removed, config.output.output_dir.display()));
        return Ok(());
    }

    for problem in config.validate() {
        print_warning(&problem);
    }

    if args.dry_run {
        run(config, DryRunDelivery, &args).await
    } else {
        let delivery = SmtpDelivery::new(&config.kindle).context("Invalid Kindle mail settings")?;
        run(config, delivery, &args).await
    }
}
