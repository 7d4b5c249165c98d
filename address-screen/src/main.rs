//! Address Screen CLI Application
//!
//! Reads a file of free-form lines, extracts Ethereum addresses, and screens
//! them against a compliance risk API with bounded concurrency.

mod ui;

use address_screen_lib::{
    extract_addresses, load_env_config, parse_timeout_string, validate_concurrency,
    AddressScreener, ConfigManager, EnvConfig, FileConfig, RunSummary, ScreenConfig,
    ScreenError, ScreeningEvent, ServiceConfig,
};
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Exit status when the run finished but some addresses were not classified
/// and `--strict` was given.
const EXIT_PARTIAL: i32 = 2;

/// Exit status when a second Ctrl-C abandons the drain.
const EXIT_INTERRUPTED: i32 = 130;

/// CLI arguments for address-screen
#[derive(Parser, Debug, Clone)]
#[command(name = "address-screen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Screen Ethereum addresses against a compliance risk API")]
#[command(
    long_about = "Screen Ethereum addresses against a compliance risk API.\n\nEach line of the input file is scanned for an address (0x followed by 40 hex digits).\nAddresses are screened concurrently; an address is blocked when any risk indicator\nreaches the severity threshold. Requires TRM_API_KEY and TRM_BASE_URL in the environment."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Input file, one address per line (surrounding text is ignored)
    #[arg(value_name = "FILE", help_heading = "Input")]
    pub file: PathBuf,

    /// Max concurrent screening requests (default: 10)
    #[arg(value_name = "CONCURRENCY", help_heading = "Input")]
    pub concurrency: Option<usize>,

    /// Per-request timeout, e.g. "30s" or "2m" (default: none)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Screening")]
    pub timeout: Option<String>,

    /// Chain identifier sent with each address (default: ethereum)
    #[arg(long = "chain", value_name = "NAME", help_heading = "Screening")]
    pub chain: Option<String>,

    /// Risk level at or above which an address is blocked (default: 15)
    #[arg(long = "threshold", value_name = "LEVEL", help_heading = "Screening")]
    pub threshold: Option<u32>,

    /// Output the summary as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output")]
    pub json: bool,

    /// Exit with status 2 if any address failed or was not screened
    #[arg(long = "strict", help_heading = "Output")]
    pub strict: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// JSON form of the final report.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    summary: &'a RunSummary,
    not_screened: usize,
    skipped_lines: usize,
    duration_ms: u128,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    match run_screening(&args).await {
        Ok(summary) => {
            if args.strict && summary.has_failures() {
                process::exit(EXIT_PARTIAL);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins when set. Logs go to stderr so the report on stdout
/// stays clean.
fn init_logging(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.json {
        "warn"
    } else {
        "info"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(args.debug)
        .with_ansi(console::Term::stderr().is_term())
        .with_writer(ui::progress_aware_stderr)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(concurrency) = args.concurrency {
        validate_concurrency(concurrency).map_err(|e| e.to_string())?;
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    if let Some(chain) = &args.chain {
        if chain.trim().is_empty() {
            return Err("Chain cannot be empty".to_string());
        }
    }

    if args.threshold == Some(0) {
        return Err("Threshold must be at least 1".to_string());
    }

    Ok(())
}

/// Main screening logic
async fn run_screening(args: &Args) -> Result<RunSummary, Box<dyn std::error::Error>> {
    // Credentials first: nothing else is worth doing without them
    let service = ServiceConfig::from_env()?;
    let config = build_config(args)?;

    let lines = read_lines(&args.file)?;
    let extraction = extract_addresses(&lines);
    let total = extraction.addresses.len();

    if args.verbose && !args.json {
        ui::print_header(total, extraction.skipped.len(), &config);
    }

    let screener = AddressScreener::from_service(&service, config)?;
    let progress = if args.json {
        None
    } else {
        ui::ProgressLine::start(total)
    };

    let start_time = Instant::now();
    let summary = screener
        .screen_all(extraction.addresses, shutdown_signal(), |event, counter| {
            if let ScreeningEvent::Screened(outcome) = event {
                if !outcome.blocked {
                    tracing::info!("Address {} NOT blocked on screening endpoint", outcome.address);
                }
            }
            if let Some(progress) = &progress {
                progress.update(counter);
            }
        })
        .await;
    let duration = start_time.elapsed();

    if let Some(progress) = progress {
        progress.finish();
    }

    if args.json {
        display_json_report(&summary, extraction.skipped.len(), duration)?;
    } else {
        display_text_report(&summary, args, duration);
    }

    Ok(summary)
}

/// Resolves on the first Ctrl-C. A second Ctrl-C while in-flight requests
/// drain exits the process at once.
async fn shutdown_signal() {
    let interrupts = stream::unfold((), |()| async {
        tokio::signal::ctrl_c().await.ok().map(|()| ((), ()))
    })
    .boxed();

    first_interrupt_then_abort(interrupts, || {
        eprintln!("Interrupted again, exiting without waiting for in-flight requests");
        process::exit(EXIT_INTERRUPTED);
    })
    .await;
}

/// Resolve on the first item of `interrupts`, then call `abort` in the
/// background if a second one arrives.
///
/// If the stream ends before yielding anything (no signal handler could be
/// installed) the future never resolves, so the run is never cut short.
async fn first_interrupt_then_abort<S, F>(mut interrupts: S, abort: F)
where
    S: Stream<Item = ()> + Send + Unpin + 'static,
    F: FnOnce() + Send + 'static,
{
    if interrupts.next().await.is_none() {
        future::pending::<()>().await;
    }
    tracing::warn!(
        "Interrupted: no new addresses will be admitted, draining in-flight requests \
         (Ctrl-C again to exit now)"
    );

    tokio::spawn(async move {
        if interrupts.next().await.is_some() {
            abort();
        }
    });
}

/// Build ScreenConfig from all configuration sources.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (SCREEN_*)
/// 3. Config file (--config, or discovered local/global/XDG files)
/// 4. Built-in defaults
fn build_config(args: &Args) -> Result<ScreenConfig, Box<dyn std::error::Error>> {
    let manager = ConfigManager::new(args.verbose);

    let file_config = match &args.config {
        // An explicitly requested file must load
        Some(path) => manager.load_file(path)?,
        None => manager.discover_and_load()?,
    };

    let config = merge_file_config_into_screen_config(ScreenConfig::default(), &file_config);
    let config = apply_environment_config(config, load_env_config());
    apply_cli_args_to_config(config, args)
}

fn merge_file_config_into_screen_config(
    mut config: ScreenConfig,
    file: &FileConfig,
) -> ScreenConfig {
    let Some(defaults) = &file.defaults else {
        return config;
    };

    if let Some(concurrency) = defaults.concurrency {
        config = config.with_concurrency(concurrency);
    }
    // Already validated when the file was loaded
    if let Some(secs) = defaults.timeout.as_deref().and_then(parse_timeout_string) {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if defaults.chain.is_some() {
        config = config.with_chain(defaults.chain_or_default());
    }
    if let Some(threshold) = defaults.severity_threshold {
        config = config.with_severity_threshold(threshold);
    }

    config
}

fn apply_environment_config(mut config: ScreenConfig, env: EnvConfig) -> ScreenConfig {
    if let Some(concurrency) = env.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(timeout) = env.timeout {
        config = config.with_timeout(timeout);
    }
    if let Some(chain) = env.chain {
        config = config.with_chain(chain);
    }
    if let Some(threshold) = env.severity_threshold {
        config = config.with_severity_threshold(threshold);
    }
    config
}

fn apply_cli_args_to_config(
    mut config: ScreenConfig,
    args: &Args,
) -> Result<ScreenConfig, Box<dyn std::error::Error>> {
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(timeout) = &args.timeout {
        let secs = parse_timeout_string(timeout)
            .ok_or_else(|| ScreenError::config(format!("Invalid timeout '{}'", timeout)))?;
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(chain) = &args.chain {
        config = config.with_chain(chain.trim());
    }
    if let Some(threshold) = args.threshold {
        config = config.with_severity_threshold(threshold);
    }
    Ok(config)
}

/// Read the input file as lines.
///
/// Invalid UTF-8 is replaced rather than rejected; such lines simply fail
/// address extraction.
fn read_lines(path: &Path) -> Result<Vec<String>, ScreenError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ScreenError::file_error(path.to_string_lossy(), e.to_string()))?;

    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}

/// Display the final report in JSON format
fn display_json_report(
    summary: &RunSummary,
    skipped_lines: usize,
    duration: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = JsonReport {
        summary,
        not_screened: summary.not_screened(),
        skipped_lines,
        duration_ms: duration.as_millis(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Display the final report as text.
///
/// Counts and the not-blocked list go to stdout; the styled summary bar and
/// failure details go to stderr.
fn display_text_report(summary: &RunSummary, args: &Args, duration: Duration) {
    println!("Total NOT blocked: {}", summary.not_blocked_count);
    println!("Total blocked: {}", summary.blocked_count);
    if summary.failed_count > 0 {
        println!("Total failed: {}", summary.failed_count);
    }
    if summary.not_screened() > 0 {
        println!("Total not screened: {}", summary.not_screened());
    }
    println!("{}", summary.not_blocked_report());

    if summary.total > 1 || args.verbose {
        ui::print_summary(summary, duration);
    }
    if summary.has_failures() {
        ui::print_failure_summary(summary, args.verbose);
    }
}
