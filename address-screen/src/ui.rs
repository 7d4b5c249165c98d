//! Terminal display for address-screen.
//!
//! Holds the live progress line, the verbose header, and the styled summary.
//! Everything here writes to stderr so stdout carries only the report.

use address_screen_lib::{AddressKey, Progress, RunSummary, ScreenConfig};
use console::{style, Term};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Set while a progress line is drawn on stderr.
static PROGRESS_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Writer for log output that first clears a pending progress line, so log
/// records never land on the end of the counter.
pub fn progress_aware_stderr() -> io::Stderr {
    if PROGRESS_ACTIVE.load(Ordering::Relaxed) {
        let _ = Term::stderr().clear_line();
    }
    io::stderr()
}

// ── Progress ─────────────────────────────────────────────────────────────────

/// Single-line `[completed/total]` counter redrawn in place on stderr.
pub struct ProgressLine {
    term: Term,
    total: usize,
}

impl ProgressLine {
    /// Start a progress line, or `None` when stderr is not a terminal or
    /// there is nothing to screen.
    pub fn start(total: usize) -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() || total == 0 {
            return None;
        }

        let line = Self { term, total };
        PROGRESS_ACTIVE.store(true, Ordering::Relaxed);
        line.draw(Progress {
            completed: 0,
            total,
        });
        Some(line)
    }

    pub fn update(&self, progress: Progress) {
        self.draw(progress);
    }

    /// Clear the line and stop redrawing.
    pub fn finish(self) {
        PROGRESS_ACTIVE.store(false, Ordering::Relaxed);
        let _ = self.term.clear_line();
    }

    fn draw(&self, progress: Progress) {
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&format_progress(progress.completed, self.total));
    }
}

fn format_progress(completed: usize, total: usize) -> String {
    let percent = if total == 0 {
        100
    } else {
        completed * 100 / total
    };
    format!(
        "{} {}",
        style(format!("[{}/{}]", completed, total)).cyan(),
        style(format!("{:>3}% screened", percent)).dim(),
    )
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a verbose run.
pub fn print_header(address_count: usize, skipped: usize, config: &ScreenConfig) {
    eprintln!(
        "{} {} {}",
        style("address-screen").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Screening {} address{}",
            address_count,
            plural_es(address_count)
        ))
        .dim(),
    );

    let mut meta_parts = vec![
        format!("Chain: {}", config.chain),
        format!("Threshold: {}", config.severity_threshold),
        format!("Concurrency: {}", config.concurrency),
    ];
    if let Some(timeout) = config.timeout {
        meta_parts.push(format!("Timeout: {}s", timeout.as_secs()));
    }
    if skipped > 0 {
        meta_parts.push(format!("Skipped lines: {}", skipped));
    }

    eprintln!("{}", style(meta_parts.join(" | ")).dim());
    eprintln!();
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar with colored counts.
pub fn print_summary(summary: &RunSummary, duration: Duration) {
    eprintln!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    eprintln!(
        "  {} address{} in {:.1}s  {}  {}  {}  {}  {}  {}",
        style(summary.total).bold(),
        plural_es(summary.total),
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} not blocked", summary.not_blocked_count)).green(),
        style("|").dim(),
        style(format!("{} blocked", summary.blocked_count)).red(),
        style("|").dim(),
        style(format!("{} failed", summary.failed_count)).yellow(),
    );
}

/// Print which addresses could not be classified.
pub fn print_failure_summary(summary: &RunSummary, verbose: bool) {
    if !summary.has_failures() {
        return;
    }

    eprintln!(
        "  {}",
        style("Some addresses could not be screened:").yellow()
    );

    if !summary.failed.is_empty() {
        let max_show = if verbose { summary.failed.len() } else { 5 };
        eprintln!(
            "  {} {} failed: {}",
            style("•").dim(),
            summary.failed.len(),
            format_address_list(&summary.failed, max_show),
        );
    }
    if summary.not_screened() > 0 {
        eprintln!(
            "  {} {} not screened (interrupted)",
            style("•").dim(),
            summary.not_screened(),
        );
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Join addresses, truncating after `max_show` entries.
pub fn format_address_list(addresses: &[AddressKey], max_show: usize) -> String {
    let shown: Vec<&str> = addresses
        .iter()
        .take(max_show)
        .map(AddressKey::as_str)
        .collect();

    if addresses.len() <= max_show {
        shown.join(", ")
    } else {
        format!(
            "{}, ... and {} more",
            shown.join(", "),
            addresses.len() - max_show
        )
    }
}

fn plural_es(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "es"
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
