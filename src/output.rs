//! Colored terminal output for bootseq
//!
//! Uses owo-colors for terminal colors. Status lines go to stdout; the
//! command echo and diagnostics go to stderr so they interleave with tool
//! output the way `set -x` traces do.

use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable or disable `debug` output.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Print an action header (blue, bold)
/// Example: "==> Bootstrapping environment"
pub fn action(message: &str) {
    println!("{} {}", "==>".blue().bold(), message.bold());
}

/// Print a step header with counter
/// Example: "(2/6) build"
pub fn action_numbered(current: usize, total: usize, message: &str) {
    println!(
        "{} {}",
        format!("({}/{})", current, total).cyan(),
        message.bold()
    );
}

/// Echo a command before it runs
/// Example: "+ conda install -y posix"
pub fn command(line: &str) {
    eprintln!("{} {}", "+".dimmed(), line);
}

/// Print a detail line (dimmed)
pub fn detail(message: &str) {
    println!("     {}", message.dimmed());
}

/// Print a success message (green)
pub fn success(message: &str) {
    println!("{} {}", "==>".green().bold(), message.green());
}

/// Print an info message (cyan)
pub fn info(message: &str) {
    println!("{} {}", "::".cyan(), message);
}

/// Print a skip message (dimmed)
/// Example: "==> 3 (test) disabled, skipping"
pub fn skip(message: &str) {
    println!("{} {}", "==>".dimmed(), message.dimmed());
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

/// Print a debug message, only in verbose mode
pub fn debug(message: &str) {
    if is_verbose() {
        eprintln!("{} {}", "[bootseq:debug]".dimmed(), message);
    }
}
