//! Console output helpers for the CLI.

use colored::Colorize;

use crate::diagnostics::{Diagnostic, Diagnostics, Severity};

/// Print a step indicator with message.
pub fn print_step(message: &str) {
    println!("{} {}", "▶".cyan(), message.bold());
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// One line per diagnostic: severity, summary and detail.
#[must_use]
pub fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    let severity = match diagnostic.severity {
        Severity::Error => "error:".red().bold(),
        Severity::Warning => "warning:".yellow().bold(),
    };

    if diagnostic.detail.is_empty() {
        format!("{severity} {}", diagnostic.summary)
    } else {
        format!(
            "{severity} {}; {}",
            diagnostic.summary,
            diagnostic.detail.bright_black()
        )
    }
}

/// Print every diagnostic to stderr.
pub fn print_diagnostics(diags: &Diagnostics) {
    for diagnostic in diags {
        eprintln!("{}", format_diagnostic(diagnostic));
    }
}
