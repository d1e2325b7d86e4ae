// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Terminal output helpers
//!
//! Consistent markers for progress lines printed by the CLI and the runner.

use colored::Colorize;

use crate::report::OverallOutcome;

/// Disable colors when `NO_COLOR` is set or stdout is not a terminal
pub fn configure_colors() {
    if std::env::var_os("NO_COLOR").is_some() || std::env::var_os("TERM").is_none() {
        colored::control::set_override(false);
    }
}

/// Outcome label colored by severity
pub fn outcome_label(outcome: OverallOutcome) -> colored::ColoredString {
    let label = outcome.to_string();
    match outcome {
        OverallOutcome::Success => label.green().bold(),
        OverallOutcome::Unstable => label.yellow().bold(),
        OverallOutcome::Failure => label.red().bold(),
    }
}

/// Print a styled header
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "═".repeat(title.len().max(40)));
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print a bullet point
pub fn print_bullet(content: &str) {
    println!("  • {}", content);
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print an error cross
pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print a warning
pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_label_text() {
        colored::control::set_override(false);
        assert_eq!(outcome_label(OverallOutcome::Unstable).to_string(), "UNSTABLE");
        assert_eq!(outcome_label(OverallOutcome::Failure).to_string(), "FAILURE");
    }
}
