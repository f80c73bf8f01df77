//! Terminal styling helpers
//!
//! Output goes through `anstream`, which strips the escapes when stdout is
//! not a terminal.

use indicatif::ProgressStyle;
use owo_colors::OwoColorize;
use std::fmt::Display;

/// Semantic colours for CLI output
pub trait Stylize {
    /// Values the user should notice (ids, paths, links)
    fn accent(&self) -> String;
    /// Secondary detail
    fn muted(&self) -> String;
    /// Headings
    fn emphasis(&self) -> String;
    /// Advisory text
    fn caution(&self) -> String;
}

impl<T: Display> Stylize for T {
    fn accent(&self) -> String {
        self.cyan().to_string()
    }

    fn muted(&self) -> String {
        self.dimmed().to_string()
    }

    fn emphasis(&self) -> String {
        self.bold().to_string()
    }

    fn caution(&self) -> String {
        self.yellow().to_string()
    }
}

/// Success marker
pub fn check() -> String {
    "✓".green().to_string()
}

/// Failure marker
pub fn cross() -> String {
    "✗".red().to_string()
}

/// Spinner used while waiting on the remote service
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}

/// Clickable link where the terminal supports it, the bare URL otherwise
pub fn hyperlink(url: &str) -> String {
    if supports_hyperlinks::on(supports_hyperlinks::Stream::Stdout) {
        terminal_link::Link::new(&url.accent(), url).to_string()
    } else {
        url.accent()
    }
}
