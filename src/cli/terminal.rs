//! Terminal capability detection and colouring

use owo_colors::{OwoColorize, colors::css};

/// Columns below which the menu is printed one entry per line.
const NARROW_COLUMNS: u16 = 60;

/// Detects whether coloured output should be enabled
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Detects terminal width, returning None if not available
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Check if terminal is narrow
pub fn is_narrow() -> bool {
    terminal_width().is_some_and(|w| w < NARROW_COLUMNS)
}

/// Extension trait for colouring console messages
pub trait Colorize {
    /// Completed action (green)
    fn success(&self) -> String;
    /// Refused or failed action (red)
    fn error(&self) -> String;
    /// Something worth noticing (amber)
    fn warning(&self) -> String;
    /// Headings (blue)
    fn info(&self) -> String;
    /// Hints
    fn dim(&self) -> String;
}

fn paint(text: &str, colour: impl FnOnce(&str) -> String) -> String {
    if supports_color() {
        colour(text)
    } else {
        text.to_string()
    }
}

impl Colorize for str {
    fn success(&self) -> String {
        paint(self, |s| s.fg::<css::Green>().to_string())
    }

    fn error(&self) -> String {
        paint(self, |s| s.fg::<css::Red>().to_string())
    }

    fn warning(&self) -> String {
        paint(self, |s| s.fg::<css::Orange>().to_string())
    }

    fn info(&self) -> String {
        paint(self, |s| s.fg::<css::LightBlue>().bold().to_string())
    }

    fn dim(&self) -> String {
        paint(self, |s| s.dimmed().to_string())
    }
}

impl Colorize for String {
    fn success(&self) -> String {
        self.as_str().success()
    }

    fn error(&self) -> String {
        self.as_str().error()
    }

    fn warning(&self) -> String {
        self.as_str().warning()
    }

    fn info(&self) -> String {
        self.as_str().info()
    }

    fn dim(&self) -> String {
        self.as_str().dim()
    }
}
