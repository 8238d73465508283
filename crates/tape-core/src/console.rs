//! ANSI colouring for report output

use std::env;
use std::io::{self, IsTerminal};

/// Colour policy for one output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Console {
    color_enabled: bool,
}

impl Console {
    /// Colours when stdout is a terminal and `NO_COLOR` is unset
    pub fn new() -> Self {
        Self {
            color_enabled: io::stdout().is_terminal() && env::var_os("NO_COLOR").is_none(),
        }
    }

    pub fn no_colors() -> Self {
        Self {
            color_enabled: false,
        }
    }

    pub fn with_colors(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    pub fn is_color_enabled(&self) -> bool {
        self.color_enabled
    }

    pub fn colorize(&self, text: &str, color: Color) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            Color::Red => format!("\x1b[31m{text}\x1b[0m"),
            Color::Green => format!("\x1b[32m{text}\x1b[0m"),
            Color::Yellow => format!("\x1b[33m{text}\x1b[0m"),
            Color::Dim => format!("\x1b[2m{text}\x1b[0m"),
            Color::Bold => format!("\x1b[1m{text}\x1b[0m"),
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Dim,
    Bold,
}
