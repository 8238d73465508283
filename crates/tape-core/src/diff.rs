//! Line diffs between expected and rendered documents

use crate::console::{Color, Console};
use similar::{ChangeTag, TextDiff};

/// Unchanged lines kept around each change
const CONTEXT_LINES: usize = 2;

/// Renders a line diff, `-` for expected lines and `+` for rendered ones
#[derive(Debug, Clone, Copy)]
pub struct DiffRenderer {
    console: Console,
}

impl DiffRenderer {
    pub fn new(console: Console) -> Self {
        Self { console }
    }

    pub fn no_colors() -> Self {
        Self::new(Console::no_colors())
    }

    /// Hunks of changed lines between the expectation and the rendered output
    ///
    /// Unchanged stretches longer than the context are elided with `...`.
    /// Removed lines carry their line number in the expectation, added and
    /// unchanged ones their line number in the rendered output.
    pub fn render_diff(&self, expected: &str, rendered: &str) -> String {
        let diff = TextDiff::from_lines(expected, rendered);
        let mut output = format!(
            "{}\n{}\n",
            self.console.colorize("--- expected", Color::Red),
            self.console.colorize("+++ rendered", Color::Green)
        );

        for (hunk, ops) in diff.grouped_ops(CONTEXT_LINES).iter().enumerate() {
            if hunk > 0 {
                output.push_str(&self.console.colorize("     ...\n", Color::Dim));
            }
            for op in ops {
                for change in diff.iter_changes(op) {
                    let (sign, line, color) = match change.tag() {
                        ChangeTag::Delete => ("-", change.old_index(), Some(Color::Red)),
                        ChangeTag::Insert => ("+", change.new_index(), Some(Color::Green)),
                        ChangeTag::Equal => (" ", change.new_index(), None),
                    };
                    let gutter = format!("{sign} {:>4} │ ", line.map_or(0, |index| index + 1));
                    match color {
                        Some(color) => {
                            output.push_str(&self.console.colorize(&gutter, color));
                            output.push_str(&self.console.colorize(change.value(), color));
                        }
                        None => {
                            output.push_str(&self.console.colorize(&gutter, Color::Dim));
                            output.push_str(change.value());
                        }
                    }
                    if change.missing_newline() {
                        output.push('\n');
                    }
                }
            }
        }

        output
    }

    /// Show where two single-line documents diverge, character by character
    pub fn render_inline_diff(&self, expected: &str, rendered: &str) -> String {
        let diff = TextDiff::from_chars(expected, rendered);
        let mut output = String::new();

        for (marker, tag, color) in [
            ("- ", ChangeTag::Delete, Color::Red),
            ("+ ", ChangeTag::Insert, Color::Green),
        ] {
            output.push_str(&self.console.colorize(marker, color));
            for change in diff.iter_all_changes() {
                if change.tag() == tag {
                    output.push_str(&self.console.colorize(change.value(), color));
                } else if change.tag() == ChangeTag::Equal {
                    output.push_str(change.value());
                }
            }
            output.push('\n');
        }

        output
    }

    /// Line diff for multi-line documents, inline diff otherwise
    pub fn render(&self, expected: &str, rendered: &str) -> String {
        let single_line = |text: &str| !text.trim_end_matches('\n').contains('\n');
        if single_line(expected) && single_line(rendered) {
            self.render_inline_diff(expected, rendered)
        } else {
            self.render_diff(expected, rendered)
        }
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new(Console::new())
    }
}
