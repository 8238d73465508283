//! Case, section and run reporting

use crate::console::{Color, Console};
use crate::diff::DiffRenderer;
use crate::error::TapeError;
use crate::suite::{RunOutcome, SectionOutcome};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Identifies the case a report line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseRef<'a> {
    pub section: &'a str,
    pub name: &'a str,
    /// Message of the case, or its name when it has none
    pub label: &'a str,
}

/// Why a case failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDetail {
    /// The transform succeeded but its output differs from the expectation
    Mismatch { expected: String, rendered: String },
    /// A stage failed and no expected error matched
    Error(String),
}

/// Sink for run progress
///
/// Reporters are shared between concurrently running cases. They must not
/// panic and swallow errors of their own output.
pub trait Reporter: Send + Sync {
    /// A case is about to run
    fn wait(&self, case: CaseRef<'_>);

    fn pass(&self, case: CaseRef<'_>);

    fn fail(&self, case: CaseRef<'_>, detail: &FailureDetail);

    /// An empty expectation file was created for the case
    ///
    /// Called right after the `pass` or `fail` of that case.
    fn bootstrapped(&self, _case: CaseRef<'_>, _expect: &Path) {}

    fn section(&self, outcome: &SectionOutcome);

    fn summary(&self, outcome: &RunOutcome);

    /// A startup error aborted the run
    fn fatal(&self, error: &TapeError);
}

const PASS_MARK: &str = "✔";
const FAIL_MARK: &str = "✘";
const INDENT: &str = "    ";

/// Human-readable reporter writing to a terminal or any other sink
pub struct ConsoleReporter {
    sink: Mutex<Box<dyn Write + Send>>,
    console: Console,
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
            console: Console::no_colors(),
            verbose: false,
        }
    }

    /// Report to stdout, coloured when stdout is a terminal
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout())).with_console(Console::new())
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    /// Also print a line when each case starts
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn sink(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, text: &str) {
        let mut sink = self.sink();
        // Output errors are not test failures.
        let _ = sink.write_all(text.as_bytes());
        let _ = sink.flush();
    }

    fn case_line(&self, mark: &str, color: Color, case: CaseRef<'_>) -> String {
        format!(
            "{} {} {}\n",
            self.console.colorize(mark, color),
            self.console.colorize(&format!("{}:", case.section), Color::Dim),
            case.label
        )
    }

    fn render_detail(&self, detail: &FailureDetail) -> String {
        match detail {
            FailureDetail::Error(text) => indent(text, INDENT),
            FailureDetail::Mismatch { expected, rendered } => {
                let heading = |title: &str| {
                    format!("{INDENT}{}\n", self.console.colorize(title, Color::Bold))
                };
                let mut out = heading("Expected:");
                out.push_str(&block(expected));
                out.push_str(&heading("Rendered:"));
                out.push_str(&block(rendered));
                out.push_str(&heading("Diff:"));
                out.push_str(&indent(
                    &DiffRenderer::new(self.console).render(expected, rendered),
                    INDENT,
                ));
                out
            }
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Reporter for ConsoleReporter {
    fn wait(&self, case: CaseRef<'_>) {
        if self.verbose {
            self.emit(&self.console.colorize(
                &format!("… {}: {}\n", case.section, case.label),
                Color::Dim,
            ));
        }
    }

    fn pass(&self, case: CaseRef<'_>) {
        self.emit(&self.case_line(PASS_MARK, Color::Green, case));
    }

    fn fail(&self, case: CaseRef<'_>, detail: &FailureDetail) {
        let mut text = self.case_line(FAIL_MARK, Color::Red, case);
        text.push_str(&self.render_detail(detail));
        self.emit(&text);
    }

    fn bootstrapped(&self, _case: CaseRef<'_>, expect: &Path) {
        self.emit(&self.console.colorize(
            &format!("{INDENT}created empty expectation {}\n", expect.display()),
            Color::Yellow,
        ));
    }

    fn section(&self, outcome: &SectionOutcome) {
        let status = if outcome.is_success() {
            self.console.colorize("ok", Color::Green)
        } else {
            self.console.colorize("FAILED", Color::Red)
        };
        self.emit(&format!(
            "{} {}: {} passed, {} failed\n",
            self.console.colorize(&outcome.name, Color::Bold),
            status,
            outcome.passed,
            outcome.failed
        ));
    }

    fn summary(&self, outcome: &RunOutcome) {
        let status = if outcome.is_success() {
            self.console.colorize("ok", Color::Green)
        } else {
            self.console.colorize("FAILED", Color::Red)
        };
        self.emit(&format!(
            "\ntest result: {}. {} passed; {} failed; {} sections\n",
            status,
            outcome.passed(),
            outcome.failed(),
            outcome.sections.len()
        ));
    }

    fn fatal(&self, error: &TapeError) {
        self.emit(&format!(
            "{} {error}\n",
            self.console.colorize(FAIL_MARK, Color::Red)
        ));
    }
}

fn indent(text: &str, prefix: &str) -> String {
    let mut out = String::new();
    for line in text.lines() {
        out.push_str(prefix);
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn block(text: &str) -> String {
    if text.is_empty() {
        format!("{INDENT}{INDENT}(empty)\n")
    } else {
        indent(text, &format!("{INDENT}{INDENT}"))
    }
}

/// An event seen by a [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Wait { section: String, case: String },
    Pass { section: String, case: String },
    Fail { section: String, case: String, detail: FailureDetail },
    Bootstrapped { section: String, case: String, expect: PathBuf },
    Section { name: String, passed: usize, failed: usize },
    Summary { passed: usize, failed: usize },
    Fatal(String),
}

/// Reporter keeping every event in memory, in arrival order
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.lock().clone()
    }

    /// `(section, case)` of every passing case, in report order
    pub fn passed(&self) -> Vec<(String, String)> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::Pass { section, case } => Some((section.clone(), case.clone())),
                _ => None,
            })
            .collect()
    }

    /// `(section, case)` of every failing case, in report order
    pub fn failed(&self) -> Vec<(String, String)> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::Fail { section, case, .. } => Some((section.clone(), case.clone())),
                _ => None,
            })
            .collect()
    }

    /// Failure detail reported for a case
    pub fn detail(&self, section: &str, case: &str) -> Option<FailureDetail> {
        self.lock().iter().find_map(|event| match event {
            ReportEvent::Fail {
                section: s,
                case: c,
                detail,
            } if s == section && c == case => Some(detail.clone()),
            _ => None,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ReportEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, event: ReportEvent) {
        self.lock().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn wait(&self, case: CaseRef<'_>) {
        self.record(ReportEvent::Wait {
            section: case.section.to_string(),
            case: case.name.to_string(),
        });
    }

    fn pass(&self, case: CaseRef<'_>) {
        self.record(ReportEvent::Pass {
            section: case.section.to_string(),
            case: case.name.to_string(),
        });
    }

    fn fail(&self, case: CaseRef<'_>, detail: &FailureDetail) {
        self.record(ReportEvent::Fail {
            section: case.section.to_string(),
            case: case.name.to_string(),
            detail: detail.clone(),
        });
    }

    fn bootstrapped(&self, case: CaseRef<'_>, expect: &Path) {
        self.record(ReportEvent::Bootstrapped {
            section: case.section.to_string(),
            case: case.name.to_string(),
            expect: expect.to_path_buf(),
        });
    }

    fn section(&self, outcome: &SectionOutcome) {
        self.record(ReportEvent::Section {
            name: outcome.name.clone(),
            passed: outcome.passed,
            failed: outcome.failed,
        });
    }

    fn summary(&self, outcome: &RunOutcome) {
        self.record(ReportEvent::Summary {
            passed: outcome.passed(),
            failed: outcome.failed(),
        });
    }

    fn fatal(&self, error: &TapeError) {
        self.record(ReportEvent::Fatal(error.to_string()));
    }
}
