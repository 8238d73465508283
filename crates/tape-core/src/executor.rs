//! Running a single case
//!
//! A case runs through a fixed sequence of stages:
//!
//! 1. `before` hook
//! 2. plugin instantiation with the case options
//! 3. fixture path derivation and source read
//! 4. transform (bounded by the per-case timeout when one is set)
//! 5. result write, expectation read (bootstrapping a missing one) and
//!    comparison
//! 6. `after` hook, always, exactly once
//!
//! A failure in stages 2 to 5 short-circuits to the expected-error check.
//! An output mismatch is a verdict, not a failure, and never consults the
//! expected error. A bootstrapped expectation is reported right after the
//! verdict of the case that created it.

use crate::failure::Failure;
use crate::fixtures::FixturePaths;
use crate::plugin::{Pipeline, Plugin, ProcessOptions, Transformer};
use crate::reporter::{CaseRef, FailureDetail, Reporter};
use crate::result::ResultExt;
use crate::store::{DiskStore, FixtureStore};
use crate::table::TestCase;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Verdict for one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    Failed(FailureDetail),
}

impl CaseOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Result of the stages that can fail
enum Rendered {
    Output {
        expected: String,
        rendered: String,
        /// Expectation file created empty for this case
        created: Option<PathBuf>,
    },
    Failed(Failure),
}

/// Expectation text, and whether it had to be created
struct Expectation {
    text: String,
    created: bool,
}

/// Runs cases against the fixtures directory
#[derive(Clone)]
pub struct Executor {
    transformer: Arc<dyn Transformer>,
    store: Arc<dyn FixtureStore>,
    reporter: Arc<dyn Reporter>,
    fixtures: PathBuf,
    timeout: Option<Duration>,
}

impl Executor {
    /// Executor using the [`Pipeline`] engine and the local file system
    pub fn new(fixtures: impl Into<PathBuf>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            transformer: Arc::new(Pipeline),
            store: Arc::new(DiskStore),
            reporter,
            fixtures: fixtures.into(),
            timeout: None,
        }
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn FixtureStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn fixtures(&self) -> &Path {
        &self.fixtures
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Run one case, report it, and return whether it passed
    pub async fn run(
        &self,
        section: &str,
        name: &str,
        case: &TestCase,
        default_plugin: &Arc<dyn Plugin>,
    ) -> bool {
        let case_ref = CaseRef {
            section,
            name,
            label: case.label(name),
        };
        self.reporter.wait(case_ref);

        let (outcome, created) = self.execute(case_ref, case, default_plugin).await;
        match &outcome {
            CaseOutcome::Passed => self.reporter.pass(case_ref),
            CaseOutcome::Failed(detail) => self.reporter.fail(case_ref, detail),
        }
        if let Some(expect) = &created {
            self.reporter.bootstrapped(case_ref, expect);
        }
        outcome.is_pass()
    }

    /// Run the stages of one case without reporting the verdict
    ///
    /// Also returns the expectation file created for the case, if any.
    async fn execute(
        &self,
        case_ref: CaseRef<'_>,
        case: &TestCase,
        default_plugin: &Arc<dyn Plugin>,
    ) -> (CaseOutcome, Option<PathBuf>) {
        if let Some(before) = &case.before {
            before.call().await.log_and_continue();
        }

        let rendered = self.render(case_ref, case, default_plugin).await;

        if let Some(after) = &case.after {
            after.call().await.log_and_continue();
        }

        match rendered {
            Rendered::Output {
                expected,
                rendered,
                created,
            } if expected == rendered => (CaseOutcome::Passed, created),
            Rendered::Output {
                expected,
                rendered,
                created,
            } => {
                debug!(
                    "{}:{} output differs from expectation",
                    case_ref.section, case_ref.name
                );
                let detail = FailureDetail::Mismatch { expected, rendered };
                (CaseOutcome::Failed(detail), created)
            }
            Rendered::Failed(failure) => match &case.error {
                Some(expectation) if expectation.matches(&failure) => {
                    debug!(
                        "{}:{} failed as expected: {}",
                        case_ref.section,
                        case_ref.name,
                        failure.summary()
                    );
                    (CaseOutcome::Passed, None)
                }
                _ => {
                    let detail = FailureDetail::Error(failure.summary());
                    (CaseOutcome::Failed(detail), None)
                }
            },
        }
    }

    async fn render(
        &self,
        case_ref: CaseRef<'_>,
        case: &TestCase,
        default_plugin: &Arc<dyn Plugin>,
    ) -> Rendered {
        match self.try_render(case_ref, case, default_plugin).await {
            Ok(rendered) => rendered,
            Err(failure) => Rendered::Failed(failure),
        }
    }

    async fn try_render(
        &self,
        case_ref: CaseRef<'_>,
        case: &TestCase,
        default_plugin: &Arc<dyn Plugin>,
    ) -> Result<Rendered, Failure> {
        let plugin = case.plugin.as_ref().unwrap_or(default_plugin);
        debug!(
            "{}:{} using plugin {}",
            case_ref.section,
            case_ref.name,
            plugin.name()
        );
        let instance = plugin.instantiate(case.options.as_ref()).await?;

        let paths =
            FixturePaths::derive(&self.fixtures, case_ref.name, case.fixture_overrides());
        let source = self
            .store
            .read_text(&paths.source)
            .await
            .map_err(|e| Failure::from_io(&paths.source, &e))?;

        let options = ProcessOptions {
            filename: paths.source.clone(),
            plugins: vec![instance],
        };
        let rendered = self.transform(&source, &options).await?;

        self.store
            .write_text(&paths.result, &rendered)
            .await
            .map_err(|e| Failure::from_io(&paths.result, &e))?;

        let expectation = self.read_expectation(case_ref, &paths.expect).await?;
        Ok(Rendered::Output {
            expected: expectation.text,
            rendered,
            created: expectation.created.then_some(paths.expect),
        })
    }

    async fn transform(&self, source: &str, options: &ProcessOptions) -> Result<String, Failure> {
        let process = self.transformer.process(source, options);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, process)
                .await
                .unwrap_or_else(|_| {
                    Err(Failure::reason("timeout").with_field(
                        "message",
                        format!("transform did not finish within {limit:?}"),
                    ))
                }),
            None => process.await,
        }
    }

    /// Read the expectation, creating it empty when it does not exist yet
    async fn read_expectation(
        &self,
        case_ref: CaseRef<'_>,
        path: &Path,
    ) -> Result<Expectation, Failure> {
        match self.store.read_text(path).await {
            Ok(text) => Ok(Expectation {
                text,
                created: false,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "No expectation for {}:{}, creating empty {}",
                    case_ref.section,
                    case_ref.name,
                    path.display()
                );
                self.store
                    .write_text(path, "")
                    .await
                    .map_err(|e| Failure::from_io(path, &e))?;
                Ok(Expectation {
                    text: String::new(),
                    created: true,
                })
            }
            Err(e) => Err(Failure::from_io(path, &e)),
        }
    }
}
