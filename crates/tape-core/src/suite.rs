//! Suite orchestration
//!
//! Runs every section of a [`TestTable`] through an [`Executor`] and folds
//! case verdicts into section and run outcomes. How cases are scheduled is
//! chosen by [`SchedulingPolicy`]; the verdicts are the same either way.

use crate::config::Configuration;
use crate::executor::Executor;
use crate::loader::ModuleLoader;
use crate::plugin::Plugin;
use crate::reporter::Reporter;
use crate::result::Result;
use crate::table::{Section, TestTable};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// How cases and sections are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingPolicy {
    /// Sections in table order, cases in table order, one at a time
    #[default]
    Sequential,
    /// All sections at once, and all cases of a section at once
    Parallel,
}

impl SchedulingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulingPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            other => Err(format!(
                "unknown policy '{other}', expected 'sequential' or 'parallel'"
            )),
        }
    }
}

/// Aggregate of one section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionOutcome {
    pub name: String,
    pub passed: usize,
    pub failed: usize,
    /// Names of the failed cases, in table order
    pub failures: Vec<String>,
}

impl SectionOutcome {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Aggregate of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub sections: Vec<SectionOutcome>,
}

impl RunOutcome {
    /// A run succeeds when every section does; an empty run succeeds
    pub fn is_success(&self) -> bool {
        self.sections.iter().all(SectionOutcome::is_success)
    }

    pub fn passed(&self) -> usize {
        self.sections.iter().map(|section| section.passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.sections.iter().map(|section| section.failed).sum()
    }

    /// `0` on success, `1` otherwise
    pub fn exit_status(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

/// Runs a test table with a default plugin
pub struct Suite {
    executor: Executor,
    default_plugin: Arc<dyn Plugin>,
    policy: SchedulingPolicy,
}

impl Suite {
    pub fn new(executor: Executor, default_plugin: Arc<dyn Plugin>) -> Self {
        Self {
            executor,
            default_plugin,
            policy: SchedulingPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    pub async fn run(&self, table: &TestTable) -> RunOutcome {
        info!(
            "Running {} cases in {} sections ({})",
            table.len(),
            table.sections().count(),
            self.policy
        );

        let sections = match self.policy {
            SchedulingPolicy::Sequential => {
                let mut outcomes = Vec::new();
                for (name, section) in table.sections() {
                    outcomes.push(self.run_section(name, section).await);
                }
                outcomes
            }
            SchedulingPolicy::Parallel => {
                join_all(
                    table
                        .sections()
                        .map(|(name, section)| self.run_section(name, section)),
                )
                .await
            }
        };

        let outcome = RunOutcome { sections };
        self.executor.reporter().summary(&outcome);
        outcome
    }

    async fn run_section(&self, name: &str, section: &Section) -> SectionOutcome {
        debug!("Section {name}: {} cases", section.len());

        let verdicts: Vec<(&str, bool)> = match self.policy {
            SchedulingPolicy::Sequential => {
                let mut verdicts = Vec::with_capacity(section.len());
                for (case_name, case) in section {
                    let passed = self
                        .executor
                        .run(name, case_name, case, &self.default_plugin)
                        .await;
                    verdicts.push((case_name.as_str(), passed));
                }
                verdicts
            }
            SchedulingPolicy::Parallel => {
                join_all(section.iter().map(|(case_name, case)| async move {
                    let passed = self
                        .executor
                        .run(name, case_name, case, &self.default_plugin)
                        .await;
                    (case_name.as_str(), passed)
                }))
                .await
            }
        };

        let mut outcome = SectionOutcome {
            name: name.to_string(),
            ..Default::default()
        };
        for (case_name, passed) in verdicts {
            if passed {
                outcome.passed += 1;
            } else {
                outcome.failed += 1;
                outcome.failures.push(case_name.to_string());
            }
        }

        self.executor.reporter().section(&outcome);
        outcome
    }
}

/// Load the plugin and table named by `config` and run every case
///
/// Only startup failures are returned as errors; case failures are part of
/// the returned outcome.
pub async fn run_suite(
    config: &Configuration,
    loader: &dyn ModuleLoader,
    reporter: Arc<dyn Reporter>,
) -> Result<RunOutcome> {
    let plugin = loader.load_plugin(&config.plugin)?;
    let table = loader.load_table(&config.config)?;

    let executor = Executor::new(&config.fixtures, reporter).with_timeout(config.timeout);
    let suite = Suite::new(executor, plugin).with_policy(config.policy);
    Ok(suite.run(&table).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str, passed: usize, failed: usize) -> SectionOutcome {
        SectionOutcome {
            name: name.to_string(),
            passed,
            failed,
            failures: (0..failed).map(|i| format!("case{i}")).collect(),
        }
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Parallel".parse::<SchedulingPolicy>(), Ok(SchedulingPolicy::Parallel));
        assert_eq!(
            " sequential ".parse::<SchedulingPolicy>(),
            Ok(SchedulingPolicy::Sequential)
        );
        assert!("random".parse::<SchedulingPolicy>().is_err());
        assert_eq!(SchedulingPolicy::default().to_string(), "sequential");
    }

    #[test]
    fn run_fails_when_any_section_fails() {
        let run = RunOutcome {
            sections: vec![section("a", 3, 1), section("b", 2, 0)],
        };
        assert!(!run.is_success());
        assert_eq!(run.passed(), 5);
        assert_eq!(run.failed(), 1);
        assert_eq!(run.exit_status(), 1);
    }

    #[test]
    fn failure_in_an_earlier_section_is_not_masked() {
        let run = RunOutcome {
            sections: vec![section("a", 0, 1), section("b", 4, 0)],
        };
        assert!(!run.is_success());
    }

    #[test]
    fn empty_run_succeeds() {
        assert!(RunOutcome::default().is_success());
        assert_eq!(RunOutcome::default().exit_status(), 0);
    }
}
