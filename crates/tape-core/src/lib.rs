//! reshape-tape core
//!
//! Fixture-based conformance testing for document transform plugins. A run
//! feeds each case's source document through the plugin under test, writes
//! what it rendered next to the fixtures, and compares it against the stored
//! expectation or an expected failure.
//!
//! The pieces, leaf first:
//!
//! - [`config`]: layered option resolution
//! - [`fixtures`]: source/expect/result path derivation
//! - [`failure`] and [`matcher`]: failure objects and expected errors
//! - [`plugin`] and [`command`]: plugin, transformer and hook seams
//! - [`loader`] and [`table`]: plugin modules and test tables
//! - [`executor`]: one case
//! - [`suite`]: sections, scheduling and the run outcome
//! - [`reporter`]: console and in-memory reporting

pub mod command;
pub mod config;
pub mod console;
pub mod diff;
pub mod error;
pub mod executor;
pub mod failure;
pub mod fixtures;
pub mod loader;
pub mod matcher;
pub mod plugin;
pub mod reporter;
pub mod result;
pub mod store;
pub mod suite;
pub mod table;

pub use command::{CommandHook, CommandPlugin};
pub use config::{ConfigLoader, Configuration, OptionLayer, resolve_config, split_option_args};
pub use console::{Color, Console};
pub use error::{ErrorKind, TapeError};
pub use executor::{CaseOutcome, Executor};
pub use failure::Failure;
pub use fixtures::{FixtureOverrides, FixturePaths};
pub use loader::{FsModuleLoader, ModuleLoader};
pub use matcher::{ErrorExpectation, Matcher};
pub use plugin::{
    FnHook, FnPlugin, Hook, Pipeline, Plugin, PluginInstance, ProcessOptions, TransformContext,
    Transformer,
};
pub use reporter::{
    CaseRef, ConsoleReporter, FailureDetail, RecordingReporter, ReportEvent, Reporter,
};
pub use result::{Result, ResultExt};
pub use store::{DiskStore, FixtureStore};
pub use suite::{RunOutcome, SchedulingPolicy, SectionOutcome, Suite, run_suite};
pub use table::{TestCase, TestTable};

/// Initialize logging to stderr
///
/// `RUST_LOG` takes precedence over `default_directive`.
pub fn init_tracing(default_directive: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
