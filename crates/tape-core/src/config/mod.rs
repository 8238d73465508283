//! Runner configuration
//!
//! The runner is configured by three layers, in increasing precedence:
//!
//! 1. Built-in defaults ([`OptionLayer::defaults`])
//! 2. The `reshape-tape` section of the project manifest, either
//!    `[package.metadata.reshape-tape]` in `Cargo.toml` or `reshapeConfig`
//!    in `package.json`
//! 3. `--key=value` command-line overrides, later arguments winning
//!
//! ```toml
//! [package.metadata.reshape-tape]
//! plugin = "target/release/my-plugin"
//! fixtures = "tests/fixtures"
//! policy = "parallel"
//! timeout = 5000
//! ```
//!
//! Only `plugin`, `config`, `fixtures`, `policy` and `timeout` are
//! interpreted. Any other key is carried through in
//! [`Configuration::extra`].

mod args;
mod loader;
mod merge;

pub use args::{parse_option_arg, split_option_args};
pub use loader::{CARGO_MANIFEST, ConfigLoader, MANIFEST_SECTION, PACKAGE_MANIFEST, PACKAGE_SECTION};
pub use merge::{OptionLayer, resolve_config};

use crate::suite::SchedulingPolicy;
use indexmap::IndexMap;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Default test table file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = ".tape.toml";
/// Default fixtures directory, relative to the working directory
pub const DEFAULT_FIXTURES_DIR: &str = "test";

pub const PLUGIN_KEY: &str = "plugin";
pub const CONFIG_KEY: &str = "config";
pub const FIXTURES_KEY: &str = "fixtures";
pub const POLICY_KEY: &str = "policy";
pub const TIMEOUT_KEY: &str = "timeout";

/// Fully resolved runner configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Directory the paths below were resolved against
    pub cwd: PathBuf,
    /// Default plugin module
    pub plugin: PathBuf,
    /// Test table file
    pub config: PathBuf,
    /// Directory holding source, expect and result fixtures
    pub fixtures: PathBuf,
    pub policy: SchedulingPolicy,
    /// Upper bound for the transform stage of one case
    pub timeout: Option<Duration>,
    /// Keys the runner does not interpret
    pub extra: IndexMap<String, Value>,
}

/// Resolve `path` against `cwd` and drop `.`/`..` components lexically
pub fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    let joined = cwd.join(path);
    let mut normalized = PathBuf::new();

    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}
