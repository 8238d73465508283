//! Option layering
//!
//! Each configuration source produces an [`OptionLayer`] of raw key/value
//! pairs. Layers are merged key by key, the later layer winning, and the
//! merged result is interpreted once by [`resolve_config`].

use super::{
    CONFIG_KEY, Configuration, DEFAULT_CONFIG_FILE, DEFAULT_FIXTURES_DIR, FIXTURES_KEY, PLUGIN_KEY,
    POLICY_KEY, TIMEOUT_KEY, absolutize,
};
use crate::error::TapeError;
use crate::result::Result;
use crate::suite::SchedulingPolicy;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Raw options from one configuration source, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionLayer {
    values: IndexMap<String, Value>,
}

impl OptionLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in defaults for a working directory
    pub fn defaults(cwd: &Path) -> Self {
        let mut layer = Self::new();
        layer.set(PLUGIN_KEY, path_value(cwd));
        layer.set(CONFIG_KEY, path_value(&cwd.join(DEFAULT_CONFIG_FILE)));
        layer.set(FIXTURES_KEY, path_value(&cwd.join(DEFAULT_FIXTURES_DIR)));
        layer.set(POLICY_KEY, Value::from(SchedulingPolicy::default().as_str()));
        layer
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            values: map.into_iter().collect(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge a later layer into this one (the other layer takes precedence)
    pub fn merge_with(&mut self, other: OptionLayer) {
        for (key, value) in other.values {
            self.values.insert(key, value);
        }
    }
}

/// Layer defaults, manifest options and argument overrides into a configuration
///
/// Touches no files: every path is resolved lexically against `cwd`, which
/// must be absolute.
pub fn resolve_config(
    cwd: &Path,
    defaults: OptionLayer,
    manifest: Option<OptionLayer>,
    args: OptionLayer,
) -> Result<Configuration> {
    let mut merged = defaults;
    if let Some(manifest) = manifest {
        merged.merge_with(manifest);
    }
    merged.merge_with(args);

    let mut values = merged.values;
    let plugin = take_path(&mut values, PLUGIN_KEY, cwd)?;
    let config = take_path(&mut values, CONFIG_KEY, cwd)?;
    let fixtures = take_path(&mut values, FIXTURES_KEY, cwd)?;
    let policy = take_policy(&mut values)?;
    let timeout = take_timeout(&mut values)?;

    Ok(Configuration {
        cwd: cwd.to_path_buf(),
        plugin,
        config,
        fixtures,
        policy,
        timeout,
        extra: values,
    })
}

fn path_value(path: &Path) -> Value {
    Value::from(path.to_string_lossy().into_owned())
}

fn take_path(values: &mut IndexMap<String, Value>, key: &str, cwd: &Path) -> Result<PathBuf> {
    match values.shift_remove(key) {
        Some(Value::String(path)) if !path.is_empty() => Ok(absolutize(cwd, Path::new(&path))),
        Some(other) => Err(TapeError::invalid_option(
            key,
            format!("expected a non-empty path, found {other}"),
        )),
        None => Err(TapeError::invalid_option(key, "missing value")),
    }
}

fn take_policy(values: &mut IndexMap<String, Value>) -> Result<SchedulingPolicy> {
    match values.shift_remove(POLICY_KEY) {
        None | Some(Value::Null) => Ok(SchedulingPolicy::default()),
        Some(Value::String(policy)) => policy
            .parse()
            .map_err(|message: String| TapeError::invalid_option(POLICY_KEY, message)),
        Some(other) => Err(TapeError::invalid_option(
            POLICY_KEY,
            format!("expected 'sequential' or 'parallel', found {other}"),
        )),
    }
}

/// Milliseconds, as a number or numeric string; `0` disables the timeout
fn take_timeout(values: &mut IndexMap<String, Value>) -> Result<Option<Duration>> {
    let millis = match values.shift_remove(TIMEOUT_KEY) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        Some(_) => None,
    };

    match millis {
        Some(0) => Ok(None),
        Some(ms) => Ok(Some(Duration::from_millis(ms))),
        None => Err(TapeError::invalid_option(
            TIMEOUT_KEY,
            "expected a whole number of milliseconds",
        )),
    }
}
