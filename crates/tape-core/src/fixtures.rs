//! Fixture path derivation
//!
//! Every case owns three files under the fixtures directory. For a case
//! named `base:variant`:
//!
//! | file   | default name                  |
//! |--------|-------------------------------|
//! | source | `base.html`                   |
//! | expect | `base.variant.expect.html`    |
//! | result | `base.variant.result.html`    |
//!
//! Variants share their source document but keep distinct expectations and
//! results. Explicit overrides are resolved against the fixtures directory.

use std::path::{Path, PathBuf};

pub const FIXTURE_EXTENSION: &str = "html";
const VARIANT_SEPARATOR: char = ':';

/// Explicit `source`/`expect`/`result` overrides declared by a case
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureOverrides<'a> {
    pub source: Option<&'a Path>,
    pub expect: Option<&'a Path>,
    pub result: Option<&'a Path>,
}

/// The three fixture files of one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixturePaths {
    pub source: PathBuf,
    pub expect: PathBuf,
    pub result: PathBuf,
}

impl FixturePaths {
    pub fn derive(fixtures: &Path, name: &str, overrides: FixtureOverrides<'_>) -> Self {
        let base = base_name(name);
        let full = dotted_name(name);

        let resolve = |explicit: Option<&Path>, default: String| match explicit {
            Some(path) => fixtures.join(path),
            None => fixtures.join(default),
        };

        Self {
            source: resolve(overrides.source, format!("{base}.{FIXTURE_EXTENSION}")),
            expect: resolve(overrides.expect, format!("{full}.expect.{FIXTURE_EXTENSION}")),
            result: resolve(overrides.result, format!("{full}.result.{FIXTURE_EXTENSION}")),
        }
    }
}

/// `name` up to the first variant separator
pub fn base_name(name: &str) -> &str {
    name.split(VARIANT_SEPARATOR).next().unwrap_or(name)
}

/// `name` with every variant separator replaced by a dot
pub fn dotted_name(name: &str) -> String {
    name.replace(VARIANT_SEPARATOR, ".")
}
