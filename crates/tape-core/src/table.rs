//! Test table: sections of named cases
//!
//! A table is usually read from a file (see [`crate::loader`]), but it can
//! be assembled in code as well, which is how Rust plugins get tested
//! without going through an executable:
//!
//! ```
//! use tape_core::{ErrorExpectation, Matcher, TestCase, TestTable};
//!
//! let mut table = TestTable::new();
//! table.add("basic", "identity", TestCase::new("keeps markup untouched"));
//! table.add(
//!     "errors",
//!     "missing",
//!     TestCase::new("reports missing partials").with_error(
//!         ErrorExpectation::new().with("message", Matcher::pattern("not found").unwrap()),
//!     ),
//! );
//! assert_eq!(table.len(), 2);
//! ```

use crate::fixtures::FixtureOverrides;
use crate::matcher::ErrorExpectation;
use crate::plugin::{Hook, Plugin};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One case of a section
#[derive(Clone, Default)]
pub struct TestCase {
    /// Human-readable description shown in reports
    pub message: String,
    /// Options handed to the plugin; `None` instantiates it without options
    pub options: Option<Value>,
    /// Replaces the default plugin for this case only
    pub plugin: Option<Arc<dyn Plugin>>,
    pub source: Option<PathBuf>,
    pub expect: Option<PathBuf>,
    pub result: Option<PathBuf>,
    /// The transform is expected to fail with a matching failure
    pub error: Option<ErrorExpectation>,
    pub before: Option<Arc<dyn Hook>>,
    pub after: Option<Arc<dyn Hook>>,
}

impl TestCase {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugin = Some(Arc::new(plugin));
        self
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_expect(mut self, expect: impl Into<PathBuf>) -> Self {
        self.expect = Some(expect.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<PathBuf>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_error(mut self, error: ErrorExpectation) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_before(mut self, hook: impl Hook + 'static) -> Self {
        self.before = Some(Arc::new(hook));
        self
    }

    pub fn with_after(mut self, hook: impl Hook + 'static) -> Self {
        self.after = Some(Arc::new(hook));
        self
    }

    pub fn fixture_overrides(&self) -> FixtureOverrides<'_> {
        FixtureOverrides {
            source: self.source.as_deref(),
            expect: self.expect.as_deref(),
            result: self.result.as_deref(),
        }
    }

    /// Text shown for this case: its message, or the case name without one
    pub fn label<'a>(&'a self, name: &'a str) -> &'a str {
        if self.message.is_empty() {
            name
        } else {
            &self.message
        }
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("message", &self.message)
            .field("options", &self.options)
            .field("plugin", &self.plugin.as_ref().map(|plugin| plugin.name()))
            .field("source", &self.source)
            .field("expect", &self.expect)
            .field("result", &self.result)
            .field("error", &self.error)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// Cases of one section, by name, in declaration order
pub type Section = IndexMap<String, TestCase>;

/// Sections by name, in declaration order
#[derive(Debug, Clone, Default)]
pub struct TestTable {
    sections: IndexMap<String, Section>,
}

impl TestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a case, creating its section on first use
    ///
    /// Adding a name twice to a section replaces the earlier case in place.
    pub fn add(&mut self, section: impl Into<String>, name: impl Into<String>, case: TestCase) {
        self.sections
            .entry(section.into())
            .or_default()
            .insert(name.into(), case);
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections
            .iter()
            .map(|(name, section)| (name.as_str(), section))
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Total number of cases
    pub fn len(&self) -> usize {
        self.sections.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A case as written in a table file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseSpec {
    #[serde(default)]
    pub message: String,
    pub options: Option<Value>,
    /// Plugin module for this case, relative to the table file
    pub plugin: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub expect: Option<PathBuf>,
    pub result: Option<PathBuf>,
    pub error: Option<ErrorExpectation>,
    /// Command run before the case, as `[program, args...]`
    pub before: Option<Vec<String>>,
    /// Command run after the case, as `[program, args...]`
    pub after: Option<Vec<String>>,
}

/// A table file: section name to case name to case
pub type TableSpec = IndexMap<String, IndexMap<String, CaseSpec>>;

impl CaseSpec {
    /// Path of the case plugin module, resolved against `base_dir`
    pub fn plugin_path(&self, base_dir: &Path) -> Option<PathBuf> {
        self.plugin.as_ref().map(|plugin| base_dir.join(plugin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::FnPlugin;

    #[test]
    fn add_preserves_declaration_order() {
        let mut table = TestTable::new();
        table.add("zeta", "b", TestCase::new("b"));
        table.add("alpha", "a", TestCase::new("a"));
        table.add("zeta", "a", TestCase::new("a"));

        let sections: Vec<_> = table.sections().map(|(name, _)| name).collect();
        assert_eq!(sections, vec!["zeta", "alpha"]);

        let cases: Vec<_> = table.section("zeta").unwrap().keys().cloned().collect();
        assert_eq!(cases, vec!["b", "a"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn label_falls_back_to_case_name() {
        assert_eq!(TestCase::default().label("layout:min"), "layout:min");
        assert_eq!(TestCase::new("minified").label("layout:min"), "minified");
    }

    #[test]
    fn builder_sets_overrides() {
        let case = TestCase::new("identity")
            .with_source("id.html")
            .with_plugin(FnPlugin::new("identity", |_, doc| Ok(doc.to_string())));

        assert_eq!(case.fixture_overrides().source, Some(Path::new("id.html")));
        assert!(case.fixture_overrides().expect.is_none());
        assert!(format!("{case:?}").contains("identity"));
    }

    #[test]
    fn case_spec_rejects_unknown_fields() {
        let result: Result<CaseSpec, _> =
            serde_json::from_str(r#"{ "message": "x", "expected": "typo.html" }"#);
        assert!(result.is_err());
    }
}
