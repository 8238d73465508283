//! Field matchers for expected failures
//!
//! A case may declare that its transform is supposed to fail. The
//! declaration is a set of field matchers checked against the [`Failure`]
//! object: every declared field must match for the failure to count as
//! expected.
//!
//! In a test table a matcher is either a plain value (exact match) or a
//! `{ pattern = "<regex>" }` table (regular expression search):
//!
//! ```toml
//! [errors.missing-include]
//! message = "reports a missing partial"
//! error = { reason = "ENOENT", message = { pattern = "not found" } }
//! ```

use crate::failure::Failure;
use indexmap::IndexMap;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

const PATTERN_KEY: &str = "pattern";

/// Matcher for one field of a failure
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Field must equal this value
    Literal(Value),
    /// Field text must contain a match of this expression
    Pattern(Regex),
}

impl Matcher {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Compile a pattern matcher
    pub fn pattern(expression: &str) -> Result<Self, regex::Error> {
        Regex::new(expression).map(Self::Pattern)
    }

    /// Check the matcher against a failure field; a missing field never matches
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let Some(actual) = actual else {
            return false;
        };

        match self {
            Matcher::Literal(expected) => expected == actual,
            Matcher::Pattern(regex) => match actual {
                Value::String(text) => regex.is_match(text),
                Value::Array(_) | Value::Object(_) => false,
                scalar => regex.is_match(&scalar.to_string()),
            },
        }
    }

    fn from_value(value: Value) -> Result<Self, regex::Error> {
        if let Value::Object(map) = &value
            && map.len() == 1
            && let Some(Value::String(expression)) = map.get(PATTERN_KEY)
        {
            return Self::pattern(expression);
        }
        Ok(Self::Literal(value))
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Matcher::Literal(a), Matcher::Literal(b)) => a == b,
            (Matcher::Pattern(a), Matcher::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl<'de> Deserialize<'de> for Matcher {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Matcher::from_value(value).map_err(D::Error::custom)
    }
}

impl Serialize for Matcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Matcher::Literal(value) => value.serialize(serializer),
            Matcher::Pattern(regex) => {
                let mut map = serde_json::Map::new();
                map.insert(PATTERN_KEY.to_string(), Value::from(regex.as_str()));
                map.serialize(serializer)
            }
        }
    }
}

/// The `error` declaration of a case: field name to matcher
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorExpectation {
    fields: IndexMap<String, Matcher>,
}

impl ErrorExpectation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, matcher: Matcher) -> Self {
        self.fields.insert(field.into(), matcher);
        self
    }

    /// True when every declared field matches; an empty declaration accepts any failure
    pub fn matches(&self, failure: &Failure) -> bool {
        self.fields
            .iter()
            .all(|(field, matcher)| matcher.matches(failure.field(field)))
    }
}
