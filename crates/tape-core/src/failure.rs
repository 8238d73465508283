//! The failure object raised by plugins, the transformer and fixture I/O

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io;
use std::path::Path;

/// Field holding the human-readable cause of a failure
pub const REASON: &str = "reason";
/// Field holding the error message of a failure
pub const MESSAGE: &str = "message";
/// Field holding a non-object failure value
pub const VALUE: &str = "value";

/// A failure raised while running a case
///
/// A failure is a bag of named JSON fields. Expected-error matchers are
/// checked against these fields, so plugins are free to attach whatever
/// they consider diagnostic (`reason`, `message`, `line`, `code`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Failure {
    fields: Map<String, Value>,
}

impl Failure {
    /// Create a failure with only a `message` field
    pub fn message(message: impl Into<String>) -> Self {
        Self::default().with_field(MESSAGE, message.into())
    }

    /// Create a failure with only a `reason` field
    pub fn reason(reason: impl Into<String>) -> Self {
        Self::default().with_field(REASON, reason.into())
    }

    /// Wrap an arbitrary JSON value; objects become the field set
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            other => Self::default().with_field(VALUE, other),
        }
    }

    /// Describe an I/O error on a fixture or module path
    pub fn from_io(path: &Path, err: &io::Error) -> Self {
        Self::message(format!("{}: {}", err, path.display()))
            .with_field("kind", format!("{:?}", err.kind()))
            .with_field("path", path.display().to_string())
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Text used when reporting: `reason`, else `message`, else the raw value
    pub fn summary(&self) -> String {
        for key in [REASON, MESSAGE] {
            match self.fields.get(key) {
                Some(Value::String(text)) if !text.is_empty() => return text.clone(),
                Some(Value::String(_)) | Some(Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
        match self.fields.get(VALUE) {
            Some(Value::String(text)) if self.fields.len() == 1 => text.clone(),
            Some(value) if self.fields.len() == 1 => value.to_string(),
            _ => Value::Object(self.fields.clone()).to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for Failure {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_prefers_reason_over_message() {
        let failure = Failure::message("parse error").with_field(REASON, "unclosed tag");
        assert_eq!(failure.summary(), "unclosed tag");

        let failure = Failure::message("parse error");
        assert_eq!(failure.summary(), "parse error");
    }

    #[test]
    fn summary_falls_back_to_raw_value() {
        assert_eq!(Failure::from_value(json!("boom")).summary(), "boom");
        assert_eq!(Failure::from_value(json!(42)).summary(), "42");

        let failure = Failure::from_value(json!({ "code": "E1" }));
        assert_eq!(failure.summary(), r#"{"code":"E1"}"#);
    }

    #[test]
    fn io_failures_carry_kind_and_path() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file or directory");
        let failure = Failure::from_io(Path::new("/fixtures/missing.html"), &err);

        assert_eq!(failure.field("kind"), Some(&json!("NotFound")));
        assert_eq!(failure.field("path"), Some(&json!("/fixtures/missing.html")));
        assert!(failure.summary().contains("missing.html"));
    }

    #[test]
    fn object_values_become_fields() {
        let failure = Failure::from_value(json!({ "reason": "bad", "line": 3 }));
        assert_eq!(failure.field("line"), Some(&json!(3)));
        assert_eq!(failure.to_string(), "bad");
    }
}
