//! `--key=value` command-line overrides

use super::merge::OptionLayer;
use regex::Regex;
use serde_json::Value;
use std::ffi::OsString;
use std::sync::LazyLock;

static OPTION_ARG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^--([A-Za-z0-9_-]+)=(.+)$").unwrap());

/// Parse one `--key=value` argument
///
/// A value wrapped in a matching pair of `"` or `'` quotes is unwrapped, as
/// long as something is left between them.
pub fn parse_option_arg(arg: &str) -> Option<(String, String)> {
    let captures = OPTION_ARG_REGEX.captures(arg)?;
    let key = captures[1].to_string();
    let value = unquote(&captures[2]).to_string();
    Some((key, value))
}

/// Split process arguments into option overrides and everything else
///
/// Overrides are applied in argument order, so a repeated key keeps its
/// last value. Keys listed in `reserved` belong to the flag parser and are
/// never taken as overrides. The remaining arguments (including the program
/// name and anything that is not valid UTF-8) are returned untouched for the
/// flag parser.
pub fn split_option_args<I, S>(args: I, reserved: &[&str]) -> (OptionLayer, Vec<OsString>)
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut overrides = OptionLayer::new();
    let mut rest = Vec::new();

    for arg in args {
        let arg = arg.into();
        let parsed = arg.to_str().and_then(parse_option_arg);
        match parsed {
            Some((key, value)) if !reserved.contains(&key.as_str()) => {
                tracing::debug!("Command-line override {}={}", key, value);
                overrides.set(key, Value::String(value));
            }
            _ => rest.push(arg),
        }
    }

    (overrides, rest)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() > 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
