//! Best-effort recovery of key/value mappings from malformed JSON text.
//!
//! Agents frequently hand over "JSON" with single quotes, unquoted string
//! values, unquoted keys or trailing commas. Recovery tries, in order:
//!
//! 1. a strict parse;
//! 2. a strict parse after textual repairs (quote normalization, quoting of
//!    bare-word values, trailing-comma removal);
//! 3. a flat manual split on commas and the first colon of each pair.
//!
//! The manual split is not recursive: nested objects, arrays and escaped
//! delimiters degrade to verbatim substrings. Recovery never fails; an empty
//! mapping is an ordinary result.

use crate::models::JsonMap;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

/// Recover a mapping from text that is supposed to encode a JSON object.
pub fn recover_object(raw: &str) -> JsonMap {
    if raw.trim().is_empty() {
        return JsonMap::new();
    }

    if let Some(map) = parse_object(raw) {
        return map;
    }

    if let Some(map) = parse_object(&repair(raw)) {
        return map;
    }

    split_pairs(raw)
}

/// Normalize an untyped payload into a mapping.
///
/// Objects pass through, strings go through [`recover_object`], and anything
/// else (null, numbers, arrays) yields an empty mapping.
pub fn recover_value(value: &JsonValue) -> JsonMap {
    match value {
        JsonValue::Object(map) => map.clone(),
        JsonValue::String(raw) => recover_object(raw),
        _ => JsonMap::new(),
    }
}

fn parse_object(text: &str) -> Option<JsonMap> {
    match serde_json::from_str::<JsonValue>(text) {
        Ok(JsonValue::Object(map)) => Some(map),
        _ => None,
    }
}

/// Apply the textual repairs in sequence.
pub fn repair(raw: &str) -> String {
    let fixed = raw.replace('\'', "\"");
    let fixed = bare_value_regex().replace_all(&fixed, |caps: &Captures<'_>| {
        let word = &caps[1];
        if matches!(word, "true" | "false" | "null") {
            format!(": {}{}", word, &caps[2])
        } else {
            format!(": \"{}\"{}", word, &caps[2])
        }
    });
    let fixed = trailing_brace_comma_regex().replace_all(&fixed, "}");
    trailing_bracket_comma_regex()
        .replace_all(&fixed, "]")
        .into_owned()
}

fn split_pairs(raw: &str) -> JsonMap {
    let mut result = JsonMap::new();
    let content = raw.trim().trim_matches(|c| c == '{' || c == '}');
    if content.is_empty() {
        return result;
    }

    for pair in content.split(',') {
        if let Some((key, value)) = pair.split_once(':') {
            result.insert(
                strip_quotes(key).to_string(),
                JsonValue::String(strip_quotes(value).to_string()),
            );
        }
    }
    result
}

fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// An identifier after a colon, directly followed by `,` or `}`.
fn bare_value_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r":\s*([a-zA-Z_][\w.-]*)\s*([,}])").expect("bare value regex should compile")
    })
}

fn trailing_brace_comma_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r",\s*\}").expect("trailing comma regex should compile"))
}

fn trailing_bracket_comma_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r",\s*\]").expect("trailing comma regex should compile"))
}
