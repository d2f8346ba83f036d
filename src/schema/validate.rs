//! Local argument validation against an [`InputShape`].
//!
//! Runs once per tool call, before the arguments are parsed into the tool's
//! typed parameters. Everything the shape can express (required fields,
//! types, enums, bounds, patterns) is rejected here instead of costing a
//! round trip and a remote 422. All violations are reported together.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use regex::Regex;
use serde_json::Value;

use super::{Field, FieldKind, InputShape};

/// Compiled field patterns, keyed by their source text.
static PATTERNS: LazyLock<Mutex<HashMap<&'static str, Regex>>> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// Compile `pattern` once and hand out clones (a `Regex` clone shares the
/// compiled program).
fn compiled(pattern: &'static str) -> Result<Regex, regex::Error> {
    let mut cache = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(re) = cache.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)?;
    cache.insert(pattern, re.clone());
    Ok(re)
}

/// Check `arguments` against `shape`. `null` is treated as an empty object.
pub fn validate(shape: &InputShape, arguments: &Value) -> Result<(), Vec<String>> {
    let mut violations = Vec::new();
    match arguments {
        Value::Null => check_fields(&shape.fields, &serde_json::Map::new(), "", &mut violations),
        Value::Object(map) => check_fields(&shape.fields, map, "", &mut violations),
        other => violations.push(format!("arguments: expected an object, got {}", type_of(other))),
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check_fields(
    fields: &[Field],
    map: &serde_json::Map<String, Value>,
    prefix: &str,
    violations: &mut Vec<String>,
) {
    for field in fields {
        let path = format!("{prefix}{}", field.name);
        match map.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    violations.push(format!("{path}: required field is missing"));
                }
            }
            Some(value) => check_value(&field.kind, value, &path, violations),
        }
    }
}

fn check_value(kind: &FieldKind, value: &Value, path: &str, violations: &mut Vec<String>) {
    match (kind, value) {
        (FieldKind::String { one_of, pattern }, Value::String(s)) => {
            if let Some(allowed) = one_of {
                if !allowed.contains(&s.as_str()) {
                    violations.push(format!("{path}: must be one of {}", allowed.join(", ")));
                }
            }
            if let Some(p) = pattern {
                match compiled(p) {
                    Ok(re) if re.is_match(s) => {}
                    Ok(_) => violations.push(format!("{path}: does not match pattern {p}")),
                    Err(e) => violations.push(format!("{path}: invalid pattern {p}: {e}")),
                }
            }
        }
        (FieldKind::Integer { minimum, maximum }, Value::Number(n)) => {
            let Some(n) = n.as_i64() else {
                violations.push(format!("{path}: expected an integer"));
                return;
            };
            if let Some(min) = minimum {
                if n < *min {
                    violations.push(format!("{path}: must be >= {min}"));
                }
            }
            if let Some(max) = maximum {
                if n > *max {
                    violations.push(format!("{path}: must be <= {max}"));
                }
            }
        }
        (FieldKind::Boolean, Value::Bool(_)) => {}
        (FieldKind::Array { items, min_items }, Value::Array(values)) => {
            if let Some(min) = min_items {
                if values.len() < *min {
                    violations.push(format!("{path}: must contain at least {min} item(s)"));
                }
            }
            for (i, item) in values.iter().enumerate() {
                check_value(items, item, &format!("{path}[{i}]"), violations);
            }
        }
        (FieldKind::Object(fields), Value::Object(map)) => {
            check_fields(fields, map, &format!("{path}."), violations);
        }
        (kind, other) => violations.push(format!(
            "{path}: expected {}, got {}",
            kind.type_name(),
            type_of(other)
        )),
    }
}

const fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
