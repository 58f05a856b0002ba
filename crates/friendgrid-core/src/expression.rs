//! Template resolution for parameter and credential expressions.
//!
//! Supports the subset of the host's expression syntax nodes rely on:
//! `{{ $json.field }}` placeholders inside parameter values and
//! `{{$credentials.field}}` placeholders inside authentication templates.
//! A string is only treated as an expression when it starts with `=`.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Result type for expression operations.
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Expression evaluation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("Undefined variable: ${0}")]
    UndefinedVariable(String),

    #[error("Unterminated placeholder in: {0}")]
    Unterminated(String),
}

/// Source of values for `$<root>.<path>` lookups.
pub trait VariableResolver {
    /// Resolve `path` (dotted, may be empty) under `root`.
    ///
    /// `Ok(None)` means the root exists but the path does not; it renders as
    /// an empty string. An unknown root is an error.
    fn resolve(&self, root: &str, path: &str) -> ExpressionResult<Option<Value>>;
}

impl<F> VariableResolver for F
where
    F: Fn(&str, &str) -> ExpressionResult<Option<Value>>,
{
    fn resolve(&self, root: &str, path: &str) -> ExpressionResult<Option<Value>> {
        self(root, path)
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*\$([A-Za-z_][A-Za-z0-9_]*)((?:\.[A-Za-z0-9_\-]+)*)\s*\}\}")
            .expect("placeholder pattern is valid")
    })
}

/// Render a value the way it appears inside an interpolated string.
fn render(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

fn push_literal(out: &mut String, literal: &str, template: &str) -> ExpressionResult<()> {
    if literal.contains("{{") {
        return Err(ExpressionError::Unterminated(template.to_string()));
    }
    out.push_str(literal);
    Ok(())
}

/// Replace every placeholder in `template` and return the resulting string.
pub fn resolve_template(template: &str, resolver: &dyn VariableResolver) -> ExpressionResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in placeholder().captures_iter(template) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let root = caps.get(1).map_or("", |m| m.as_str());
        let path = caps.get(2).map_or("", |m| m.as_str().trim_start_matches('.'));

        push_literal(&mut out, &template[last..whole.start], template)?;
        out.push_str(&render(resolver.resolve(root, path)?));
        last = whole.end;
    }
    push_literal(&mut out, &template[last..], template)?;

    Ok(out)
}

/// Evaluate a parameter string.
///
/// Plain strings are returned untouched. For expressions (leading `=`), an
/// expression that is exactly one placeholder keeps the resolved value's type;
/// anything else is interpolated into a string.
pub fn evaluate(value: &str, resolver: &dyn VariableResolver) -> ExpressionResult<Value> {
    let Some(expression) = value.strip_prefix('=') else {
        return Ok(Value::String(value.to_string()));
    };

    let trimmed = expression.trim();
    if let Some(caps) = placeholder().captures(trimmed) {
        if caps.get(0).map(|m| m.as_str().len()) == Some(trimmed.len()) {
            let root = caps.get(1).map_or("", |m| m.as_str());
            let path = caps.get(2).map_or("", |m| m.as_str().trim_start_matches('.'));
            return Ok(resolver
                .resolve(root, path)?
                .unwrap_or_else(|| Value::String(String::new())));
        }
    }

    resolve_template(expression, resolver).map(Value::String)
}

/// Evaluate every string inside a JSON value, recursing into objects and arrays.
pub fn resolve_parameter(value: &Value, resolver: &dyn VariableResolver) -> ExpressionResult<Value> {
    match value {
        Value::String(s) => evaluate(s, resolver),
        Value::Object(obj) => {
            let mut result = serde_json::Map::new();
            for (k, v) in obj {
                result.insert(k.clone(), resolve_parameter(v, resolver)?);
            }
            Ok(Value::Object(result))
        }
        Value::Array(arr) => {
            let result: Result<Vec<_>, _> =
                arr.iter().map(|v| resolve_parameter(v, resolver)).collect();
            Ok(Value::Array(result?))
        }
        _ => Ok(value.clone()),
    }
}

/// Walk a dotted path through a JSON value.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?),
        _ => None,
    })
}
