//! Input sanitization.
//!
//! Coercion here is total: every function returns a value of the target
//! type, degrading invalid input to a default or an empty value instead of
//! failing. Deciding that a degraded value is unacceptable is the caller's
//! concern, raised as a `MissingParameters` or `Validation` error.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static TAG_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern compiles"));

static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("email pattern compiles")
});

/// Symbols a password must draw at least one character from.
const PASSWORD_SYMBOLS: &str = "!@#-_~$%^&*()";

/// Options for [`sanitize_string`].
#[derive(Debug, Clone)]
pub struct StringOptions {
    /// Trim surrounding whitespace. On by default.
    pub trim: bool,
    /// Keep tag-like markup instead of stripping it. Off by default.
    pub allow_markup: bool,
    /// Truncate to at most this many characters.
    pub max_length: Option<usize>,
}

impl Default for StringOptions {
    fn default() -> Self {
        Self {
            trim: true,
            allow_markup: false,
            max_length: None,
        }
    }
}

/// Options for [`sanitize_integer`].
#[derive(Debug, Clone, Default)]
pub struct IntegerOptions {
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Returned when the value does not parse as an integer.
    pub default: i64,
}

/// Options for [`sanitize_float`].
#[derive(Debug, Clone, Default)]
pub struct FloatOptions {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: f64,
    /// Round to this many decimal places.
    pub decimals: Option<u32>,
}

/// Options for [`sanitize_boolean`].
#[derive(Debug, Clone, Default)]
pub struct BooleanOptions {
    /// Returned for null or empty input.
    pub default: bool,
}

/// Options for [`sanitize_url`].
#[derive(Debug, Clone)]
pub struct UrlOptions {
    pub allowed_schemes: Vec<String>,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
        }
    }
}

/// Scalar view of a JSON value. Arrays and objects have no scalar form.
fn scalar(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Coerce to a bounded string: trim, strip tag-like markup, drop NUL bytes,
/// truncate.
pub fn sanitize_string(value: &Value, options: &StringOptions) -> String {
    let Some(raw) = scalar(value) else {
        return String::new();
    };

    let mut sanitized = raw.into_owned();

    if options.trim {
        sanitized = sanitized.trim().to_string();
    }

    if !options.allow_markup {
        sanitized = TAG_LIKE.replace_all(&sanitized, "").into_owned();
    }

    sanitized = sanitized.replace('\0', "");

    if let Some(max) = options.max_length {
        if sanitized.chars().count() > max {
            sanitized = sanitized.chars().take(max).collect();
        }
    }

    sanitized
}

/// Coerce to an integer. Parse failures (including floats and trailing
/// garbage) return the default; the result is clamped to `[min, max]`.
pub fn sanitize_integer(value: &Value, options: &IntegerOptions) -> i64 {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    let mut sanitized = match parsed {
        Some(v) => v,
        None => return options.default,
    };

    if let Some(min) = options.min {
        sanitized = sanitized.max(min);
    }
    if let Some(max) = options.max {
        sanitized = sanitized.min(max);
    }

    sanitized
}

/// Coerce to a float: parse failure returns the default; rounded to
/// `decimals` places, then clamped.
pub fn sanitize_float(value: &Value, options: &FloatOptions) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    let mut sanitized = match parsed {
        Some(v) => v,
        None => return options.default,
    };

    if let Some(decimals) = options.decimals {
        let factor = 10f64.powi(decimals as i32);
        sanitized = (sanitized * factor).round() / factor;
    }

    if let Some(min) = options.min {
        sanitized = sanitized.max(min);
    }
    if let Some(max) = options.max {
        sanitized = sanitized.min(max);
    }

    sanitized
}

/// Coerce to a boolean. Null and empty input take the default; the strings
/// "true", "1", and "yes" (case-insensitive) are true, any other string is
/// false; numbers are true when non-zero.
pub fn sanitize_boolean(value: &Value, options: &BooleanOptions) -> bool {
    match value {
        Value::Null => options.default,
        Value::Bool(b) => *b,
        Value::String(s) => {
            if s.is_empty() {
                options.default
            } else {
                matches!(s.to_lowercase().as_str(), "true" | "1" | "yes")
            }
        }
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(options.default),
        Value::Array(_) | Value::Object(_) => options.default,
    }
}

/// Coerce to a lower-cased email address, stripping any character outside
/// `[a-z0-9@._+-]`. Anything that does not then look like an address
/// degrades to an empty string.
pub fn sanitize_email(value: &Value) -> String {
    let Some(raw) = scalar(value) else {
        return String::new();
    };

    let sanitized: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "@._+-".contains(*c))
        .collect();

    if !EMAIL_SHAPE.is_match(&sanitized) {
        return String::new();
    }

    sanitized
}

/// Validate a password: 8–20 characters, at least one digit, one uppercase,
/// one lowercase, one symbol from a fixed set, and no whitespace. Invalid
/// passwords degrade to an empty string; valid ones pass through untouched.
pub fn sanitize_password(value: &Value) -> String {
    let Some(raw) = scalar(value) else {
        return String::new();
    };

    let sanitized = raw.trim().to_string();
    let length = sanitized.chars().count();

    let valid = (8..=20).contains(&length)
        && sanitized.chars().any(|c| c.is_ascii_digit())
        && sanitized.chars().any(|c| c.is_ascii_uppercase())
        && sanitized.chars().any(|c| c.is_ascii_lowercase())
        && sanitized.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
        && !sanitized.chars().any(char::is_whitespace);

    if valid { sanitized } else { String::new() }
}

/// Validate an absolute URL whose scheme is in the allow-list. Invalid
/// input degrades to an empty string.
pub fn sanitize_url(value: &Value, options: &UrlOptions) -> String {
    let Some(raw) = scalar(value) else {
        return String::new();
    };

    let sanitized = raw.trim().to_string();

    match url::Url::parse(&sanitized) {
        Ok(parsed) if options.allowed_schemes.iter().any(|s| s == parsed.scheme()) => sanitized,
        _ => String::new(),
    }
}
