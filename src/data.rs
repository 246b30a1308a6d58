use std::{fmt, sync::OnceLock};

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A flat record: field name mapped to a JSON scalar, in source order.
///
/// The first record of a dataset sample is authoritative for field order
/// and field typing; later records may omit fields or disagree on types.
pub type Record = serde_json::Map<String, Value>;

/// Field classification derived from the first non-null value observed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
    Boolean,
    Object,
    Empty,
}

impl FieldType {
    pub fn of(value: &Value) -> FieldType {
        match value {
            Value::Number(_) => FieldType::Number,
            Value::String(_) => FieldType::String,
            Value::Bool(_) => FieldType::Boolean,
            Value::Array(_) | Value::Object(_) => FieldType::Object,
            Value::Null => FieldType::Empty,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldType::Number => "number",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Empty => "empty",
        };
        write!(f, "{label}")
    }
}

/// Coerces a raw text cell into a JSON scalar.
///
/// Values that parse as finite numbers become numbers (integers keep an
/// integer representation); everything else is kept as a trimmed string.
/// Empty or whitespace-only cells become null so that downstream
/// empty-field detection sees an absent value rather than zero.
pub fn coerce_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = trimmed.parse::<f64>()
        && float.is_finite()
        && let Some(number) = serde_json::Number::from_f64(float)
    {
        return Value::Number(number);
    }
    Value::String(trimmed.to_string())
}

/// Numeric reading of a scalar: a JSON number, or a non-empty string that
/// parses losslessly to a finite number. Used wherever numeric-looking
/// values contribute to statistics or metadata ranges.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|parsed| parsed.is_finite())
        }
        _ => None,
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

fn date_shape_patterns() -> &'static [Regex; 4] {
    static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$").expect("valid iso date pattern"),
            Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("valid slash date pattern"),
            Regex::new(r"^\d{1,2}-\d{1,2}-\d{4}$").expect("valid dash date pattern"),
            Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}").expect("valid datetime pattern"),
        ]
    })
}

/// Whether a string is date-like: it must match one of the date shape
/// patterns AND actually parse as a calendar date. Shape alone is not
/// enough ("99-99-9999" has the shape but is not a date).
pub fn is_date_string(value: &str) -> bool {
    let trimmed = value.trim();
    if !date_shape_patterns()
        .iter()
        .any(|pattern| pattern.is_match(trimmed))
    {
        return false;
    }
    parse_naive_date(trimmed).is_ok() || parse_naive_datetime(trimmed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_cell_parses_numbers_and_keeps_strings() {
        assert_eq!(coerce_cell("42"), json!(42));
        assert_eq!(coerce_cell(" 3.5 "), json!(3.5));
        assert_eq!(coerce_cell("-0.25"), json!(-0.25));
        assert_eq!(coerce_cell("Alice "), json!("Alice"));
        assert_eq!(coerce_cell(""), Value::Null);
        assert_eq!(coerce_cell("   "), Value::Null);
    }

    #[test]
    fn coerce_cell_rejects_non_finite_numbers() {
        assert_eq!(coerce_cell("NaN"), json!("NaN"));
        assert_eq!(coerce_cell("inf"), json!("inf"));
    }

    #[test]
    fn numeric_value_reads_numbers_and_numeric_strings() {
        assert_eq!(numeric_value(&json!(7)), Some(7.0));
        assert_eq!(numeric_value(&json!("12.5")), Some(12.5));
        assert_eq!(numeric_value(&json!("12kWh")), None);
        assert_eq!(numeric_value(&json!(true)), None);
        assert_eq!(numeric_value(&Value::Null), None);
    }

    #[test]
    fn field_type_follows_scalar_kind() {
        assert_eq!(FieldType::of(&json!(1.5)), FieldType::Number);
        assert_eq!(FieldType::of(&json!("a")), FieldType::String);
        assert_eq!(FieldType::of(&json!(false)), FieldType::Boolean);
        assert_eq!(FieldType::of(&Value::Null), FieldType::Empty);
    }

    #[test]
    fn date_detection_requires_shape_and_parseability() {
        assert!(is_date_string("2023-01-15"));
        assert!(is_date_string("15/01/2023"));
        assert!(is_date_string("2023-01-15T08:30:00"));
        assert!(!is_date_string("99-99-9999"));
        assert!(!is_date_string("2023-13-45"));
        assert!(!is_date_string("not a date"));
        assert!(!is_date_string("20230115"));
    }
}
