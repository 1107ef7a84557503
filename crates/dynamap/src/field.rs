//! # Field Descriptors
//!
//! A [`FieldDescriptor`] declares one attribute of a record type: its name,
//! whether empty values are acceptable, an optional default, and the
//! [`Coerce`] capability that turns raw input into the stored representation.
//!
//! The built-in coercers cover the usual scalar types. Anything else plugs in
//! by implementing [`Coerce`] and passing it to [`FieldDescriptor::new`].
//!
//! ```rust
//! use dynamap::field::FieldDescriptor;
//! use serde_json::json;
//!
//! let amount = FieldDescriptor::integer("amount").default(json!(1));
//! assert_eq!(amount.clean(&json!("42")).unwrap(), json!(42));
//! assert!(amount.clean(&json!("forty-two")).is_err());
//! ```

use crate::value::{is_empty_value, Value};
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt::Debug;
use std::sync::Arc;

/// Date format used for stored calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Converts a raw attribute value into its native form.
///
/// `Err` carries a human readable message; the clean pass collects these per
/// field into a [`ValidationErrors`](crate::ValidationErrors).
pub trait Coerce: Send + Sync + Debug {
    fn to_native(&self, raw: &Value) -> Result<Value, String>;

    /// Date/time fields get "today" as their fallback default.
    fn is_datetime(&self) -> bool {
        false
    }
}

/// Free text. Numbers and booleans are stringified.
#[derive(Debug, Clone, Default)]
pub struct CharField {
    pub max_length: Option<usize>,
}

impl Coerce for CharField {
    fn to_native(&self, raw: &Value) -> Result<Value, String> {
        let text = match raw {
            Value::Null => return Ok(Value::Null),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => return Err(format!("'{other}' value must be a string.")),
        };
        if let Some(max) = self.max_length {
            let len = text.chars().count();
            if len > max {
                return Err(format!(
                    "Ensure this value has at most {max} characters (it has {len})."
                ));
            }
        }
        Ok(Value::String(text))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerField;

impl Coerce for IntegerField {
    fn to_native(&self, raw: &Value) -> Result<Value, String> {
        let invalid = || format!("'{raw}' value must be an integer.");
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::from(i))
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Ok(Value::from(f as i64))
                        }
                        _ => Err(invalid()),
                    }
                }
            }
            Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatField;

impl Coerce for FloatField {
    fn to_native(&self, raw: &Value) -> Result<Value, String> {
        let invalid = || format!("'{raw}' value must be a float.");
        let number = match raw {
            Value::Null => return Ok(Value::Null),
            Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };
        serde_json::Number::from_f64(number)
            .map(Value::Number)
            .ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanField;

impl Coerce for BooleanField {
    fn to_native(&self, raw: &Value) -> Result<Value, String> {
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(Value::Bool(true)),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(Value::Bool(false)),
            Value::String(s) => match s.as_str() {
                "t" | "true" | "True" | "1" => Ok(Value::Bool(true)),
                "f" | "false" | "False" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("'{s}' value must be either True or False.")),
            },
            other => Err(format!("'{other}' value must be either True or False.")),
        }
    }
}

/// Calendar dates stored as `YYYY-MM-DD`.
///
/// Accepts either a plain date or an RFC 3339 timestamp; timestamps are
/// truncated to their UTC date.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeField;

impl Coerce for DateTimeField {
    fn to_native(&self, raw: &Value) -> Result<Value, String> {
        let invalid = || format!("'{raw}' value has an invalid date format. It must be in YYYY-MM-DD format.");
        match raw {
            Value::Null => Ok(Value::Null),
            Value::String(s) => {
                let date = NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .or_else(|_| {
                        DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc).date_naive())
                    })
                    .map_err(|_| invalid())?;
                Ok(Value::String(date.format(DATE_FORMAT).to_string()))
            }
            _ => Err(invalid()),
        }
    }

    fn is_datetime(&self) -> bool {
        true
    }
}

/// Accepts any value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonField;

impl Coerce for JsonField {
    fn to_native(&self, raw: &Value) -> Result<Value, String> {
        Ok(raw.clone())
    }
}

/// The current UTC date as a stored calendar date.
pub fn today() -> Value {
    Value::String(Utc::now().format(DATE_FORMAT).to_string())
}

/// Declared metadata for one attribute of a record type.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    attname: String,
    coerce: Arc<dyn Coerce>,
    blank: bool,
    default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(attname: impl Into<String>, coerce: impl Coerce + 'static) -> Self {
        Self::with_coercer(attname, Arc::new(coerce))
    }

    /// Builds a descriptor around a shared coercer.
    pub fn with_coercer(attname: impl Into<String>, coerce: Arc<dyn Coerce>) -> Self {
        Self {
            attname: attname.into(),
            coerce,
            blank: false,
            default: None,
        }
    }

    pub fn char(attname: impl Into<String>) -> Self {
        Self::new(attname, CharField::default())
    }

    pub fn integer(attname: impl Into<String>) -> Self {
        Self::new(attname, IntegerField)
    }

    pub fn float(attname: impl Into<String>) -> Self {
        Self::new(attname, FloatField)
    }

    pub fn boolean(attname: impl Into<String>) -> Self {
        Self::new(attname, BooleanField)
    }

    pub fn datetime(attname: impl Into<String>) -> Self {
        Self::new(attname, DateTimeField)
    }

    pub fn json(attname: impl Into<String>) -> Self {
        Self::new(attname, JsonField)
    }

    /// Allows empty values to skip validation.
    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn attname(&self) -> &str {
        &self.attname
    }

    pub fn allows_blank(&self) -> bool {
        self.blank
    }

    pub fn is_datetime(&self) -> bool {
        self.coerce.is_datetime()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// The declared default, or `null` when none was declared.
    pub fn get_default(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }

    /// Validates one raw value and returns its native form.
    pub fn clean(&self, raw: &Value) -> Result<Value, String> {
        if !self.blank && is_empty_value(raw) {
            return Err("This field cannot be blank.".to_string());
        }
        self.coerce.to_native(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_parses_strings_and_whole_floats() {
        assert_eq!(IntegerField.to_native(&json!(" 7 ")).unwrap(), json!(7));
        assert_eq!(IntegerField.to_native(&json!(3.0)).unwrap(), json!(3));
        assert!(IntegerField.to_native(&json!(3.5)).is_err());
        assert!(IntegerField.to_native(&json!(true)).is_err());
    }

    #[test]
    fn char_enforces_max_length() {
        let field = CharField { max_length: Some(3) };
        assert_eq!(field.to_native(&json!(12)).unwrap(), json!("12"));
        assert!(field.to_native(&json!("abcd")).is_err());
    }

    #[test]
    fn datetime_normalizes_to_calendar_date() {
        assert_eq!(
            DateTimeField.to_native(&json!("2024-02-29T23:10:00+00:00")).unwrap(),
            json!("2024-02-29")
        );
        assert_eq!(DateTimeField.to_native(&json!("2024-03-01")).unwrap(), json!("2024-03-01"));
        assert!(DateTimeField.to_native(&json!("yesterday")).is_err());
        assert!(DateTimeField.is_datetime());
    }

    #[test]
    fn boolean_accepts_common_spellings() {
        assert_eq!(BooleanField.to_native(&json!("t")).unwrap(), json!(true));
        assert_eq!(BooleanField.to_native(&json!(0)).unwrap(), json!(false));
        assert!(BooleanField.to_native(&json!("maybe")).is_err());
    }

    #[test]
    fn clean_rejects_empty_unless_blank() {
        let strict = FieldDescriptor::char("name");
        assert_eq!(strict.clean(&json!("")).unwrap_err(), "This field cannot be blank.");

        let lenient = FieldDescriptor::char("name").blank();
        assert_eq!(lenient.clean(&json!("")).unwrap(), json!(""));
    }

    #[test]
    fn default_falls_back_to_null() {
        assert_eq!(FieldDescriptor::integer("n").get_default(), Value::Null);
        assert_eq!(FieldDescriptor::integer("n").default(json!(4)).get_default(), json!(4));
    }
}
