//! # Path Parameter Types
//!
//! Named type constraints usable inside a route pattern (`:id(int)`) and the
//! conversion of captured values into typed values.
//!
//! A constraint does two jobs: it narrows the regex a segment compiles to, so a
//! request with a non-numeric `:id(int)` falls through to the next route, and it
//! tells [`convert_param`] how to interpret the captured text.
//!
//! ## Design Principles
//!
//! - **S**: Single responsibility - conversion only, matching lives in `pattern`
//! - **O**: A new type is one `ParamType` variant plus its regex fragment

use crate::error::{Error, Result};
use std::fmt;

/// Supported path parameter types
///
/// Default is `String`, used by plain `:name` segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamType {
    /// Any non-empty segment
    #[default]
    String,
    /// Unsigned digits, parses to i64
    Int,
    /// Decimal number, parses to f64
    Float,
    /// "true"/"false"/"1"/"0"
    Bool,
    /// ASCII letters only
    Alpha,
}

impl ParamType {
    /// Parse a type specifier (e.g., "int" from ":id(int)")
    ///
    /// Returns `None` when the specifier is not a known type name; the pattern
    /// compiler then treats it as a custom regex.
    #[must_use]
    pub fn from_specifier(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "int" | "integer" => Some(Self::Int),
            "float" | "number" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Bool),
            "alpha" => Some(Self::Alpha),
            _ => None,
        }
    }

    /// Regex fragment a segment of this type compiles to
    #[must_use]
    pub fn regex_fragment(self) -> &'static str {
        match self {
            Self::String => "[^/]+",
            Self::Int => "[0-9]+",
            Self::Float => r"[0-9]+(?:\.[0-9]+)?",
            Self::Bool => "true|false|1|0",
            Self::Alpha => "[a-zA-Z]+",
        }
    }

    /// Get the type name for error messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Alpha => "alpha",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Converted parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// String value (no conversion performed)
    String(String),
    /// Integer value (i64)
    Int(i64),
    /// Float value (f64)
    Float(f64),
    /// Boolean value
    Bool(bool),
}

impl ParamValue {
    /// Get as i64 if Int variant
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if Float variant
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as bool if Bool variant
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as &str if String variant
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Convert raw string to typed value based on `ParamType`
///
/// # Arguments
///
/// * `raw` - Captured segment text
/// * `param_type` - Type declared in the route pattern
///
/// # Errors
///
/// Returns `Error::InvalidRoutePattern` if the text does not fit the type.
/// Values captured by a typed segment always convert, since the segment regex
/// already rejected anything else.
pub fn convert_param(raw: &str, param_type: ParamType) -> Result<ParamValue> {
    let invalid = |what: &str| Error::InvalidRoutePattern {
        pattern: raw.to_string(),
        reason: format!("Cannot convert '{raw}' to {what}"),
    };

    match param_type {
        ParamType::String | ParamType::Alpha => Ok(ParamValue::String(raw.to_string())),
        ParamType::Int => raw
            .parse::<i64>()
            .map(ParamValue::Int)
            .map_err(|_| invalid("integer")),
        ParamType::Float => raw
            .parse::<f64>()
            .map(ParamValue::Float)
            .map_err(|_| invalid("float")),
        ParamType::Bool => match raw {
            "true" | "1" => Ok(ParamValue::Bool(true)),
            "false" | "0" => Ok(ParamValue::Bool(false)),
            _ => Err(invalid("boolean")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_type_from_specifier() {
        assert_eq!(ParamType::from_specifier("int"), Some(ParamType::Int));
        assert_eq!(ParamType::from_specifier("integer"), Some(ParamType::Int));
        assert_eq!(ParamType::from_specifier("float"), Some(ParamType::Float));
        assert_eq!(ParamType::from_specifier("bool"), Some(ParamType::Bool));
        assert_eq!(ParamType::from_specifier("alpha"), Some(ParamType::Alpha));
        assert_eq!(ParamType::from_specifier("[a-z]{2}"), None);
    }

    #[test]
    fn test_convert_string() {
        let result = convert_param("hello", ParamType::String).unwrap();
        assert_eq!(result, ParamValue::String("hello".to_string()));
    }

    #[test]
    fn test_convert_int() {
        assert_eq!(convert_param("123", ParamType::Int).unwrap(), ParamValue::Int(123));
        assert!(convert_param("abc", ParamType::Int).is_err());
    }

    #[test]
    fn test_convert_float() {
        let result = convert_param("2.5", ParamType::Float).unwrap();
        assert_eq!(result, ParamValue::Float(2.5));
    }

    #[test]
    fn test_convert_bool() {
        assert_eq!(convert_param("true", ParamType::Bool).unwrap(), ParamValue::Bool(true));
        assert_eq!(convert_param("0", ParamType::Bool).unwrap(), ParamValue::Bool(false));
        assert!(convert_param("yes", ParamType::Bool).is_err());
    }

    #[test]
    fn test_param_value_display() {
        assert_eq!(ParamValue::Int(42).to_string(), "42");
        assert_eq!(ParamValue::Bool(true).to_string(), "true");
        assert_eq!(ParamValue::String("x".into()).to_string(), "x");
    }
}
