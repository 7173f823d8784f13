//! # JSON Serialization Module
//!
//! Request bodies are parsed with simd-json; responses are written with serde_json.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Only handles JSON serialization/deserialization
//! - **D**: Callers depend on serde traits, not on either parser

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Parse JSON bytes to a typed value using simd-json
///
/// simd-json parses in place, so the buffer is clobbered.
///
/// # Arguments
///
/// * `bytes` - Mutable byte slice containing JSON
///
/// # Returns
///
/// Deserialized value of type T
///
/// # Errors
///
/// Returns `Error::InvalidJson` if parsing fails
pub fn parse_json_bytes<T: DeserializeOwned>(bytes: &mut [u8]) -> Result<T> {
    simd_json::from_slice(bytes).map_err(|e| Error::InvalidJson {
        reason: e.to_string(),
    })
}

/// Parse a JSON string to a typed value
///
/// # Errors
///
/// Returns `Error::InvalidJson` if parsing fails
pub fn parse_json<T: DeserializeOwned>(json_str: &str) -> Result<T> {
    let mut bytes = json_str.as_bytes().to_vec();
    parse_json_bytes(&mut bytes)
}

/// Serialize a value to JSON bytes
///
/// # Arguments
///
/// * `value` - Value to serialize
///
/// # Errors
///
/// Returns `Error::Json` if the value cannot be represented as JSON
pub fn to_json_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestData {
        name: String,
        age: i32,
    }

    #[test]
    fn test_parse_json_object() {
        let json = r#"{"name": "John", "age": 30}"#;
        let data: TestData = parse_json(json).unwrap();
        assert_eq!(data.name, "John");
        assert_eq!(data.age, 30);
    }

    #[test]
    fn test_parse_json_map() {
        let json = r#"{"key": "value", "count": "42"}"#;
        let map: HashMap<String, String> = parse_json(json).unwrap();
        assert_eq!(map.get("key"), Some(&"value".to_string()));
    }

    #[test]
    fn test_parse_json_bytes() {
        let mut bytes = r#"{"name": "Jane", "age": 25}"#.as_bytes().to_vec();
        let data: TestData = parse_json_bytes(&mut bytes).unwrap();
        assert_eq!(data.name, "Jane");
    }

    #[test]
    fn test_to_json_vec() {
        let data = TestData {
            name: "Bob".to_string(),
            age: 40,
        };
        let json = String::from_utf8(to_json_vec(&data).unwrap()).unwrap();
        assert_eq!(json, r#"{"name":"Bob","age":40}"#);
    }

    #[test]
    fn test_invalid_json() {
        let result: Result<TestData> = parse_json("not valid json");
        assert!(matches!(result, Err(Error::InvalidJson { .. })));
    }
}
