//! JSON text for wire bodies
//!
//! Bodies must be byte-identical across implementations, so numbers are
//! printed the way ECMAScript prints them rather than the way Rust does.

use std::io;

use ocap_core::{js_number_to_string, PassableError, Result};
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value as JsonValue;

/// A compact formatter that prints floats as ECMAScript `Number#toString`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsNumberFormatter;

impl Formatter for JsNumberFormatter {
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(js_number_to_string(value).as_bytes())
    }

    fn write_f32<W>(&mut self, writer: &mut W, value: f32) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.write_f64(writer, f64::from(value))
    }
}

/// Serialize a JSON tree to compact text
pub fn to_body_text(json: &JsonValue) -> Result<String> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, JsNumberFormatter);
    json.serialize(&mut serializer)
        .map_err(|e| PassableError::invalid(format!("JSON serialization failed: {e}")))?;
    String::from_utf8(out).map_err(|e| PassableError::invalid(format!("JSON is not UTF-8: {e}")))
}

/// Parse body text into a JSON tree
pub fn parse_body_text(text: &str) -> Result<JsonValue> {
    serde_json::from_str(text)
        .map_err(|e| PassableError::malformed("body", format!("invalid JSON: {e}")))
}

/// A finite number as JSON, with `-0` written as `0`
pub(crate) fn finite_number(n: f64) -> Result<JsonValue> {
    let n = if n == 0.0 { 0.0 } else { n };
    serde_json::Number::from_f64(n)
        .map(JsonValue::Number)
        .ok_or_else(|| PassableError::invalid(format!("{n} has no JSON representation")))
}

/// A short rendering of a JSON tree for error messages
pub(crate) fn quote(json: &JsonValue) -> String {
    to_body_text(json).unwrap_or_else(|_| json.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_print_like_ecmascript() {
        let body = json!([
            finite_number(1.0).unwrap(),
            finite_number(-0.0).unwrap(),
            finite_number(1e21).unwrap(),
            finite_number(1e-7).unwrap(),
            finite_number(0.5).unwrap(),
            3
        ]);
        assert_eq!(to_body_text(&body).unwrap(), "[1,0,1e+21,1e-7,0.5,3]");
    }

    #[test]
    fn test_key_order_is_preserved() {
        let mut map = serde_json::Map::new();
        map.insert("b".into(), json!(1));
        map.insert("a".into(), json!(2));
        assert_eq!(to_body_text(&JsonValue::Object(map)).unwrap(), r#"{"b":1,"a":2}"#);
    }

    #[test]
    fn test_parse_failure_names_body() {
        let err = parse_body_text("{").unwrap_err();
        assert_eq!(err.field(), Some("body"));
    }
}
