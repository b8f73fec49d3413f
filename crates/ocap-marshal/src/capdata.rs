//! The CapData body format
//!
//! Plain JSON wherever JSON can say it; everything else is an envelope
//! object whose `@qclass` property names the case. A user record that has
//! its own `@qclass` property moves one level down into a `hilbert`
//! envelope.

use num_bigint::BigInt;
use ocap_core::{passable_symbol_for_name, PassableError, Result, Symbol};
use serde_json::{json, Map, Value as JsonValue};

use crate::builder::{ErrorRef, SlotRef, WireBuilder};
use crate::json::{finite_number, quote};
use crate::revive::Revivable;

/// The discriminator property of CapData envelopes
pub const QCLASS: &str = "@qclass";

fn envelope(qclass: &str) -> Map<String, JsonValue> {
    let mut map = Map::new();
    map.insert(QCLASS.to_string(), JsonValue::String(qclass.to_string()));
    map
}

/// Builds CapData JSON trees
#[derive(Debug, Clone, Copy, Default)]
pub struct CapDataBuilder;

impl WireBuilder for CapDataBuilder {
    fn undefined(&self) -> Result<JsonValue> {
        Ok(JsonValue::Object(envelope("undefined")))
    }

    fn number(&self, n: f64) -> Result<JsonValue> {
        if n.is_nan() {
            Ok(JsonValue::Object(envelope("NaN")))
        } else if n == f64::INFINITY {
            Ok(JsonValue::Object(envelope("Infinity")))
        } else if n == f64::NEG_INFINITY {
            Ok(JsonValue::Object(envelope("-Infinity")))
        } else {
            finite_number(n)
        }
    }

    fn bigint(&self, n: &BigInt) -> Result<JsonValue> {
        let mut map = envelope("bigint");
        map.insert("digits".into(), JsonValue::String(n.to_string()));
        Ok(JsonValue::Object(map))
    }

    fn string(&self, s: &str) -> Result<JsonValue> {
        Ok(JsonValue::String(s.to_string()))
    }

    fn symbol(&self, name: &str) -> Result<JsonValue> {
        let mut map = envelope("symbol");
        map.insert("name".into(), JsonValue::String(name.to_string()));
        Ok(JsonValue::Object(map))
    }

    fn record(&self, entries: Vec<(String, JsonValue)>) -> Result<JsonValue> {
        let mut original = None;
        let mut rest = Map::new();
        for (name, value) in entries {
            if name == QCLASS {
                original = Some(value);
            } else {
                rest.insert(name, value);
            }
        }
        let Some(original) = original else {
            return Ok(JsonValue::Object(rest));
        };
        let mut map = envelope("hilbert");
        map.insert("original".into(), original);
        if !rest.is_empty() {
            map.insert("rest".into(), JsonValue::Object(rest));
        }
        Ok(JsonValue::Object(map))
    }

    fn tagged(&self, tag: &str, payload: JsonValue) -> Result<JsonValue> {
        let mut map = envelope("tagged");
        map.insert("tag".into(), JsonValue::String(tag.to_string()));
        map.insert("payload".into(), payload);
        Ok(JsonValue::Object(map))
    }

    fn slot(&self, slot: &SlotRef) -> Result<JsonValue> {
        let mut map = envelope("slot");
        if let Some(iface) = &slot.iface {
            map.insert("iface".into(), JsonValue::String(iface.clone()));
        }
        map.insert("index".into(), json!(slot.index));
        Ok(JsonValue::Object(map))
    }

    fn error(&self, error: &ErrorRef) -> Result<JsonValue> {
        let mut map = envelope("error");
        if let Some(id) = &error.error_id {
            map.insert("errorId".into(), JsonValue::String(id.clone()));
        }
        map.insert("message".into(), JsonValue::String(error.message.clone()));
        map.insert("name".into(), JsonValue::String(error.name.clone()));
        Ok(JsonValue::Object(map))
    }
}

/// The ECMAScript `typeof` of a JSON value, for error messages
pub(crate) fn json_typeof(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => "object",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
    }
}

fn string_field<'a>(map: &'a Map<String, JsonValue>, field: &str, what: &str) -> Result<&'a str> {
    match map.get(field) {
        Some(JsonValue::String(s)) => Ok(s),
        Some(other) => Err(PassableError::malformed(
            field,
            format!("invalid {what} typeof {:?}", json_typeof(other)),
        )),
        None => Err(PassableError::malformed(field, format!("missing {what}"))),
    }
}

fn optional_string_field(map: &Map<String, JsonValue>, field: &str) -> Result<Option<String>> {
    match map.get(field) {
        None => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(PassableError::malformed(
            field,
            format!("invalid {field} typeof {:?}", json_typeof(other)),
        )),
    }
}

/// Parse decimal digits, with an optional leading minus, as a big integer
pub(crate) fn parse_digits(digits: &str, field: &str) -> Result<BigInt> {
    let unsigned = digits.strip_prefix('-').unwrap_or(digits);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PassableError::malformed(
            field,
            format!("invalid bigint digits {digits:?}"),
        ));
    }
    digits
        .parse()
        .map_err(|_| PassableError::malformed(field, format!("invalid bigint digits {digits:?}")))
}

/// Parse a slot index, which must be a non-negative integer
pub(crate) fn slot_index(json: Option<&JsonValue>) -> Result<usize> {
    json.and_then(JsonValue::as_u64)
        .and_then(|index| usize::try_from(index).ok())
        .ok_or_else(|| {
            PassableError::malformed(
                "index",
                format!(
                    "slot index must be a natural number: {}",
                    json.map(quote).unwrap_or_else(|| "undefined".into())
                ),
            )
        })
}

/// Validate a CapData JSON tree and convert it to a [`Revivable`]
pub fn recognize_capdata(json: &JsonValue) -> Result<Revivable> {
    match json {
        JsonValue::Null => Ok(Revivable::Null),
        JsonValue::Bool(b) => Ok(Revivable::Bool(*b)),
        JsonValue::Number(n) => n
            .as_f64()
            .map(Revivable::Number)
            .ok_or_else(|| PassableError::malformed("body", format!("unrepresentable number {n}"))),
        JsonValue::String(s) => Ok(Revivable::String(s.clone())),
        JsonValue::Array(items) => Ok(Revivable::Array(
            items.iter().map(recognize_capdata).collect::<Result<_>>()?,
        )),
        JsonValue::Object(map) => match map.get(QCLASS) {
            Some(qclass) => recognize_envelope(map, qclass, json),
            None => Ok(Revivable::Record(
                map.iter()
                    .map(|(name, v)| Ok((name.clone(), recognize_capdata(v)?)))
                    .collect::<Result<_>>()?,
            )),
        },
    }
}

fn recognize_envelope(
    map: &Map<String, JsonValue>,
    qclass: &JsonValue,
    json: &JsonValue,
) -> Result<Revivable> {
    let JsonValue::String(qclass) = qclass else {
        return Err(PassableError::malformed(
            QCLASS,
            format!("invalid \"{QCLASS}\" typeof {:?}", json_typeof(qclass)),
        ));
    };
    match qclass.as_str() {
        "undefined" => Ok(Revivable::Undefined),
        "NaN" => Ok(Revivable::Number(f64::NAN)),
        "Infinity" => Ok(Revivable::Number(f64::INFINITY)),
        "-Infinity" => Ok(Revivable::Number(f64::NEG_INFINITY)),
        "bigint" => {
            let digits = string_field(map, "digits", "digits")?;
            Ok(Revivable::BigInt(parse_digits(digits, "digits")?))
        }
        "@@asyncIterator" => Symbol::well_known("asyncIterator")
            .map(Revivable::Symbol)
            .ok_or_else(|| PassableError::invalid("asyncIterator is not a well-known symbol")),
        "symbol" => {
            let name = string_field(map, "name", "symbol name")?;
            Ok(Revivable::Symbol(passable_symbol_for_name(name)?))
        }
        "tagged" => {
            let tag = string_field(map, "tag", "tag")?;
            let payload = map
                .get("payload")
                .ok_or_else(|| PassableError::malformed("payload", "missing tagged payload"))?;
            Ok(Revivable::Tagged {
                tag: tag.to_string(),
                payload: Box::new(recognize_capdata(payload)?),
            })
        }
        "error" => Ok(Revivable::Error {
            name: string_field(map, "name", "error name")?.to_string(),
            message: string_field(map, "message", "error message")?.to_string(),
            error_id: optional_string_field(map, "errorId")?,
        }),
        "slot" => Ok(Revivable::Slot {
            kind: None,
            index: slot_index(map.get("index"))?,
            iface: optional_string_field(map, "iface")?,
        }),
        "hilbert" => recognize_hilbert(map, json),
        "ibid" => Err(PassableError::malformed(
            QCLASS,
            format!("The protocol no longer supports ibid encoding: {}.", quote(json)),
        )),
        other => Err(PassableError::malformed(
            QCLASS,
            format!("unrecognized \"{QCLASS}\" {other:?}"),
        )),
    }
}

fn recognize_hilbert(map: &Map<String, JsonValue>, json: &JsonValue) -> Result<Revivable> {
    let original = map.get("original").ok_or_else(|| {
        PassableError::malformed("original", format!("Invalid Hilbert Hotel encoding {}", quote(json)))
    })?;
    let mut entries = vec![(QCLASS.to_string(), recognize_capdata(original)?)];
    if let Some(rest) = map.get("rest") {
        let non_empty = rest.as_object().is_some_and(|rest| !rest.is_empty());
        if !non_empty {
            return Err(PassableError::malformed(
                "rest",
                format!("Rest encoding must be a non-empty object: {}", quote(rest)),
            ));
        }
        let Revivable::Record(rest_entries) = recognize_capdata(rest)? else {
            return Err(PassableError::malformed(
                "rest",
                format!("Rest encoding must be a record: {}", quote(rest)),
            ));
        };
        if rest_entries.iter().any(|(name, _)| name == QCLASS) {
            return Err(PassableError::malformed(
                "rest",
                format!("Rest must not contain its own definition of \"{QCLASS}\""),
            ));
        }
        entries.extend(rest_entries);
    }
    Ok(Revivable::Record(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{encode_tree, NoCapabilities};
    use crate::json::to_body_text;
    use ocap_core::{make_tagged, Value};

    fn body(value: &Value) -> String {
        to_body_text(&encode_tree(value, &CapDataBuilder, &mut NoCapabilities).unwrap()).unwrap()
    }

    fn recognize(text: &str) -> Result<Revivable> {
        recognize_capdata(&serde_json::from_str(text).unwrap())
    }

    #[test]
    fn test_scalar_envelopes() {
        assert_eq!(body(&Value::Undefined), r#"{"@qclass":"undefined"}"#);
        assert_eq!(body(&Value::Number(-0.0)), "0");
        assert_eq!(body(&Value::Number(f64::NEG_INFINITY)), r#"{"@qclass":"-Infinity"}"#);
        assert_eq!(body(&Value::bigint(4)), r#"{"@qclass":"bigint","digits":"4"}"#);
        assert_eq!(
            body(&Value::Symbol(Symbol::registered("@@foo"))),
            r#"{"@qclass":"symbol","name":"@@@@foo"}"#
        );
    }

    #[test]
    fn test_tagged_envelope() {
        assert_eq!(
            body(&make_tagged("x", Value::Undefined)),
            r#"{"@qclass":"tagged","tag":"x","payload":{"@qclass":"undefined"}}"#
        );
    }

    #[test]
    fn test_hilbert_hotel_nesting() {
        let inner = Value::record([("@qclass", Value::Number(8.0)), ("foo", Value::string("foo1"))]);
        let outer = Value::record([
            ("@qclass", inner),
            ("bar", Value::record([("@qclass", Value::Undefined)])),
        ]);
        assert_eq!(
            body(&outer),
            concat!(
                r#"{"@qclass":"hilbert","original":{"@qclass":"hilbert","original":8,"rest":{"foo":"foo1"}},"#,
                r#""rest":{"bar":{"@qclass":"hilbert","original":{"@qclass":"undefined"}}}}"#
            )
        );
        let Revivable::Record(entries) =
            recognize(r#"{"@qclass":"hilbert","original":8,"rest":{"foo":"x"}}"#).unwrap()
        else {
            panic!("expected a record");
        };
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["@qclass", "foo"]);
    }

    #[test]
    fn test_hilbert_rejections() {
        let missing = recognize(r#"{"@qclass":"hilbert","rest":{"a":1}}"#).unwrap_err();
        assert_eq!(missing.field(), Some("original"));
        let empty = recognize(r#"{"@qclass":"hilbert","original":1,"rest":{}}"#).unwrap_err();
        assert!(empty.to_string().contains("non-empty object"));
        let sneaky = recognize(
            r#"{"@qclass":"hilbert","original":1,"rest":{"@qclass":"hilbert","original":2}}"#,
        )
        .unwrap_err();
        assert!(sneaky.to_string().contains("Rest must not contain its own definition"));
    }

    #[test]
    fn test_exact_bigints() {
        let tree = recognize(r#"{"@qclass":"bigint","digits":"9007199254740993"}"#).unwrap();
        let expected: BigInt = "9007199254740993".parse().unwrap();
        assert_eq!(tree, Revivable::BigInt(expected));
        assert!(recognize(r#"{"@qclass":"bigint","digits":"12x"}"#).is_err());
        assert!(recognize(r#"{"@qclass":"bigint","digits":12}"#).is_err());
    }

    #[test]
    fn test_discriminator_rejections() {
        let err = recognize(r#"{"@qclass":0}"#).unwrap_err();
        assert!(err.to_string().contains(r#"invalid "@qclass" typeof "number""#));
        let err = recognize(r#"{"@qclass":"ibid","index":0}"#).unwrap_err();
        assert!(err.to_string().contains("no longer supports ibid"));
        let err = recognize(r#"{"@qclass":"mystery"}"#).unwrap_err();
        assert_eq!(err.field(), Some(QCLASS));
        let err = recognize(r#"{"@qclass":"slot","index":-1}"#).unwrap_err();
        assert_eq!(err.field(), Some("index"));
        let err = recognize(r#"{"@qclass":"error","message":"m"}"#).unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn test_legacy_async_iterator() {
        let tree = recognize(r#"{"@qclass":"@@asyncIterator"}"#).unwrap();
        assert_eq!(tree, Revivable::Symbol(Symbol::well_known("asyncIterator").unwrap()));
    }
}
