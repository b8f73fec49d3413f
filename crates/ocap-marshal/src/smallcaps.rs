//! The Smallcaps body format
//!
//! Most non-JSON cases are strings whose first character falls in the
//! reserved band `!` through `-`:
//!
//! | prefix | meaning |
//! |--------|---------|
//! | `!` | escaped string |
//! | `+` / `-` | bigint |
//! | `#` | manifest constant |
//! | `%` | symbol |
//! | `$` | remotable slot |
//! | `&` | promise slot |
//!
//! Tagged values and errors are records with a `#tag` or `#error` property.
//! User record names in the reserved band are escaped like strings, so they
//! can never be mistaken for those.

use num_bigint::{BigInt, Sign};
use ocap_core::{passable_symbol_for_name, PassableError, Result};
use serde_json::{json, Map, Value as JsonValue};

use crate::builder::{ErrorRef, SlotKind, SlotRef, WireBuilder};
use crate::capdata::parse_digits;
use crate::json::{finite_number, quote};
use crate::revive::Revivable;

/// First character of every Smallcaps body
pub const SMALLCAPS_PREFIX: char = '#';

/// Whether a string must be escaped to be read back as itself
fn is_special(s: &str) -> bool {
    s.starts_with(|c: char| ('!'..='-').contains(&c))
}

fn escape(s: &str) -> String {
    if is_special(s) {
        format!("!{s}")
    } else {
        s.to_string()
    }
}

/// Builds Smallcaps JSON trees
#[derive(Debug, Clone, Copy, Default)]
pub struct SmallcapsBuilder;

impl WireBuilder for SmallcapsBuilder {
    fn undefined(&self) -> Result<JsonValue> {
        Ok(json!("#undefined"))
    }

    fn number(&self, n: f64) -> Result<JsonValue> {
        if n.is_nan() {
            Ok(json!("#NaN"))
        } else if n == f64::INFINITY {
            Ok(json!("#Infinity"))
        } else if n == f64::NEG_INFINITY {
            Ok(json!("#-Infinity"))
        } else {
            finite_number(n)
        }
    }

    fn bigint(&self, n: &BigInt) -> Result<JsonValue> {
        Ok(JsonValue::String(match n.sign() {
            Sign::Minus => n.to_string(),
            _ => format!("+{n}"),
        }))
    }

    fn string(&self, s: &str) -> Result<JsonValue> {
        Ok(JsonValue::String(escape(s)))
    }

    fn symbol(&self, name: &str) -> Result<JsonValue> {
        Ok(JsonValue::String(format!("%{name}")))
    }

    fn record(&self, entries: Vec<(String, JsonValue)>) -> Result<JsonValue> {
        Ok(JsonValue::Object(
            entries
                .into_iter()
                .map(|(name, value)| (escape(&name), value))
                .collect(),
        ))
    }

    fn tagged(&self, tag: &str, payload: JsonValue) -> Result<JsonValue> {
        let mut map = Map::new();
        map.insert("#tag".into(), JsonValue::String(escape(tag)));
        map.insert("payload".into(), payload);
        Ok(JsonValue::Object(map))
    }

    fn slot(&self, slot: &SlotRef) -> Result<JsonValue> {
        let prefix = match slot.kind {
            SlotKind::Remotable => '$',
            SlotKind::Promise => '&',
        };
        Ok(JsonValue::String(match &slot.iface {
            Some(iface) => format!("{prefix}{}.{iface}", slot.index),
            None => format!("{prefix}{}", slot.index),
        }))
    }

    fn error(&self, error: &ErrorRef) -> Result<JsonValue> {
        let mut map = Map::new();
        map.insert("#error".into(), JsonValue::String(escape(&error.message)));
        map.insert("name".into(), JsonValue::String(escape(&error.name)));
        if let Some(id) = &error.error_id {
            map.insert("errorId".into(), JsonValue::String(escape(id)));
        }
        Ok(JsonValue::Object(map))
    }
}

/// Validate a Smallcaps JSON tree (without the body prefix) and convert it
/// to a [`Revivable`]
pub fn recognize_smallcaps(json: &JsonValue) -> Result<Revivable> {
    match json {
        JsonValue::Null => Ok(Revivable::Null),
        JsonValue::Bool(b) => Ok(Revivable::Bool(*b)),
        JsonValue::Number(n) => n
            .as_f64()
            .map(Revivable::Number)
            .ok_or_else(|| PassableError::malformed("body", format!("unrepresentable number {n}"))),
        JsonValue::String(s) => recognize_string(s),
        JsonValue::Array(items) => Ok(Revivable::Array(
            items.iter().map(recognize_smallcaps).collect::<Result<_>>()?,
        )),
        JsonValue::Object(map) => recognize_record(map, json),
    }
}

fn recognize_string(s: &str) -> Result<Revivable> {
    let Some(first) = s.chars().next() else {
        return Ok(Revivable::String(String::new()));
    };
    let rest = &s[first.len_utf8()..];
    match first {
        '!' => Ok(Revivable::String(rest.to_string())),
        '%' => Ok(Revivable::Symbol(passable_symbol_for_name(rest)?)),
        '#' => match s {
            "#undefined" => Ok(Revivable::Undefined),
            "#NaN" => Ok(Revivable::Number(f64::NAN)),
            "#Infinity" => Ok(Revivable::Number(f64::INFINITY)),
            "#-Infinity" => Ok(Revivable::Number(f64::NEG_INFINITY)),
            _ => Err(PassableError::malformed("body", format!("unknown constant {s:?}"))),
        },
        '+' => Ok(Revivable::BigInt(parse_unsigned(rest, s)?)),
        '-' => Ok(Revivable::BigInt(-parse_unsigned(rest, s)?)),
        '$' => recognize_slot(SlotKind::Remotable, rest, s),
        '&' => recognize_slot(SlotKind::Promise, rest, s),
        c if ('!'..='-').contains(&c) => Err(PassableError::malformed(
            "body",
            format!("Special strings reserved for future use: {s:?}"),
        )),
        _ => Ok(Revivable::String(s.to_string())),
    }
}

fn parse_unsigned(digits: &str, encoded: &str) -> Result<BigInt> {
    if digits.starts_with('-') {
        return Err(PassableError::malformed(
            "body",
            format!("invalid bigint {encoded:?}"),
        ));
    }
    parse_digits(digits, "body")
}

fn recognize_slot(kind: SlotKind, rest: &str, encoded: &str) -> Result<Revivable> {
    let (index, iface) = match rest.split_once('.') {
        Some((index, iface)) => (index, Some(iface.to_string())),
        None => (rest, None),
    };
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PassableError::malformed(
            "index",
            format!("slot index must be a natural number: {encoded:?}"),
        ));
    }
    let index = index.parse().map_err(|_| {
        PassableError::malformed("index", format!("slot index out of range: {encoded:?}"))
    })?;
    Ok(Revivable::Slot {
        kind: Some(kind),
        index,
        iface,
    })
}

/// The unescaped string a field decodes to
fn string_field(map: &Map<String, JsonValue>, field: &str) -> Result<String> {
    let json = map
        .get(field)
        .ok_or_else(|| PassableError::malformed(field, format!("missing {field:?}")))?;
    match json {
        JsonValue::String(s) => match recognize_string(s)? {
            Revivable::String(s) => Ok(s),
            _ => Err(PassableError::malformed(field, format!("{field:?} must be a string: {s:?}"))),
        },
        other => Err(PassableError::malformed(
            field,
            format!("{field:?} must be a string: {}", quote(other)),
        )),
    }
}

fn reject_unexpected(map: &Map<String, JsonValue>, kind: &str, allowed: &[&str]) -> Result<()> {
    let unexpected: Vec<&String> = map.keys().filter(|k| !allowed.contains(&k.as_str())).collect();
    if unexpected.is_empty() {
        return Ok(());
    }
    Err(PassableError::malformed(
        kind,
        format!("{kind} record unexpected properties: {}", quote(&json!(unexpected))),
    ))
}

fn recognize_record(map: &Map<String, JsonValue>, json: &JsonValue) -> Result<Revivable> {
    if map.contains_key("#tag") {
        reject_unexpected(map, "#tag", &["#tag", "payload"])?;
        let payload = map
            .get("payload")
            .ok_or_else(|| PassableError::malformed("payload", "missing tagged payload"))?;
        return Ok(Revivable::Tagged {
            tag: string_field(map, "#tag")?,
            payload: Box::new(recognize_smallcaps(payload)?),
        });
    }
    if map.contains_key("#error") {
        reject_unexpected(map, "#error", &["#error", "name", "errorId"])?;
        let error_id = if map.contains_key("errorId") {
            Some(string_field(map, "errorId")?)
        } else {
            None
        };
        return Ok(Revivable::Error {
            name: string_field(map, "name")?,
            message: string_field(map, "#error")?,
            error_id,
        });
    }
    if let Some(key) = map.keys().find(|k| k.starts_with('#')) {
        return Err(PassableError::malformed(
            key.as_str(),
            format!("Unrecognized record type {key:?}: {}", quote(json)),
        ));
    }
    let entries = map
        .iter()
        .map(|(key, value)| {
            let name = match key.strip_prefix('!') {
                Some(unescaped) => unescaped.to_string(),
                None if is_special(key) => {
                    return Err(PassableError::malformed(
                        key.as_str(),
                        format!("Unexpected special property name {key:?}"),
                    ))
                }
                None => key.clone(),
            };
            Ok((name, recognize_smallcaps(value)?))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Revivable::Record(entries))
}
