//! Print the order-preserving key of a message's value

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use ocap_core::{error_parts, ObjectId, PassableError, Value};
use ocap_rank::{EncodeOptions, PassableEncoder};

use super::parse_message;
use crate::slots::SlotTable;

fn slot_key(prefix: char, indices: &HashMap<ObjectId, usize>, value: &Value) -> ocap_core::Result<String> {
    value
        .as_object()
        .and_then(|obj| indices.get(&obj.id()))
        .map(|index| format!("{prefix}{index}"))
        .ok_or_else(|| PassableError::invalid(format!("no slot for {value}")))
}

/// Encode the decoded value as a key.
///
/// Remotables encode as `r<slot>` and promises as `?<slot>`, using the
/// incoming slot index. Errors encode as `!` followed by the key of their
/// name and message. The key is printed as a JSON string since it contains
/// control characters.
pub fn run(input: &str) -> Result<String> {
    let (table, value) = SlotTable::decode(&parse_message(input)?)?;
    let indices = Arc::new(table.slot_indices());
    let promise_indices = Arc::clone(&indices);
    let options = EncodeOptions::new()
        .with_remotable(move |value, _| slot_key('r', &indices, value))
        .with_promise(move |value, _| slot_key('?', &promise_indices, value))
        .with_error(|value, encoder| {
            let (name, message) = error_parts(value)
                .ok_or_else(|| PassableError::invalid(format!("not an error: {value}")))?;
            let parts = Value::array([Value::string(name), Value::string(message)]);
            Ok(format!("!{}", encoder.encode(&parts)?))
        });
    let key = PassableEncoder::new(options).encode(&value)?;
    Ok(serde_json::to_string(&key)?)
}
