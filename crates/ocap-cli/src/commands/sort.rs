//! Rank-sort a list of messages by their decoded values

use std::cmp::Ordering;

use anyhow::{Context, Result};
use ocap_marshal::CapData;
use ocap_rank::{RankCompare, RankComparator};
use serde_json::Value as JsonValue;

use crate::slots::SlotTable;

/// Sort a JSON array of `{body, slots}` messages by the rank order of the
/// values they decode to.
///
/// The sort is stable and the messages are printed back unchanged. Every
/// capability ties with every other under rank order, so messages that
/// differ only in their slots keep their input order.
pub fn run(input: &str) -> Result<String> {
    let messages: Vec<JsonValue> =
        serde_json::from_str(input.trim()).context("input is not a JSON array of messages")?;
    let mut decoded = Vec::with_capacity(messages.len());
    for (position, message) in messages.into_iter().enumerate() {
        let data: CapData<JsonValue> = serde_json::from_value(message.clone())
            .with_context(|| format!("message {position} is not a {{body, slots}} object"))?;
        let (_, value) = SlotTable::decode(&data).with_context(|| format!("message {position}"))?;
        decoded.push((value, message));
    }

    // decode asserted every value passable, so comparison cannot fail
    let comparator = RankComparator::new();
    decoded.sort_by(|(a, _), (b, _)| comparator.compare(a, b).unwrap_or(Ordering::Equal));
    tracing::debug!(count = decoded.len(), "sorted messages");

    let sorted: Vec<JsonValue> = decoded.into_iter().map(|(_, message)| message).collect();
    Ok(serde_json::to_string(&sorted)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorts_by_style_then_value() {
        let input = concat!(
            r##"[{"body":"#\"b\"","slots":[]},{"body":"2","slots":[]},{"body":"null","slots":[]},"##,
            r##"{"body":"#\"#undefined\"","slots":[]},{"body":"#1","slots":[]},{"body":"true","slots":[]}]"##
        );
        let out = run(input).unwrap();
        assert_eq!(
            out,
            concat!(
                r##"[{"body":"true","slots":[]},{"body":"#1","slots":[]},{"body":"2","slots":[]},"##,
                r##"{"body":"#\"b\"","slots":[]},{"body":"null","slots":[]},{"body":"#\"#undefined\"","slots":[]}]"##
            )
        );
    }

    #[test]
    fn test_capabilities_tie_and_keep_order() {
        let input = r##"[{"body":"#\"$0\"","slots":["b"]},{"body":"#\"$0\"","slots":["a"]}]"##;
        assert_eq!(run(input).unwrap(), input);
    }

    #[test]
    fn test_rejects_non_arrays() {
        assert!(run(r##"{"body":"#1","slots":[]}"##).is_err());
        assert!(run(r#"[{"body":"1"}]"#).is_err());
    }

    #[test]
    fn test_invalid_message_fails_before_sorting() {
        let input = r##"[{"body":"#1","slots":[]},{"body":"#\"$3\"","slots":[]}]"##;
        let err = run(input).unwrap_err();
        assert_eq!(err.to_string(), "message 1");
    }
}
