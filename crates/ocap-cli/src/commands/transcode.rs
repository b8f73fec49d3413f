//! Re-encode a message in another body format

use anyhow::Result;
use ocap_marshal::{body_format_of, encode_body, BodyFormat, CapData, MarshalOptions};

use super::{parse_message, render_message};
use crate::slots::SlotTable;

/// Decode `input` and encode the same value as `to`.
///
/// Slots are renumbered in order of first use; slot contents are copied
/// through unchanged.
pub fn run(input: &str, to: BodyFormat, options: &MarshalOptions) -> Result<String> {
    let data = parse_message(input)?;
    tracing::info!(from = ?body_format_of(&data.body), ?to, "transcoding");
    let (table, value) = SlotTable::decode(&data)?;
    let mut slots = table.encoder(options.error_tagging);
    let body = encode_body(&value, to, &mut slots)?;
    render_message(&CapData {
        body,
        slots: slots.into_slots(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocap_marshal::ConfigDefaults;

    #[test]
    fn test_capdata_to_smallcaps() {
        let input = r#"{"body":"{\"b\":{\"@qclass\":\"bigint\",\"digits\":\"2\"},\"a\":1}","slots":[]}"#;
        let out = run(input, BodyFormat::Smallcaps, &MarshalOptions::defaults()).unwrap();
        assert_eq!(out, r##"{"body":"#{\"a\":1,\"b\":\"+2\"}","slots":[]}"##);
    }

    #[test]
    fn test_smallcaps_to_capdata_keeps_slots() {
        let input = r##"{"body":"#[\"$0.Alleged: foo\",\"$0\"]","slots":["o-5"]}"##;
        let out = run(input, BodyFormat::Capdata, &MarshalOptions::defaults()).unwrap();
        assert_eq!(
            out,
            concat!(
                r#"{"body":"[{\"@qclass\":\"slot\",\"iface\":\"Alleged: foo\",\"index\":0},"#,
                r#"{\"@qclass\":\"slot\",\"index\":0}]","slots":["o-5"]}"#
            )
        );
    }

    #[test]
    fn test_rejects_non_messages() {
        assert!(run("[1]", BodyFormat::Capdata, &MarshalOptions::defaults()).is_err());
    }
}
