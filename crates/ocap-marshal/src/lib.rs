//! # Ocap Marshal
//!
//! Serializes passables into `{body, slots}` messages and back. Copy data
//! travels inside the JSON body; capabilities travel out of band as slots
//! chosen by the caller.
//!
//! Two body formats are supported:
//!
//! - **CapData**: plain JSON with `@qclass` envelopes for everything JSON
//!   cannot express directly
//! - **Smallcaps**: a `#`-prefixed body that spells most special cases as
//!   strings with a reserved first character
//!
//! Decoding accepts either format and tells them apart by the prefix.
//!
//! ```rust
//! use ocap_core::Value;
//! use ocap_marshal::{Marshal, MarshalOptions};
//!
//! let m = Marshal::identity(MarshalOptions::smallcaps());
//! let data = m.to_capdata(&Value::record([("a", Value::Number(1.0))])).unwrap();
//! assert_eq!(data.body, r##"#{"a":1}"##);
//! ```

#![forbid(unsafe_code)]

pub mod builder;
pub mod capdata;
pub mod config;
pub mod json;
pub mod marshal;
pub mod revive;
pub mod smallcaps;

pub use builder::{
    encode_tree, wire_error_parts, CapabilityEncoder, ErrorRef, NoCapabilities, SlotKind, SlotRef,
    WireBuilder,
};
pub use capdata::{recognize_capdata, CapDataBuilder, QCLASS};
pub use config::{
    BodyFormat, ConfigDefaults, ConfigError, ConfigValidation, ErrorTagging, MarshalOptions,
};
pub use json::{parse_body_text, to_body_text, JsNumberFormatter};
pub use marshal::{
    body_format_of, encode_body, recognize_body, CapData, ErrorSink, Marshal, SlotToVal, ValToSlot,
};
pub use revive::{remote_error, revive, CapabilityDecoder, LocalErrors, Revivable};
pub use smallcaps::{recognize_smallcaps, SmallcapsBuilder, SMALLCAPS_PREFIX};
