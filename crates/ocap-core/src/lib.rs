//! # Ocap Core
//!
//! The bottom layer of the ocap stack: the host value model and the
//! pass-style classifier that decides which values may be transmitted or
//! stored.
//!
//! ## Key Concepts
//!
//! - **Passable**: a deeply frozen, acyclic value with exactly one [`PassStyle`]
//! - **Copy data**: arrays, records and tagged values, compared by content
//! - **Capabilities**: remotables and promises, compared only by identity
//! - **Errors**: passed for their diagnostic value even when malformed
//!
//! The ordering codec (`ocap-rank`) and the wire marshaller
//! (`ocap-marshal`) both call [`pass_style_of`] on every node they visit.

#![forbid(unsafe_code)]

pub mod equal;
pub mod error;
pub mod error_class;
pub mod pass_style;
pub mod symbol;
pub mod text;
pub mod value;

pub use equal::{deep_equal, same_value_zero};
pub use error::{PassableError, Result, ValueError};
pub use error_class::{get_error_constructor, ErrorClass};
pub use pass_style::{assert_passable, error_malformations, is_passable, pass_style_of, PassStyle};
pub use symbol::{
    assert_passable_symbol, name_for_passable_symbol, passable_symbol_for_name, Symbol,
};
pub use text::{compare_utf16, js_number_to_string};
pub use value::{
    error_parts, far, far_function, get_interface_of, harden, make_error, make_error_named,
    make_remotable, make_tagged, ObjectId, ObjectRef, Property, PropertyKey, Shape, StyleMarker,
    Value,
};

/// Re-exported so downstream crates name the same big integer type.
pub use num_bigint::BigInt;
