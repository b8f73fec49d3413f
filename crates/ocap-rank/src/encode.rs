//! Order-preserving string keys for passables
//!
//! Comparing two keys as strings agrees with [`crate::compare_rank`] on the
//! values they encode, up to the first remotable, promise or error, whose
//! keys are produced by caller-supplied hooks that need only keep the
//! style's prefix character.
//!
//! Composite values encode each child followed by a `\0` terminator, with any
//! `\0` or `\u{1}` inside a child escaped by a `\u{1}` prefix. A proper prefix
//! therefore sorts before every extension of it.

use ocap_core::{
    make_tagged, name_for_passable_symbol, pass_style_of, passable_symbol_for_name, PassStyle,
    PassableError, Result, Value,
};
use tracing::trace;

use crate::order::{record_parts, tagged_parts};
use crate::scalar::{decode_bigint, decode_binary64, encode_bigint, encode_binary64};

const TERMINATOR: char = '\u{0}';
const ESCAPE: char = '\u{1}';

/// Hook encoding a remotable, promise or error
pub type EncodeHook = Box<dyn Fn(&Value, &PassableEncoder) -> Result<String> + Send + Sync>;

/// Hook decoding a remotable, promise or error key
pub type DecodeHook = Box<dyn Fn(&str, &PassableDecoder) -> Result<Value> + Send + Sync>;

/// Hooks for the styles whose keys the encoder cannot derive itself
#[derive(Default)]
pub struct EncodeOptions {
    /// Must return a key starting with `r`
    pub encode_remotable: Option<EncodeHook>,
    /// Must return a key starting with `?`
    pub encode_promise: Option<EncodeHook>,
    /// Must return a key starting with `!`
    pub encode_error: Option<EncodeHook>,
}

impl EncodeOptions {
    /// Options with no hooks
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the remotable hook
    pub fn with_remotable(
        mut self,
        hook: impl Fn(&Value, &PassableEncoder) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.encode_remotable = Some(Box::new(hook));
        self
    }

    /// Set the promise hook
    pub fn with_promise(
        mut self,
        hook: impl Fn(&Value, &PassableEncoder) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.encode_promise = Some(Box::new(hook));
        self
    }

    /// Set the error hook
    pub fn with_error(
        mut self,
        hook: impl Fn(&Value, &PassableEncoder) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.encode_error = Some(Box::new(hook));
        self
    }
}

/// Hooks for decoding the keys produced by [`EncodeOptions`]
#[derive(Default)]
pub struct DecodeOptions {
    /// Receives keys starting with `r`
    pub decode_remotable: Option<DecodeHook>,
    /// Receives keys starting with `?`
    pub decode_promise: Option<DecodeHook>,
    /// Receives keys starting with `!`
    pub decode_error: Option<DecodeHook>,
}

impl DecodeOptions {
    /// Options with no hooks
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the remotable hook
    pub fn with_remotable(
        mut self,
        hook: impl Fn(&str, &PassableDecoder) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.decode_remotable = Some(Box::new(hook));
        self
    }

    /// Set the promise hook
    pub fn with_promise(
        mut self,
        hook: impl Fn(&str, &PassableDecoder) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.decode_promise = Some(Box::new(hook));
        self
    }

    /// Set the error hook
    pub fn with_error(
        mut self,
        hook: impl Fn(&str, &PassableDecoder) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.decode_error = Some(Box::new(hook));
        self
    }
}

/// Encodes passables into order-preserving keys
#[derive(Default)]
pub struct PassableEncoder {
    options: EncodeOptions,
}

impl PassableEncoder {
    /// Create an encoder with the given hooks
    pub fn new(options: EncodeOptions) -> Self {
        PassableEncoder { options }
    }

    /// Encode a passable
    pub fn encode(&self, value: &Value) -> Result<String> {
        // Errors go straight to the hook, passable or not.
        if value.is_error_like() {
            return self.delegate(self.options.encode_error.as_ref(), value, '!', "error");
        }
        let style = pass_style_of(value)?;
        let encoded = match (style, value) {
            (PassStyle::Null, _) => "v".to_string(),
            (PassStyle::Undefined, _) => "z".to_string(),
            (PassStyle::Number, Value::Number(n)) => encode_binary64(*n),
            (PassStyle::String, Value::String(s)) => format!("s{s}"),
            (PassStyle::Boolean, Value::Bool(b)) => format!("b{b}"),
            (PassStyle::Bigint, Value::BigInt(n)) => encode_bigint(n),
            (PassStyle::Symbol, Value::Symbol(symbol)) => {
                format!("y{}", name_for_passable_symbol(symbol).unwrap_or_default())
            }
            (PassStyle::Remotable, _) => {
                self.delegate(self.options.encode_remotable.as_ref(), value, 'r', "remotable")?
            }
            (PassStyle::Promise, _) => {
                self.delegate(self.options.encode_promise.as_ref(), value, '?', "promise")?
            }
            (PassStyle::Error, _) => {
                self.delegate(self.options.encode_error.as_ref(), value, '!', "error")?
            }
            (PassStyle::CopyArray, Value::Object(array)) => {
                let elements = array
                    .elements()
                    .iter()
                    .map(|element| self.encode(element))
                    .collect::<Result<Vec<_>>>()?;
                encode_sequence(elements)
            }
            (PassStyle::CopyRecord, Value::Object(record)) => {
                let (names, values) = record_parts(record);
                let names = encode_sequence(names.iter().map(|name| format!("s{name}")));
                let values = encode_sequence(
                    values
                        .iter()
                        .map(|v| self.encode(v))
                        .collect::<Result<Vec<_>>>()?,
                );
                format!("({}", encode_sequence([names, values]))
            }
            (PassStyle::Tagged, Value::Object(tagged)) => {
                let (tag, payload) = tagged_parts(tagged)?;
                format!(":{}", encode_sequence([format!("s{tag}"), self.encode(&payload)?]))
            }
            (style, _) => {
                return Err(PassableError::unrecognized_style(format!(
                    "a {style} cannot be used as a collection passable"
                )))
            }
        };
        Ok(encoded)
    }

    fn delegate(
        &self,
        hook: Option<&EncodeHook>,
        value: &Value,
        prefix: char,
        what: &str,
    ) -> Result<String> {
        let hook = hook.ok_or_else(|| PassableError::invalid(format!("{what} unexpected: {value}")))?;
        let encoded = hook(value, self)?;
        if !encoded.starts_with(prefix) {
            return Err(PassableError::invalid(format!(
                "internal: {what} encoding must start with {prefix:?}: {encoded:?}"
            )));
        }
        trace!(%what, %encoded, "delegated key encoding");
        Ok(encoded)
    }
}

/// Join already-encoded children into an array key
fn encode_sequence(children: impl IntoIterator<Item = String>) -> String {
    let mut out = String::from("[");
    for child in children {
        for c in child.chars() {
            if c == TERMINATOR || c == ESCAPE {
                out.push(ESCAPE);
            }
            out.push(c);
        }
        out.push(TERMINATOR);
    }
    out
}

/// Split an array key into its children's keys
fn decode_sequence(encoded: &str) -> Result<Vec<String>> {
    let malformed = |message: &str| PassableError::malformed("array", format!("{message}: {encoded:?}"));
    let body = encoded
        .strip_prefix('[')
        .ok_or_else(|| malformed("Encoded array expected"))?;
    let mut children = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            TERMINATOR => children.push(std::mem::take(&mut current)),
            ESCAPE => match chars.next() {
                Some(escaped @ (TERMINATOR | ESCAPE)) => current.push(escaped),
                Some(_) => return Err(malformed("Unexpected character after u0001 escape")),
                None => return Err(malformed("unexpected end of encoding")),
            },
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        return Err(malformed("encoding terminated early"));
    }
    Ok(children)
}

/// Decodes keys produced by [`PassableEncoder`]
#[derive(Default)]
pub struct PassableDecoder {
    options: DecodeOptions,
}

impl PassableDecoder {
    /// Create a decoder with the given hooks
    pub fn new(options: DecodeOptions) -> Self {
        PassableDecoder { options }
    }

    /// Decode a key back into a hardened passable
    pub fn decode(&self, encoded: &str) -> Result<Value> {
        let Some(prefix) = encoded.chars().next() else {
            return Err(PassableError::malformed("key", "empty encoding"));
        };
        let rest = &encoded[prefix.len_utf8()..];
        match prefix {
            'v' if rest.is_empty() => Ok(Value::Null),
            'z' if rest.is_empty() => Ok(Value::Undefined),
            'f' => decode_binary64(encoded).map(Value::Number),
            's' => Ok(Value::string(rest)),
            'b' => match rest {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(PassableError::malformed(
                    "boolean",
                    format!("expected encoded boolean: {encoded:?}"),
                )),
            },
            'n' | 'p' => decode_bigint(encoded).map(Value::BigInt),
            'y' => passable_symbol_for_name(rest).map(Value::Symbol),
            'r' => self.delegate(self.options.decode_remotable.as_ref(), encoded, "remotable"),
            '?' => self.delegate(self.options.decode_promise.as_ref(), encoded, "promise"),
            '!' => self.delegate(self.options.decode_error.as_ref(), encoded, "error"),
            '[' => {
                let elements = decode_sequence(encoded)?
                    .iter()
                    .map(|child| self.decode(child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::array(elements))
            }
            '(' => self.decode_record(rest),
            ':' => self.decode_tagged(rest),
            _ => Err(PassableError::malformed(
                "key",
                format!("invalid database key: {encoded:?}"),
            )),
        }
    }

    fn decode_pair(&self, encoded: &str, what: &str) -> Result<(String, String)> {
        let mut parts = decode_sequence(encoded)?;
        if parts.len() != 2 {
            return Err(PassableError::malformed(
                what,
                format!("expected a pair: {encoded:?}"),
            ));
        }
        let second = parts.pop().unwrap_or_default();
        let first = parts.pop().unwrap_or_default();
        Ok((first, second))
    }

    fn decode_record(&self, encoded: &str) -> Result<Value> {
        let (names, values) = self.decode_pair(encoded, "record")?;
        let names = decode_sequence(&names)?
            .into_iter()
            .map(|name| {
                name.strip_prefix('s').map(str::to_string).ok_or_else(|| {
                    PassableError::malformed("record", format!("record name must be a string: {name:?}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let values = decode_sequence(&values)?
            .iter()
            .map(|v| self.decode(v))
            .collect::<Result<Vec<_>>>()?;
        if names.len() != values.len() {
            return Err(PassableError::malformed(
                "record",
                format!("not a valid record encoding: {encoded:?}"),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(PassableError::malformed(
                "record",
                format!("duplicate record name {dup:?}"),
            ));
        }
        Ok(Value::record(names.into_iter().zip(values)))
    }

    fn decode_tagged(&self, encoded: &str) -> Result<Value> {
        let (tag, payload) = self.decode_pair(encoded, "tagged")?;
        let tag = tag.strip_prefix('s').ok_or_else(|| {
            PassableError::malformed("tagged", format!("not a valid tagged encoding: {encoded:?}"))
        })?;
        Ok(make_tagged(tag, self.decode(&payload)?))
    }

    fn delegate(&self, hook: Option<&DecodeHook>, encoded: &str, what: &str) -> Result<Value> {
        let hook = hook.ok_or_else(|| {
            PassableError::invalid(format!("{what} unexpected: {encoded:?}"))
        })?;
        hook(encoded, self)
    }
}

/// Encode with no hooks; fails on remotables, promises and errors
pub fn encode_passable(value: &Value) -> Result<String> {
    PassableEncoder::default().encode(value)
}

/// Decode with no hooks; fails on remotable, promise and error keys
pub fn decode_passable(encoded: &str) -> Result<Value> {
    PassableDecoder::default().decode(encoded)
}

/// Whether a key encodes a remotable
pub fn is_encoded_remotable(encoded: &str) -> bool {
    encoded.starts_with('r')
}
