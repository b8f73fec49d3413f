//! Interned symbols and their passable names.
//!
//! Only registered and well-known symbols are passable. Each has a unique
//! name: well-known symbols are spelled `@@<name>`, and registered symbols
//! whose own name already begins with `@@` get one more `@@` so the two
//! spaces never collide.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{PassableError, Result};

/// Names of the host's well-known symbols.
pub const WELL_KNOWN_SYMBOL_NAMES: &[&str] = &[
    "asyncIterator",
    "hasInstance",
    "isConcatSpreadable",
    "iterator",
    "match",
    "matchAll",
    "replace",
    "search",
    "species",
    "split",
    "toPrimitive",
    "toStringTag",
    "unscopables",
];

static NEXT_ANONYMOUS_ID: AtomicU64 = AtomicU64::new(1);

/// An atomic token, distinct from any string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// A symbol from the global registry, identified by its key
    Registered(String),
    /// One of the host's well-known symbols, identified without the `@@`
    WellKnown(String),
    /// A fresh symbol, identified only by its allocation
    Anonymous {
        /// Process-unique identity
        id: u64,
        /// Optional description used in diagnostics
        description: Option<String>,
    },
}

impl Symbol {
    /// Look up a registered symbol by key
    pub fn registered(key: impl Into<String>) -> Self {
        Symbol::Registered(key.into())
    }

    /// Look up a well-known symbol by its bare name (`"iterator"`)
    pub fn well_known(name: &str) -> Option<Self> {
        WELL_KNOWN_SYMBOL_NAMES
            .contains(&name)
            .then(|| Symbol::WellKnown(name.to_string()))
    }

    /// Allocate a fresh anonymous symbol
    pub fn anonymous(description: Option<&str>) -> Self {
        Symbol::Anonymous {
            id: NEXT_ANONYMOUS_ID.fetch_add(1, Ordering::Relaxed),
            description: description.map(str::to_string),
        }
    }

    /// The description a host would show for this symbol
    pub fn description(&self) -> Option<String> {
        match self {
            Symbol::Registered(key) => Some(key.clone()),
            Symbol::WellKnown(name) => Some(format!("Symbol.{name}")),
            Symbol::Anonymous { description, .. } => description.clone(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or_default())
    }
}

/// The unique passable name of a symbol, or `None` if it is not passable.
pub fn name_for_passable_symbol(symbol: &Symbol) -> Option<String> {
    match symbol {
        Symbol::WellKnown(name) => Some(format!("@@{name}")),
        Symbol::Registered(key) if key.starts_with("@@") => Some(format!("@@{key}")),
        Symbol::Registered(key) => Some(key.clone()),
        Symbol::Anonymous { .. } => None,
    }
}

/// Inverse of [`name_for_passable_symbol`].
pub fn passable_symbol_for_name(name: &str) -> Result<Symbol> {
    if let Some(rest) = name.strip_prefix("@@@@") {
        return Ok(Symbol::Registered(format!("@@{rest}")));
    }
    if let Some(rest) = name.strip_prefix("@@") {
        return Symbol::well_known(rest).ok_or_else(|| {
            PassableError::not_passable(format!("Reserved for well known symbol {name:?}"))
        });
    }
    Ok(Symbol::Registered(name.to_string()))
}

/// Fail unless the symbol is registered or well-known.
pub fn assert_passable_symbol(symbol: &Symbol) -> Result<()> {
    match symbol {
        Symbol::Anonymous { .. } => Err(PassableError::not_passable(format!(
            "Only registered symbols or well-known symbols are passable: {symbol}"
        ))),
        _ => Ok(()),
    }
}
