//! Unified error system for the ocap stack
//!
//! One error type covers classification, ordering, and wire decoding so that
//! callers can match on a single taxonomy regardless of which layer failed.

use serde::{Deserialize, Serialize};

/// Unified error type for all passable operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum PassableError {
    /// Classification refused the input because a structural rule was violated
    #[error("Not passable: {message}")]
    NotPassable {
        /// Names the offending value and the violated rule
        message: String,
    },

    /// A cycle was found in pass-by-copy data
    #[error("Pass-by-copy data cannot be cyclic: {message}")]
    CyclicStructure {
        /// Describes the value that was revisited
        message: String,
    },

    /// Wire input does not conform to either wire grammar
    #[error("Malformed wire data at {field}: {message}")]
    MalformedWireData {
        /// The offending field or envelope part
        field: String,
        /// Expected shape versus what was found
        message: String,
    },

    /// A style marker or table entry that no layer knows how to handle
    #[error("Unrecognized style: {message}")]
    UnrecognizedStyle {
        /// Error message describing the unknown style
        message: String,
    },

    /// Invalid argument to an ordering or encoding operation
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// A caller-supplied conversion callback failed
    #[error("Callback failed: {message}")]
    Callback {
        /// Error message reported by the callback
        message: String,
    },
}

impl PassableError {
    /// Create a not-passable error
    pub fn not_passable(message: impl Into<String>) -> Self {
        Self::NotPassable {
            message: message.into(),
        }
    }

    /// Create a cyclic-structure error
    pub fn cyclic(message: impl Into<String>) -> Self {
        Self::CyclicStructure {
            message: message.into(),
        }
    }

    /// Create a malformed wire data error naming the offending field
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedWireData {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an unrecognized style error
    pub fn unrecognized_style(message: impl Into<String>) -> Self {
        Self::UnrecognizedStyle {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a callback error
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }

    /// The field named by a malformed wire data error, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MalformedWireData { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Errors raised by the host value model itself
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// Attempted to mutate a frozen object
    #[error("Cannot modify frozen object: {message}")]
    Frozen {
        /// Describes the attempted mutation
        message: String,
    },
}

impl ValueError {
    /// Create a frozen-object error
    pub fn frozen(message: impl Into<String>) -> Self {
        Self::Frozen {
            message: message.into(),
        }
    }
}

impl From<ValueError> for PassableError {
    fn from(err: ValueError) -> Self {
        PassableError::not_passable(err.to_string())
    }
}

/// Standard result type for passable operations
pub type Result<T> = std::result::Result<T, PassableError>;
