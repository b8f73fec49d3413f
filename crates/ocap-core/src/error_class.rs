//! Recognized error constructors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The error constructors a receiver knows how to rebuild.
///
/// Errors with any other name are still passable, but decode as [`ErrorClass::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// `Error`
    Error,
    /// `EvalError`
    EvalError,
    /// `RangeError`
    RangeError,
    /// `ReferenceError`
    ReferenceError,
    /// `SyntaxError`
    SyntaxError,
    /// `TypeError`
    TypeError,
    /// `URIError`
    UriError,
    /// `AggregateError`
    AggregateError,
}

impl ErrorClass {
    /// Every recognized class, in declaration order
    pub const ALL: [ErrorClass; 8] = [
        ErrorClass::Error,
        ErrorClass::EvalError,
        ErrorClass::RangeError,
        ErrorClass::ReferenceError,
        ErrorClass::SyntaxError,
        ErrorClass::TypeError,
        ErrorClass::UriError,
        ErrorClass::AggregateError,
    ];

    /// The constructor name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ErrorClass::Error => "Error",
            ErrorClass::EvalError => "EvalError",
            ErrorClass::RangeError => "RangeError",
            ErrorClass::ReferenceError => "ReferenceError",
            ErrorClass::SyntaxError => "SyntaxError",
            ErrorClass::TypeError => "TypeError",
            ErrorClass::UriError => "URIError",
            ErrorClass::AggregateError => "AggregateError",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ErrorClass {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        get_error_constructor(name).ok_or(())
    }
}

/// Look up a recognized error constructor by name.
pub fn get_error_constructor(name: &str) -> Option<ErrorClass> {
    ErrorClass::ALL.into_iter().find(|class| class.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_names() {
        assert_eq!(get_error_constructor("URIError"), Some(ErrorClass::UriError));
        assert_eq!(get_error_constructor("TypeError"), Some(ErrorClass::TypeError));
        assert_eq!(get_error_constructor("MyError"), None);
        assert_eq!(get_error_constructor("error"), None);
    }
}
