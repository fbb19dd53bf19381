//! Error types for the sound-change engine
//!
//! The engine distinguishes three failure modes, laid out in the module they
//! belong to: a malformed rule or sequence text ([`ParseError`]), a
//! malformed or missing resource table ([`ResourceError`]), and a lookup
//! against the feature-system registry for a name that was never registered
//! ([`UnknownSystemError`]). There is deliberately no `MatchError` or
//! `ApplyError` — a failed match is an ordinary `matched: false` result, and
//! forward/backward application never fails on parse-valid input.

use std::error::Error;
use std::fmt;

/// An ill-formed rule or segment-sequence text.
///
/// Carries the index of the offending token (0-based, counted over the
/// whitespace-separated tokens of the original text) so a caller can point
/// back at the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    msg: String,
    /// index of the token that triggered the error, if the error can be
    /// localized to a single token
    pub token_index: Option<usize>,
}

impl ParseError {
    pub(crate) fn new(msg: impl Into<String>) -> ParseError {
        ParseError {
            msg: msg.into(),
            token_index: None,
        }
    }

    pub(crate) fn at(token_index: usize, msg: impl Into<String>) -> ParseError {
        ParseError {
            msg: msg.into(),
            token_index: Some(token_index),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.token_index {
            Some(i) => write!(f, "parse error at token {}: {}", i, self.msg),
            None => write!(f, "parse error: {}", self.msg),
        }
    }
}

impl Error for ParseError {
    fn description(&self) -> &str {
        &self.msg
    }
}

/// A missing or malformed resource table (sounds, features, or classes),
/// or a uniqueness violation within one (duplicate grapheme, duplicate
/// value within a feature).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceError {
    msg: String,
}

impl ResourceError {
    pub(crate) fn new(msg: impl Into<String>) -> ResourceError {
        ResourceError { msg: msg.into() }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "resource error: {}", self.msg)
    }
}

impl Error for ResourceError {
    fn description(&self) -> &str {
        &self.msg
    }
}

/// A lookup against the feature-system registry for a name that has never
/// been registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSystemError {
    name: String,
}

impl UnknownSystemError {
    pub(crate) fn new(name: impl Into<String>) -> UnknownSystemError {
        UnknownSystemError { name: name.into() }
    }
}

impl fmt::Display for UnknownSystemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "no feature system registered under {:?}", self.name)
    }
}

impl Error for UnknownSystemError {
    fn description(&self) -> &str {
        "unknown feature system"
    }
}
