//! Reader errors.
//!
//! Three kinds: refused dialect constructs, wire/shape violations, and
//! re-entrant completion. Every error carries the owner-chain location it
//! was raised in; errors raised while reading an annotation are wrapped so
//! the message names the annotation context.

use std::fmt;
use tasty_format::{Addr, WireError};

/// What went wrong.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ErrorKind {
    /// A dialect construct the reader refuses. Carries the human-readable
    /// noun of the construct.
    Unsupported { construct: String },
    /// Wire or shape violation: corrupt input or a reader bug.
    Format { message: String },
    /// A completer re-entered itself.
    Cyclic { addr: Addr },
}

/// An unpickling failure.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ReaderError {
    pub kind: ErrorKind,
    /// Rendered owner chain of the definition being completed.
    pub location: String,
    /// Whether the failure happened inside annotation reading.
    pub in_annotation: bool,
}

impl ReaderError {
    #[cold]
    pub fn unsupported(construct: impl Into<String>, location: impl Into<String>) -> ReaderError {
        ReaderError {
            kind: ErrorKind::Unsupported {
                construct: construct.into(),
            },
            location: location.into(),
            in_annotation: false,
        }
    }

    #[cold]
    pub fn format(message: impl Into<String>, location: impl Into<String>) -> ReaderError {
        ReaderError {
            kind: ErrorKind::Format {
                message: message.into(),
            },
            location: location.into(),
            in_annotation: false,
        }
    }

    #[cold]
    pub fn cyclic(addr: Addr, location: impl Into<String>) -> ReaderError {
        ReaderError {
            kind: ErrorKind::Cyclic { addr },
            location: location.into(),
            in_annotation: false,
        }
    }

    /// Note that the error surfaced while reading an annotation.
    pub fn in_annotation(mut self) -> ReaderError {
        self.in_annotation = true;
        self
    }

    /// Whether the error is a refused construct (recoverable at the
    /// global scope boundary).
    pub fn is_unsupported(&self) -> bool {
        matches!(self.kind, ErrorKind::Unsupported { .. })
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.in_annotation {
            f.write_str("while reading an annotation of ")?;
        } else {
            f.write_str("while unpickling ")?;
        }
        write!(f, "{}: ", self.location)?;
        match &self.kind {
            ErrorKind::Unsupported { construct } => {
                write!(f, "unsupported construct: {construct}")
            }
            ErrorKind::Format { message } => write!(f, "malformed tree stream: {message}"),
            ErrorKind::Cyclic { addr } => {
                write!(f, "cyclic reference involving the definition at {addr}")
            }
        }
    }
}

impl std::error::Error for ReaderError {}

/// Result alias used throughout the reader.
pub type ReaderResult<T> = Result<T, ReaderError>;

impl From<WireError> for ReaderError {
    fn from(err: WireError) -> ReaderError {
        ReaderError {
            kind: ErrorKind::Format {
                message: err.to_string(),
            },
            location: "<toplevel>".to_string(),
            in_annotation: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_construct() {
        let err = ReaderError::unsupported("union types", "method f in class C");
        let text = err.to_string();
        assert!(text.contains("union types"), "{text}");
        assert!(text.contains("method f in class C"), "{text}");
    }

    #[test]
    fn annotation_wrapping_changes_the_message() {
        let err = ReaderError::unsupported("closures", "value x").in_annotation();
        assert!(err.to_string().starts_with("while reading an annotation"));
    }

    #[test]
    fn kinds_are_distinguishable() {
        assert!(ReaderError::unsupported("x", "y").is_unsupported());
        assert!(!ReaderError::format("x", "y").is_unsupported());
        assert!(!ReaderError::cyclic(Addr::new(3), "y").is_unsupported());
    }
}
