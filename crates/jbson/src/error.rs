//! Error taxonomy shared across the crate.
//!
//! Every failure is fatal to the current parse or generate session; the only
//! recovery is to discard the parser/generator and restart from a clean
//! stream. No variant is ever retried internally.

use thiserror::Error;

use crate::event::Location;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// All failures a parser, generator or the fix pass can produce.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed document structure: mismatched brackets, an unexpected
    /// token, or premature end of input.
    #[error("parse error at {location}: {message}")]
    Structural {
        /// Where the offending byte was found.
        location: Location,
        /// Human-readable description.
        message: String,
    },

    /// Malformed token: bad escape, control character in a string, or a
    /// malformed number.
    #[error("parse error at {location}: {message}")]
    Lexical {
        /// Where the offending byte was found.
        location: Location,
        /// Human-readable description.
        message: String,
    },

    /// A contract violation by the caller, such as invoking a typed
    /// accessor that does not match the current event. Not a data error.
    #[error("{0} cannot be called for the current state")]
    Usage(&'static str),

    /// Malformed BSON: unknown type tag or truncated payload.
    #[error("decode error at offset {offset}: {message}")]
    Decode {
        /// Byte offset of the offending input.
        offset: u64,
        /// Human-readable description.
        message: String,
    },

    /// A failure of the underlying stream, wrapped with context.
    #[error("{context}: {source}")]
    Io {
        /// What the crate was doing when the stream failed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wraps an I/O error with context.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// The input location of the error, when one applies.
    #[must_use]
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Structural { location, .. } | Error::Lexical { location, .. } => {
                Some(*location)
            }
            Error::Decode { offset, .. } => Some(Location {
                line: 1,
                column: 1,
                offset: *offset,
            }),
            Error::Usage(_) | Error::Io { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_message_carries_location() {
        let err = Error::Structural {
            location: Location {
                line: 1,
                column: 2,
                offset: 1,
            },
            message: "unexpected character '['".into(),
        };
        assert_eq!(
            err.to_string(),
            "parse error at line 1, column 2, offset 1: unexpected character '['"
        );
    }
}
