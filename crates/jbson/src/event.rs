//! The structural event vocabulary shared by every parser and generator.
//!
//! A parser yields exactly one [`Event`] per pull; a generator consumes the
//! same vocabulary through [`crate::EventSink`]. The sequence is forward-only
//! and non-restartable: `Key` appears only inside objects, immediately before
//! the value it names, and every `StartObject`/`StartArray` is eventually
//! paired with a matching end event at the same nesting depth.

use num_bigint::BigInt;

use crate::numbers::Decimal;

/// One discrete structural or scalar token produced by a parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `{` — an object is opened.
    StartObject,
    /// `}` — the innermost object is closed.
    EndObject,
    /// `[` — an array is opened.
    StartArray,
    /// `]` — the innermost array is closed.
    EndArray,
    /// An object member name; the next value event belongs to it.
    Key(String),
    /// A `null` value.
    Null,
    /// A `true` or `false` value.
    Bool(bool),
    /// An integral number that fits a machine integer.
    Int(i64),
    /// An integral number too large for `i64`.
    BigInt(BigInt),
    /// A number with a fractional part or exponent, kept at full precision.
    Decimal(Decimal),
    /// A text value.
    Text(String),
    /// A binary value (BSON binary element); JSON parsers never produce it.
    Binary(Vec<u8>),
}

impl Event {
    /// Returns `true` for the value-producing variants, i.e. everything
    /// except `Key` and the container end events.
    #[must_use]
    pub fn is_value(&self) -> bool {
        !matches!(self, Event::Key(_) | Event::EndObject | Event::EndArray)
    }
}

/// Kind of an open container, one entry per nesting level.
///
/// The parsers and generators all keep a `Vec<Container>` frame stack; the
/// top of the stack must match the container being closed, and popping the
/// last frame moves the state machine to its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// `[` .. `]`
    Array,
    /// `{` .. `}`
    Object,
}

/// Position of an event or error within the input stream.
///
/// `line` and `column` are 1-based and counted per byte consumed (the
/// parsers operate on UTF-8 bytes). For binary input only `offset` is
/// meaningful; the BSON parser reports `line` and `column` as 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// 1-based line number.
    pub line: u64,
    /// 1-based column number.
    pub column: u64,
    /// 0-based byte offset.
    pub offset: u64,
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "line {}, column {}, offset {}",
            self.line, self.column, self.offset
        )
    }
}
