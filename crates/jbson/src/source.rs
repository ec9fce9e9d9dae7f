//! The pull side of the event contract.

use num_bigint::BigInt;

use crate::error::{Error, Result};
use crate::event::{Event, Location};
use crate::numbers::Decimal;

/// A producer of [`Event`]s: any parser, regardless of wire format.
///
/// Exactly one event is "current" at a time. The typed accessors are only
/// valid for the event kinds they name and fail with [`Error::Usage`]
/// otherwise — that is a programming error, not a data error.
///
/// Implementations are not re-entrant and not safe for concurrent use.
pub trait EventSource {
    /// Returns `false` once the top-level value has been fully consumed.
    fn has_next(&self) -> bool;

    /// Advances to the next event and returns it.
    ///
    /// # Errors
    ///
    /// Fails with a parse/decode error on malformed input, or with
    /// [`Error::Usage`] when the sequence is already exhausted.
    fn next_event(&mut self) -> Result<&Event>;

    /// The current event, if [`next_event`](Self::next_event) has been
    /// called at least once.
    fn event(&self) -> Option<&Event>;

    /// The input location of the first byte of the current event.
    fn location(&self) -> Location;

    /// Text of the current `Key` or `Text` event.
    fn string_value(&self) -> Result<&str> {
        match self.event() {
            Some(Event::Key(s) | Event::Text(s)) => Ok(s),
            _ => Err(Error::Usage("string_value")),
        }
    }

    /// Value of the current `Bool` event.
    fn bool_value(&self) -> Result<bool> {
        match self.event() {
            Some(Event::Bool(b)) => Ok(*b),
            _ => Err(Error::Usage("bool_value")),
        }
    }

    /// Value of the current `Int` event.
    fn int_value(&self) -> Result<i64> {
        match self.event() {
            Some(Event::Int(v)) => Ok(*v),
            _ => Err(Error::Usage("int_value")),
        }
    }

    /// Value of the current `Int` or `BigInt` event at arbitrary precision.
    fn big_int_value(&self) -> Result<BigInt> {
        match self.event() {
            Some(Event::Int(v)) => Ok(BigInt::from(*v)),
            Some(Event::BigInt(v)) => Ok(v.clone()),
            _ => Err(Error::Usage("big_int_value")),
        }
    }

    /// The current number event as an exact decimal.
    fn decimal_value(&self) -> Result<Decimal> {
        match self.event() {
            Some(Event::Int(v)) => Ok(Decimal::new(BigInt::from(*v), 0)),
            Some(Event::BigInt(v)) => Ok(Decimal::new(v.clone(), 0)),
            Some(Event::Decimal(d)) => Ok(d.clone()),
            _ => Err(Error::Usage("decimal_value")),
        }
    }

    /// Returns `true` when the current number event has no fractional part.
    fn is_integral_number(&self) -> Result<bool> {
        match self.event() {
            Some(Event::Int(_) | Event::BigInt(_)) => Ok(true),
            Some(Event::Decimal(d)) => Ok(d.is_integral()),
            _ => Err(Error::Usage("is_integral_number")),
        }
    }

    /// Returns `true` when the current value event carries a binary payload.
    ///
    /// This is the capability probe used by the conversion driver: text
    /// parsers always answer `false` for their string values.
    fn is_binary(&self) -> Result<bool> {
        match self.event() {
            Some(Event::Binary(_)) => Ok(true),
            Some(Event::Text(_)) => Ok(false),
            _ => Err(Error::Usage("is_binary")),
        }
    }

    /// Bytes of the current `Binary` event.
    fn bytes_value(&self) -> Result<&[u8]> {
        match self.event() {
            Some(Event::Binary(b)) => Ok(b),
            _ => Err(Error::Usage("bytes_value")),
        }
    }
}
