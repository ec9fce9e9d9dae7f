//! The push side of the event contract.

use num_bigint::BigInt;

use crate::error::Result;
use crate::event::Event;
use crate::numbers::Decimal;

/// A consumer of [`Event`]s: any generator, regardless of wire format.
///
/// Every operation is validated against the writer state machine; calling an
/// operation that is illegal in the current state fails with
/// [`crate::Error::Usage`].
///
/// Binary payloads have a dedicated operation so that binary-capable sinks
/// can pass the bytes through unchanged while text sinks encode them.
pub trait EventSink {
    /// Opens an object.
    fn start_object(&mut self) -> Result<()>;
    /// Closes the innermost object.
    fn end_object(&mut self) -> Result<()>;
    /// Opens an array.
    fn start_array(&mut self) -> Result<()>;
    /// Closes the innermost array.
    fn end_array(&mut self) -> Result<()>;
    /// Writes a member name; only legal directly inside an object.
    fn write_key(&mut self, name: &str) -> Result<()>;
    /// Writes a `null` value.
    fn write_null(&mut self) -> Result<()>;
    /// Writes a boolean value.
    fn write_bool(&mut self, value: bool) -> Result<()>;
    /// Writes a machine integer.
    fn write_int(&mut self, value: i64) -> Result<()>;
    /// Writes an arbitrary-precision integer.
    fn write_big_int(&mut self, value: &BigInt) -> Result<()>;
    /// Writes an exact decimal.
    fn write_decimal(&mut self, value: &Decimal) -> Result<()>;
    /// Writes a text value.
    fn write_text(&mut self, value: &str) -> Result<()>;
    /// Writes a binary value.
    fn write_binary(&mut self, value: &[u8]) -> Result<()>;
    /// Flushes buffered output and validates that no container is left open.
    fn close(&mut self) -> Result<()>;

    /// Dispatches one event to the matching operation.
    ///
    /// # Errors
    ///
    /// Propagates the underlying operation's error.
    fn write_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::StartObject => self.start_object(),
            Event::EndObject => self.end_object(),
            Event::StartArray => self.start_array(),
            Event::EndArray => self.end_array(),
            Event::Key(name) => self.write_key(name),
            Event::Null => self.write_null(),
            Event::Bool(b) => self.write_bool(*b),
            Event::Int(v) => self.write_int(*v),
            Event::BigInt(v) => self.write_big_int(v),
            Event::Decimal(d) => self.write_decimal(d),
            Event::Text(s) => self.write_text(s),
            Event::Binary(b) => self.write_binary(b),
        }
    }
}
