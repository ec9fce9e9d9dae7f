//! Event-driven JSON text generator, compact or pretty-printed.

use std::io::Write;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use num_bigint::BigInt;

use crate::error::{Error, Result};
use crate::event::Container;
use crate::numbers::Decimal;
use crate::sink::EventSink;

/// Options recognized by [`JsonGenerator`].
#[derive(Debug, Clone)]
pub struct JsonGeneratorOptions {
    /// Emit newlines and indentation instead of minimal output.
    ///
    /// # Default
    ///
    /// `false`
    pub pretty_print: bool,
    /// The string repeated once per nesting level when pretty-printing.
    ///
    /// # Default
    ///
    /// `"\t"`
    pub indent: String,
}

impl Default for JsonGeneratorOptions {
    fn default() -> Self {
        JsonGeneratorOptions {
            pretty_print: false,
            indent: "\t".into(),
        }
    }
}

#[derive(Debug)]
struct Frame {
    container: Container,
    /// Cleared after the first element; drives comma placement.
    first: bool,
}

/// Writes a JSON document to any [`Write`] sink, one event at a time.
///
/// The root must be an object or array. Every operation is checked against
/// the writer state, so an out-of-place call fails with
/// [`crate::Error::Usage`] before anything hits the output.
///
/// Binary values have no JSON representation and are emitted as base64
/// strings.
///
/// # Examples
///
/// ```
/// use jbson::{EventSink, JsonGenerator, JsonGeneratorOptions};
///
/// let mut out = Vec::new();
/// let mut g = JsonGenerator::new(&mut out, JsonGeneratorOptions::default());
/// g.start_object().unwrap();
/// g.write_key("n").unwrap();
/// g.write_int(42).unwrap();
/// g.end_object().unwrap();
/// g.close().unwrap();
/// assert_eq!(out, br#"{"n":42}"#);
/// ```
pub struct JsonGenerator<W: Write> {
    writer: W,
    pretty: bool,
    indent: String,
    frames: Vec<Frame>,
    /// A key has been written and its value has not.
    key_pending: bool,
    done: bool,
}

impl<W: Write> JsonGenerator<W> {
    /// Creates a generator writing to `writer`.
    pub fn new(writer: W, options: JsonGeneratorOptions) -> Self {
        JsonGenerator {
            writer,
            pretty: options.pretty_print,
            indent: options.indent,
            frames: Vec::with_capacity(16),
            key_pending: false,
            done: false,
        }
    }

    /// Consumes the generator and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn out(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .write_all(bytes)
            .map_err(|e| Error::io("writing JSON output", e))
    }

    fn newline_indent(&mut self, depth: usize) -> Result<()> {
        let io = |e| Error::io("writing JSON output", e);
        self.writer.write_all(b"\n").map_err(io)?;
        for _ in 0..depth {
            self.writer.write_all(self.indent.as_bytes()).map_err(io)?;
        }
        Ok(())
    }

    /// Writes the separator due before an array element or object key.
    fn separate(&mut self) -> Result<()> {
        let Some(top) = self.frames.last_mut() else {
            return Ok(());
        };
        let first = core::mem::replace(&mut top.first, false);
        if !first {
            self.out(b",")?;
        }
        if self.pretty {
            self.newline_indent(self.frames.len())?;
        }
        Ok(())
    }

    /// Validates that a value may be written here and emits any separator.
    /// A value is legal after a key, as an array element, or as the root
    /// container opener (`container_ok`).
    fn before_value(&mut self, container_ok: bool, op: &'static str) -> Result<()> {
        if self.done {
            return Err(Error::Usage(op));
        }
        match self.frames.last() {
            None => {
                if !container_ok {
                    return Err(Error::Usage(op));
                }
                Ok(())
            }
            Some(Frame {
                container: Container::Object,
                ..
            }) => {
                if !self.key_pending {
                    return Err(Error::Usage(op));
                }
                self.key_pending = false;
                Ok(())
            }
            Some(Frame {
                container: Container::Array,
                ..
            }) => self.separate(),
        }
    }

    fn push(&mut self, container: Container, open: &[u8], op: &'static str) -> Result<()> {
        self.before_value(true, op)?;
        self.out(open)?;
        self.frames.push(Frame {
            container,
            first: true,
        });
        Ok(())
    }

    fn pop(&mut self, container: Container, close: &[u8], op: &'static str) -> Result<()> {
        if self.done || self.key_pending {
            return Err(Error::Usage(op));
        }
        match self.frames.last() {
            Some(top) if top.container == container => {}
            _ => return Err(Error::Usage(op)),
        }
        let frame = self.frames.pop().ok_or(Error::Usage(op))?;
        if self.pretty && !frame.first {
            self.newline_indent(self.frames.len())?;
        }
        self.out(close)?;
        if self.frames.is_empty() {
            self.done = true;
        }
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        let mut buf = Vec::with_capacity(value.len() + 2);
        buf.push(b'"');
        for b in value.bytes() {
            match b {
                b'"' => buf.extend_from_slice(b"\\\""),
                b'\\' => buf.extend_from_slice(b"\\\\"),
                0x08 => buf.extend_from_slice(b"\\b"),
                0x0C => buf.extend_from_slice(b"\\f"),
                b'\n' => buf.extend_from_slice(b"\\n"),
                b'\r' => buf.extend_from_slice(b"\\r"),
                b'\t' => buf.extend_from_slice(b"\\t"),
                0x00..=0x1F => {
                    buf.extend_from_slice(format!("\\u{:04x}", u32::from(b)).as_bytes());
                }
                _ => buf.push(b),
            }
        }
        buf.push(b'"');
        self.out(&buf)
    }
}

impl<W: Write> EventSink for JsonGenerator<W> {
    fn start_object(&mut self) -> Result<()> {
        self.push(Container::Object, b"{", "start_object")
    }

    fn end_object(&mut self) -> Result<()> {
        self.pop(Container::Object, b"}", "end_object")
    }

    fn start_array(&mut self) -> Result<()> {
        self.push(Container::Array, b"[", "start_array")
    }

    fn end_array(&mut self) -> Result<()> {
        self.pop(Container::Array, b"]", "end_array")
    }

    fn write_key(&mut self, name: &str) -> Result<()> {
        if self.done || self.key_pending {
            return Err(Error::Usage("write_key"));
        }
        match self.frames.last() {
            Some(Frame {
                container: Container::Object,
                ..
            }) => {}
            _ => return Err(Error::Usage("write_key")),
        }
        self.separate()?;
        self.write_string(name)?;
        self.out(if self.pretty { b" : " } else { b":" })?;
        self.key_pending = true;
        Ok(())
    }

    fn write_null(&mut self) -> Result<()> {
        self.before_value(false, "write_null")?;
        self.out(b"null")
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.before_value(false, "write_bool")?;
        self.out(if value { b"true" } else { b"false" })
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        self.before_value(false, "write_int")?;
        let mut buf = [0u8; 20];
        self.out(format_i64(&mut buf, value))
    }

    fn write_big_int(&mut self, value: &BigInt) -> Result<()> {
        self.before_value(false, "write_big_int")?;
        let text = value.to_string();
        self.out(text.as_bytes())
    }

    fn write_decimal(&mut self, value: &Decimal) -> Result<()> {
        self.before_value(false, "write_decimal")?;
        let text = value.to_string();
        self.out(text.as_bytes())
    }

    fn write_text(&mut self, value: &str) -> Result<()> {
        self.before_value(false, "write_text")?;
        self.write_string(value)
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<()> {
        self.before_value(false, "write_binary")?;
        let encoded = BASE64.encode(value);
        self.write_string(&encoded)
    }

    fn close(&mut self) -> Result<()> {
        if !self.done {
            return Err(Error::Usage("close"));
        }
        self.writer
            .flush()
            .map_err(|e| Error::io("flushing JSON output", e))
    }
}

/// Formats an `i64` into `buf` without allocating; 20 bytes fit `i64::MIN`.
fn format_i64(buf: &mut [u8; 20], value: i64) -> &[u8] {
    use std::io::Cursor;
    let mut cursor = Cursor::new(&mut buf[..]);
    let _ = write!(cursor, "{value}");
    let len = cursor.position() as usize;
    &buf[..len]
}
