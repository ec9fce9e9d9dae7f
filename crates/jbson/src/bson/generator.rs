//! BSON event-driven generator.

use std::io::Write;

use num_bigint::BigInt;

use crate::bson::constants;
use crate::error::{Error, Result};
use crate::event::Container;
use crate::numbers::Decimal;
use crate::sink::EventSink;

/// Writes BSON to any [`Write`] sink, one event at a time.
///
/// Container length fields are written as zero placeholders: the true length
/// of a container is unknown until all of its children have been written,
/// and the sink may not be seekable. Run [`super::fix_lengths`] over the
/// finished file to patch them in place; until then only decoders that
/// ignore declared lengths (such as [`super::BsonParser`]) can read the
/// output.
///
/// Array elements are written with empty names. Integers use the narrower
/// of the two BSON integer encodings that holds the value; integers beyond
/// 64 bits and decimals are written as doubles, the widest numeric type the
/// format has.
pub struct BsonGenerator<W: Write> {
    writer: W,
    frames: Vec<Container>,
    /// Name for the element being written, set by `write_key`.
    pending_name: Option<String>,
    done: bool,
}

impl<W: Write> BsonGenerator<W> {
    /// Creates a generator writing to `writer`.
    pub fn new(writer: W) -> Self {
        BsonGenerator {
            writer,
            frames: Vec::with_capacity(16),
            pending_name: None,
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
            .map_err(|e| Error::io("writing BSON output", e))
    }

    /// Validates state and writes the `{tag, name}` element header. At the
    /// root (container starts only) there is no header.
    fn header(&mut self, tag: u8, container_ok: bool, op: &'static str) -> Result<()> {
        if self.done {
            return Err(Error::Usage(op));
        }
        let name = match self.frames.last() {
            None => {
                if !container_ok {
                    return Err(Error::Usage(op));
                }
                return Ok(());
            }
            Some(Container::Object) => self.pending_name.take().ok_or(Error::Usage(op))?,
            Some(Container::Array) => String::new(),
        };
        self.out(&[tag])?;
        self.out(name.as_bytes())?;
        self.out(&[0])
    }

    fn push(&mut self, container: Container, tag: u8, op: &'static str) -> Result<()> {
        self.header(tag, true, op)?;
        // Placeholder length, patched by the fix pass.
        self.out(&0i32.to_le_bytes())?;
        self.frames.push(container);
        Ok(())
    }

    fn pop(&mut self, container: Container, op: &'static str) -> Result<()> {
        if self.done || self.pending_name.is_some() {
            return Err(Error::Usage(op));
        }
        match self.frames.last() {
            Some(top) if *top == container => {}
            _ => return Err(Error::Usage(op)),
        }
        self.frames.pop();
        self.out(&[0])?;
        if self.frames.is_empty() {
            self.done = true;
        }
        Ok(())
    }

    fn write_double(&mut self, value: f64, op: &'static str) -> Result<()> {
        self.header(constants::DOUBLE, false, op)?;
        self.out(&value.to_le_bytes())
    }
}

impl<W: Write> EventSink for BsonGenerator<W> {
    fn start_object(&mut self) -> Result<()> {
        self.push(Container::Object, constants::DOCUMENT, "start_object")
    }

    fn end_object(&mut self) -> Result<()> {
        self.pop(Container::Object, "end_object")
    }

    fn start_array(&mut self) -> Result<()> {
        self.push(Container::Array, constants::ARRAY, "start_array")
    }

    fn end_array(&mut self) -> Result<()> {
        self.pop(Container::Array, "end_array")
    }

    fn write_key(&mut self, name: &str) -> Result<()> {
        if self.done || self.pending_name.is_some() {
            return Err(Error::Usage("write_key"));
        }
        match self.frames.last() {
            Some(Container::Object) => {}
            _ => return Err(Error::Usage("write_key")),
        }
        self.pending_name = Some(name.to_owned());
        Ok(())
    }

    fn write_null(&mut self) -> Result<()> {
        self.header(constants::NULL, false, "write_null")
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.header(constants::BOOL, false, "write_bool")?;
        self.out(&[u8::from(value)])
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        match i32::try_from(value) {
            Ok(small) => {
                self.header(constants::INT32, false, "write_int")?;
                self.out(&small.to_le_bytes())
            }
            Err(_) => {
                self.header(constants::INT64, false, "write_int")?;
                self.out(&value.to_le_bytes())
            }
        }
    }

    fn write_big_int(&mut self, value: &BigInt) -> Result<()> {
        match i64::try_from(value) {
            Ok(v) => self.write_int(v),
            // Beyond 64 bits the format only has the double to offer.
            Err(_) => {
                let approx = value.to_string().parse::<f64>().unwrap_or(f64::NAN);
                self.write_double(approx, "write_big_int")
            }
        }
    }

    fn write_decimal(&mut self, value: &Decimal) -> Result<()> {
        self.write_double(value.to_f64(), "write_decimal")
    }

    fn write_text(&mut self, value: &str) -> Result<()> {
        self.header(constants::STRING, false, "write_text")?;
        let len = i32::try_from(value.len() + 1).map_err(|_| Error::Usage("write_text"))?;
        self.out(&len.to_le_bytes())?;
        self.out(value.as_bytes())?;
        self.out(&[0])
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<()> {
        self.header(constants::BINARY, false, "write_binary")?;
        let len = i32::try_from(value.len()).map_err(|_| Error::Usage("write_binary"))?;
        self.out(&len.to_le_bytes())?;
        self.out(&[constants::SUBTYPE_GENERIC])?;
        self.out(value)
    }

    fn close(&mut self) -> Result<()> {
        if !self.done {
            return Err(Error::Usage("close"));
        }
        self.writer
            .flush()
            .map_err(|e| Error::io("flushing BSON output", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bson::parser::{BsonParser, BsonParserOptions};
    use crate::event::Event;
    use crate::source::EventSource;

    fn generate(build: impl FnOnce(&mut BsonGenerator<&mut Vec<u8>>)) -> Vec<u8> {
        let mut out = Vec::new();
        let mut g = BsonGenerator::new(&mut out);
        build(&mut g);
        g.close().unwrap();
        out
    }

    fn parse(bytes: &[u8]) -> Vec<Event> {
        let mut p = BsonParser::new(bytes, BsonParserOptions::default());
        let mut events = Vec::new();
        while p.has_next() {
            events.push(p.next_event().unwrap().clone());
        }
        events
    }

    #[test]
    fn placeholder_lengths_are_zero() {
        let bytes = generate(|g| {
            g.start_object().unwrap();
            g.write_key("a").unwrap();
            g.start_array().unwrap();
            g.end_array().unwrap();
            g.end_object().unwrap();
        });
        assert_eq!(&bytes[0..4], &[0, 0, 0, 0]);
        // Nested array length after {tag, "a\0"}.
        assert_eq!(&bytes[7..11], &[0, 0, 0, 0]);
    }

    #[test]
    fn scalar_encodings() {
        let bytes = generate(|g| {
            g.start_object().unwrap();
            g.write_key("i").unwrap();
            g.write_int(7).unwrap();
            g.write_key("l").unwrap();
            g.write_int(1 << 40).unwrap();
            g.write_key("s").unwrap();
            g.write_text("hi").unwrap();
            g.write_key("b").unwrap();
            g.write_bool(false).unwrap();
            g.write_key("n").unwrap();
            g.write_null().unwrap();
            g.write_key("y").unwrap();
            g.write_binary(&[1, 2, 3]).unwrap();
            g.end_object().unwrap();
        });
        assert_eq!(
            parse(&bytes),
            vec![
                Event::StartObject,
                Event::Key("i".into()),
                Event::Int(7),
                Event::Key("l".into()),
                Event::Int(1 << 40),
                Event::Key("s".into()),
                Event::Text("hi".into()),
                Event::Key("b".into()),
                Event::Bool(false),
                Event::Key("n".into()),
                Event::Null,
                Event::Key("y".into()),
                Event::Binary(vec![1, 2, 3]),
                Event::EndObject,
            ]
        );
    }

    #[test]
    fn int_width_selection() {
        let bytes = generate(|g| {
            g.start_array().unwrap();
            g.write_int(i64::from(i32::MAX)).unwrap();
            g.write_int(i64::from(i32::MAX) + 1).unwrap();
            g.end_array().unwrap();
        });
        // tag bytes of the two elements
        assert_eq!(bytes[4], 0x10);
        assert_eq!(bytes[4 + 2 + 4], 0x12);
    }

    #[test]
    fn oversized_integers_degrade_to_double() {
        let big: BigInt = "1000000000000000000000".parse().unwrap();
        let bytes = generate(|g| {
            g.start_array().unwrap();
            g.write_big_int(&big).unwrap();
            g.end_array().unwrap();
        });
        assert_eq!(bytes[4], 0x01);
        assert_eq!(parse(&bytes), vec![
            Event::StartArray,
            Event::BigInt(big),
            Event::EndArray,
        ]);
    }

    #[test]
    fn decimal_becomes_double() {
        let bytes = generate(|g| {
            g.start_array().unwrap();
            g.write_decimal(&"3.14".parse().unwrap()).unwrap();
            g.end_array().unwrap();
        });
        assert_eq!(bytes[4], 0x01);
        assert_eq!(&bytes[6..14], &3.14f64.to_le_bytes());
    }

    #[test]
    fn misuse_is_rejected() {
        let mut out = Vec::new();
        let mut g = BsonGenerator::new(&mut out);
        assert!(matches!(g.write_int(1), Err(Error::Usage(_))));
        assert!(matches!(g.write_key("k"), Err(Error::Usage(_))));
        g.start_object().unwrap();
        assert!(matches!(g.write_int(1), Err(Error::Usage(_))));
        g.write_key("k").unwrap();
        assert!(matches!(g.write_key("k2"), Err(Error::Usage(_))));
        assert!(matches!(g.end_object(), Err(Error::Usage(_))));
        g.write_int(1).unwrap();
        g.end_object().unwrap();
        g.close().unwrap();
        assert!(matches!(g.start_array(), Err(Error::Usage(_))));
    }
}
