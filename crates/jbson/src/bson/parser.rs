//! BSON pull parser.

use std::io::Read;

use crate::bson::constants;
use crate::error::{Error, Result};
use crate::event::{Container, Event, Location};
use crate::numbers::Decimal;
use crate::source::EventSource;

/// Options recognized by [`BsonParser`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BsonParserOptions {
    /// Decode the root document as an array, ignoring element names. For
    /// raw fragments whose members carry index names or no names at all.
    ///
    /// # Default
    ///
    /// `false`
    pub root_as_array: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    InContainer,
    End,
}

/// Streaming BSON pull parser producing the same [`Event`] sequence as the
/// text parser.
///
/// Declared container lengths are read but never trusted: a container ends
/// at its NUL terminator and nowhere else. Files whose length fields are
/// still zero placeholders (see [`super::fix_lengths`]) decode exactly like
/// fixed ones.
///
/// Reported locations are byte offsets; for a container start the offset of
/// its length field, for a container end the offset of its NUL terminator.
pub struct BsonParser<R: Read> {
    reader: R,
    root_as_array: bool,
    offset: u64,
    frames: Vec<Container>,
    state: State,
    event: Option<Event>,
    /// Offset of the current event's first byte, per the rules above.
    event_offset: u64,
    /// Type tag (and its offset) seen before the `Key` event that was just
    /// produced; its value payload is decoded on the next advance.
    pending_tag: Option<(u8, u64)>,
}

impl<R: Read> BsonParser<R> {
    /// Creates a parser reading from `reader`.
    pub fn new(reader: R, options: BsonParserOptions) -> Self {
        BsonParser {
            reader,
            root_as_array: options.root_as_array,
            offset: 0,
            frames: Vec::with_capacity(16),
            state: State::Initial,
            event: None,
            event_offset: 0,
            pending_tag: None,
        }
    }

    /// Consumes the parser and returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    // ---------------------------------------------------------------- input

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.reader.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::Decode {
                offset: self.offset,
                message: "unexpected end of input".into(),
            }),
            Err(e) => Err(Error::io("reading BSON input", e)),
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    fn read_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    fn read_cstring(&mut self) -> Result<String> {
        let start = self.offset;
        let mut bytes = Vec::new();
        loop {
            let b = self.read_u8()?;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        String::from_utf8(bytes).map_err(|_| Error::Decode {
            offset: start,
            message: "invalid UTF-8 in element name".into(),
        })
    }

    fn read_len(&mut self, what: &str) -> Result<usize> {
        let at = self.offset;
        let len = self.read_i32()?;
        usize::try_from(len).map_err(|_| Error::Decode {
            offset: at,
            message: format!("negative {what} length {len}"),
        })
    }

    // --------------------------------------------------------------- decode

    fn push_container(&mut self, container: Container) -> Result<Event> {
        // The declared length is a placeholder in not-yet-fixed files; read
        // it, record where it sits, and otherwise ignore it. The container
        // ends at its NUL terminator.
        self.event_offset = self.offset;
        self.read_i32()?;
        self.frames.push(container);
        self.state = State::InContainer;
        Ok(match container {
            Container::Array => Event::StartArray,
            Container::Object => Event::StartObject,
        })
    }

    fn decode_value(&mut self, tag: u8, tag_offset: u64) -> Result<Event> {
        match tag {
            constants::DOCUMENT => return self.push_container(Container::Object),
            constants::ARRAY => return self.push_container(Container::Array),
            _ => {}
        }
        self.event_offset = tag_offset;
        match tag {
            constants::DOUBLE => double_event(self.read_f64()?, self.event_offset),
            constants::STRING => {
                let at = self.offset;
                let len = self.read_len("string")?;
                if len == 0 {
                    return Err(Error::Decode {
                        offset: at,
                        message: "string missing NUL terminator".into(),
                    });
                }
                let mut bytes = vec![0u8; len];
                self.read_exact(&mut bytes)?;
                if bytes.pop() != Some(0) {
                    return Err(Error::Decode {
                        offset: at,
                        message: "string missing NUL terminator".into(),
                    });
                }
                let text = String::from_utf8(bytes).map_err(|_| Error::Decode {
                    offset: at,
                    message: "invalid UTF-8 in string".into(),
                })?;
                Ok(Event::Text(text))
            }
            constants::BINARY => {
                let len = self.read_len("binary")?;
                self.read_u8()?; // subtype
                let mut bytes = vec![0u8; len];
                self.read_exact(&mut bytes)?;
                Ok(Event::Binary(bytes))
            }
            constants::BOOL => Ok(Event::Bool(self.read_u8()? != 0)),
            constants::NULL => Ok(Event::Null),
            constants::INT32 => Ok(Event::Int(i64::from(self.read_i32()?))),
            constants::INT64 => Ok(Event::Int(self.read_i64()?)),
            _ => Err(Error::Decode {
                offset: tag_offset,
                message: format!("unknown type tag 0x{tag:02x}"),
            }),
        }
    }

    fn advance(&mut self) -> Result<Event> {
        match self.state {
            State::Initial => {
                let root = if self.root_as_array {
                    Container::Array
                } else {
                    Container::Object
                };
                self.push_container(root)
            }
            State::InContainer => {
                if let Some((tag, tag_offset)) = self.pending_tag.take() {
                    return self.decode_value(tag, tag_offset);
                }
                let tag_offset = self.offset;
                let tag = self.read_u8()?;
                if tag == 0 {
                    // Container terminator.
                    self.event_offset = tag_offset;
                    let closed = self.frames.pop().ok_or_else(|| Error::Decode {
                        offset: tag_offset,
                        message: "terminator outside any container".into(),
                    })?;
                    if self.frames.is_empty() {
                        self.state = State::End;
                    }
                    return Ok(match closed {
                        Container::Array => Event::EndArray,
                        Container::Object => Event::EndObject,
                    });
                }
                let name = self.read_cstring()?;
                match self.frames.last() {
                    Some(Container::Object) => {
                        // The value payload is decoded on the next call.
                        self.pending_tag = Some((tag, tag_offset));
                        self.event_offset = tag_offset;
                        Ok(Event::Key(name))
                    }
                    // Array element names are index strings; order already
                    // carries that information.
                    _ => self.decode_value(tag, tag_offset),
                }
            }
            State::End => Err(Error::Usage("next_event")),
        }
    }
}

impl<R: Read> EventSource for BsonParser<R> {
    fn has_next(&self) -> bool {
        self.state != State::End
    }

    fn next_event(&mut self) -> Result<&Event> {
        let event = self.advance()?;
        Ok(self.event.insert(event))
    }

    fn event(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    fn location(&self) -> Location {
        Location {
            line: 1,
            column: 1,
            offset: self.event_offset,
        }
    }
}

/// Maps a double onto the narrowest event: integral values without a
/// fractional part come back as integers so that numbers survive a
/// JSON to BSON to JSON round trip unchanged.
fn double_event(value: f64, offset: u64) -> Result<Event> {
    let Some(decimal) = Decimal::from_f64(value) else {
        return Err(Error::Decode {
            offset,
            message: format!("non-finite double {value}"),
        });
    };
    match decimal.to_bigint() {
        Some(big) => Ok(match i64::try_from(&big) {
            Ok(v) => Event::Int(v),
            Err(_) => Event::BigInt(big),
        }),
        None => Ok(Event::Decimal(decimal)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a document body into valid BSON with correct lengths.
    fn doc(elements: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let len = (elements.len() + 5) as i32;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(elements);
        out.push(0);
        out
    }

    /// Same document with every container length zeroed, as the encoder
    /// leaves it before the fix pass.
    fn zeroed(mut bytes: Vec<u8>) -> Vec<u8> {
        bytes[0] = 0;
        bytes[1] = 0;
        bytes[2] = 0;
        bytes[3] = 0;
        bytes
    }

    fn parse(bytes: &[u8]) -> Vec<Event> {
        let mut p = BsonParser::new(bytes, BsonParserOptions::default());
        let mut events = Vec::new();
        while p.has_next() {
            events.push(p.next_event().unwrap().clone());
        }
        events
    }

    fn scalar_doc() -> Vec<u8> {
        let mut e = Vec::new();
        // "i": int32 7
        e.extend_from_slice(&[0x10, b'i', 0]);
        e.extend_from_slice(&7i32.to_le_bytes());
        // "l": int64
        e.extend_from_slice(&[0x12, b'l', 0]);
        e.extend_from_slice(&(1i64 << 40).to_le_bytes());
        // "d": double 3.14
        e.extend_from_slice(&[0x01, b'd', 0]);
        e.extend_from_slice(&3.14f64.to_le_bytes());
        // "s": string "hi"
        e.extend_from_slice(&[0x02, b's', 0]);
        e.extend_from_slice(&3i32.to_le_bytes());
        e.extend_from_slice(b"hi\0");
        // "b": true
        e.extend_from_slice(&[0x08, b'b', 0, 1]);
        // "n": null
        e.extend_from_slice(&[0x0A, b'n', 0]);
        // "y": binary
        e.extend_from_slice(&[0x05, b'y', 0]);
        e.extend_from_slice(&4i32.to_le_bytes());
        e.push(0x00);
        e.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        doc(&e)
    }

    fn scalar_events() -> Vec<Event> {
        vec![
            Event::StartObject,
            Event::Key("i".into()),
            Event::Int(7),
            Event::Key("l".into()),
            Event::Int(1 << 40),
            Event::Key("d".into()),
            Event::Decimal("3.14".parse().unwrap()),
            Event::Key("s".into()),
            Event::Text("hi".into()),
            Event::Key("b".into()),
            Event::Bool(true),
            Event::Key("n".into()),
            Event::Null,
            Event::Key("y".into()),
            Event::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF]),
            Event::EndObject,
        ]
    }

    #[test]
    fn scalars() {
        assert_eq!(parse(&scalar_doc()), scalar_events());
    }

    #[test]
    fn zero_length_placeholders_decode_identically() {
        assert_eq!(parse(&zeroed(scalar_doc())), scalar_events());
    }

    #[test]
    fn integral_doubles_come_back_as_integers() {
        let mut e = Vec::new();
        e.extend_from_slice(&[0x01, b'a', 0]);
        e.extend_from_slice(&2.0f64.to_le_bytes());
        e.extend_from_slice(&[0x01, b'b', 0]);
        e.extend_from_slice(&1e21f64.to_le_bytes());
        let events = parse(&doc(&e));
        assert_eq!(events[2], Event::Int(2));
        assert_eq!(
            events[4],
            Event::BigInt("1000000000000000000000".parse().unwrap())
        );
    }

    #[test]
    fn nested_containers_and_locations() {
        // { "a": { }, "b": [ 5 ] }
        let mut inner_b = Vec::new();
        inner_b.extend_from_slice(&[0x10, b'0', 0]);
        inner_b.extend_from_slice(&5i32.to_le_bytes());
        let mut e = Vec::new();
        e.extend_from_slice(&[0x03, b'a', 0]);
        e.extend_from_slice(&doc(&[]));
        e.extend_from_slice(&[0x04, b'b', 0]);
        e.extend_from_slice(&doc(&inner_b));
        let bytes = doc(&e);

        let mut p = BsonParser::new(&bytes[..], BsonParserOptions::default());
        let mut trace = Vec::new();
        while p.has_next() {
            let event = p.next_event().unwrap().clone();
            trace.push((event, p.location().offset));
        }
        assert_eq!(
            trace,
            vec![
                (Event::StartObject, 0),
                (Event::Key("a".into()), 4),
                (Event::StartObject, 7),
                (Event::EndObject, 11),
                (Event::Key("b".into()), 12),
                (Event::StartArray, 15),
                (Event::Int(5), 19),
                (Event::EndArray, 26),
                (Event::EndObject, 27),
            ]
        );
        assert_eq!(bytes.len(), 28);
    }

    #[test]
    fn root_as_array_ignores_index_names() {
        let mut e = Vec::new();
        e.extend_from_slice(&[0x10, b'0', 0]);
        e.extend_from_slice(&1i32.to_le_bytes());
        e.extend_from_slice(&[0x10, b'1', 0]);
        e.extend_from_slice(&2i32.to_le_bytes());
        let bytes = doc(&e);
        let mut p = BsonParser::new(&bytes[..], BsonParserOptions { root_as_array: true });
        let mut events = Vec::new();
        while p.has_next() {
            events.push(p.next_event().unwrap().clone());
        }
        assert_eq!(
            events,
            vec![
                Event::StartArray,
                Event::Int(1),
                Event::Int(2),
                Event::EndArray,
            ]
        );
    }

    #[test]
    fn unknown_tag_is_a_decode_error() {
        let bytes = doc(&[0x7F, b'a', 0]);
        let mut p = BsonParser::new(&bytes[..], BsonParserOptions::default());
        p.next_event().unwrap();
        let err = p.next_event().unwrap_err();
        match err {
            Error::Decode { offset, message } => {
                assert_eq!(offset, 4);
                assert!(message.contains("0x7f"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn truncated_payload_is_a_decode_error() {
        let mut bytes = scalar_doc();
        bytes.truncate(10);
        let mut p = BsonParser::new(&bytes[..], BsonParserOptions::default());
        let err = loop {
            match p.next_event() {
                Ok(_) => {}
                Err(e) => break e,
            }
        };
        assert!(matches!(err, Error::Decode { .. }), "{err}");
    }

    #[test]
    fn binary_probe() {
        let bytes = scalar_doc();
        let mut p = BsonParser::new(&bytes[..], BsonParserOptions::default());
        while p.has_next() {
            let event = p.next_event().unwrap().clone();
            match event {
                Event::Text(_) => assert!(!p.is_binary().unwrap()),
                Event::Binary(b) => {
                    assert!(p.is_binary().unwrap());
                    assert_eq!(p.bytes_value().unwrap(), &b[..]);
                }
                _ => {}
            }
        }
    }
}
