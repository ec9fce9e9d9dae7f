//! The hand-written JSON lexer/parser.
//!
//! A single forward pass over a byte stream: no token list is materialized,
//! every event is produced on demand from [`JsonParser::next_event`]. The
//! parser owns a fixed-size read buffer refilled transparently and a growable
//! append buffer that accumulates the raw text of the current string or
//! number token. Line, column and byte offset are tracked per byte consumed;
//! `unread` rewinds exactly one position, which is all the grammar needs.

use std::io::Read;

use num_bigint::BigInt;

use crate::error::{Error, Result};
use crate::event::{Container, Event, Location};
use crate::source::EventSource;

const READ_BUF_SIZE: usize = 8192;

/// Options recognized by [`JsonParser`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParserOptions {
    /// Accept JavaScript `//` line and `/* */` block comments wherever
    /// whitespace is legal.
    ///
    /// # Default
    ///
    /// `false`
    pub allow_comments: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting `[` or `{` at depth 0.
    Initial,
    InObject,
    InArray,
    /// The top-level value has been fully consumed.
    End,
}

/// What the last event was, from the separator grammar's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastToken {
    /// A container was just opened.
    Start,
    /// A value (or container end) was just produced.
    Value,
    /// A key was just produced; a `:` and a value must follow.
    Field,
}

/// Streaming JSON pull parser over any [`Read`] source of UTF-8 bytes.
///
/// # Examples
///
/// ```
/// use jbson::{Event, EventSource, JsonParser, JsonParserOptions};
///
/// let mut parser = JsonParser::new(&b"[1, true]"[..], JsonParserOptions::default());
/// assert_eq!(parser.next_event().unwrap(), &Event::StartArray);
/// assert_eq!(parser.next_event().unwrap(), &Event::Int(1));
/// assert_eq!(parser.next_event().unwrap(), &Event::Bool(true));
/// assert_eq!(parser.next_event().unwrap(), &Event::EndArray);
/// assert!(!parser.has_next());
/// ```
pub struct JsonParser<R: Read> {
    reader: R,
    allow_comments: bool,

    read_buf: Box<[u8]>,
    read_pos: usize,
    read_max: usize,

    /// Raw text of the current string/number token; cleared per token.
    append: Vec<u8>,

    line: u64,
    column: u64,
    offset: u64,
    /// Location saved at the opening quote of the current string/key.
    saved: Location,

    frames: Vec<Container>,
    state: State,
    last_token: LastToken,
    /// Whether the current number literal had no fraction or exponent.
    is_int: bool,

    event: Option<Event>,
}

impl<R: Read> JsonParser<R> {
    /// Creates a parser reading from `reader`.
    pub fn new(reader: R, options: JsonParserOptions) -> Self {
        JsonParser {
            reader,
            allow_comments: options.allow_comments,
            read_buf: vec![0; READ_BUF_SIZE].into_boxed_slice(),
            read_pos: 0,
            read_max: 0,
            append: Vec::with_capacity(64),
            line: 1,
            column: 1,
            offset: 0,
            saved: Location {
                line: 1,
                column: 1,
                offset: 0,
            },
            frames: Vec::with_capacity(16),
            state: State::Initial,
            last_token: LastToken::Start,
            is_int: false,
            event: None,
        }
    }

    /// Consumes the parser and returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    // ---------------------------------------------------------------- input

    fn fill(&mut self) -> Result<()> {
        self.read_pos = 0;
        loop {
            match self.reader.read(&mut self.read_buf) {
                Ok(0) => return Err(self.eof_error()),
                Ok(n) => {
                    self.read_max = n;
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::io("reading JSON input", e)),
            }
        }
    }

    fn read(&mut self) -> Result<u8> {
        if self.read_pos >= self.read_max {
            self.fill()?;
        }
        self.offset += 1;
        self.column += 1;
        let b = self.read_buf[self.read_pos];
        self.read_pos += 1;
        Ok(b)
    }

    /// Rewinds exactly one byte; lookahead never needs more.
    fn unread(&mut self) {
        self.read_pos -= 1;
        self.offset -= 1;
        self.column -= 1;
    }

    fn newline(&mut self) {
        self.column = 1;
        self.line += 1;
    }

    // --------------------------------------------------------------- errors

    /// Location of the byte most recently consumed.
    fn prev_location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column - 1,
            offset: self.offset - 1,
        }
    }

    fn current_location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn unexpected(&self, b: u8) -> Error {
        Error::Structural {
            location: self.prev_location(),
            message: format!("unexpected character '{}'", display_byte(b)),
        }
    }

    fn unexpected_lexical(&self, b: u8) -> Error {
        Error::Lexical {
            location: self.prev_location(),
            message: format!("unexpected character '{}'", display_byte(b)),
        }
    }

    fn eof_error(&self) -> Error {
        Error::Structural {
            location: self.current_location(),
            message: "unexpected end of input".into(),
        }
    }

    // --------------------------------------------------------------- frames

    fn push_frame(&mut self, container: Container) {
        self.frames.push(container);
        self.state = match container {
            Container::Array => State::InArray,
            Container::Object => State::InObject,
        };
        self.last_token = LastToken::Start;
    }

    fn pop_frame(&mut self, closing: Container, close_byte: u8) -> Result<Event> {
        match self.frames.pop() {
            Some(top) if top == closing => {}
            _ => return Err(self.unexpected(close_byte)),
        }
        self.state = match self.frames.last() {
            Some(Container::Array) => State::InArray,
            Some(Container::Object) => State::InObject,
            None => State::End,
        };
        self.last_token = LastToken::Value;
        Ok(match closing {
            Container::Array => Event::EndArray,
            Container::Object => Event::EndObject,
        })
    }

    // ------------------------------------------------------------- comments

    /// Comment handling lives in the unexpected-character path so the happy
    /// path pays nothing for it.
    fn scan_unexpected(&mut self, b: u8) -> Result<()> {
        if !self.allow_comments || b != b'/' {
            return Err(self.unexpected(b));
        }
        self.read_comment()
    }

    fn read_comment(&mut self) -> Result<()> {
        let b = self.read()?;
        match b {
            b'/' => self.read_line_comment(),
            b'*' => self.read_block_comment(),
            _ => {
                // Back up over the bad opener so the error points at the '/'.
                self.offset -= 1;
                self.column -= 1;
                Err(self.unexpected(b'/'))
            }
        }
    }

    fn read_line_comment(&mut self) -> Result<()> {
        loop {
            if self.read()? == b'\n' {
                self.newline();
                return Ok(());
            }
        }
    }

    fn read_block_comment(&mut self) -> Result<()> {
        let mut star = false;
        loop {
            match self.read()? {
                b'\n' => {
                    self.newline();
                    star = false;
                }
                b'*' => star = true,
                b'/' if star => return Ok(()),
                _ => star = false,
            }
        }
    }

    // -------------------------------------------------------------- scalars

    fn expect_literal(&mut self, rest: &[u8]) -> Result<()> {
        for &expected in rest {
            let b = self.read()?;
            if b != expected {
                return Err(self.unexpected(b));
            }
        }
        Ok(())
    }

    fn read_exp(&mut self) -> Result<()> {
        let mut b = self.read()?;
        if matches!(b, b'+' | b'-') {
            self.append.push(b);
            b = self.read()?;
        }
        if !b.is_ascii_digit() {
            return Err(self.unexpected_lexical(b));
        }
        self.append.push(b);
        loop {
            let b = self.read()?;
            if b.is_ascii_digit() {
                self.append.push(b);
            } else {
                self.unread();
                return Ok(());
            }
        }
    }

    fn read_fraction(&mut self) -> Result<()> {
        self.is_int = false;
        let b = self.read()?;
        if !b.is_ascii_digit() {
            return Err(self.unexpected_lexical(b));
        }
        self.append.push(b);
        loop {
            let b = self.read()?;
            if b.is_ascii_digit() {
                self.append.push(b);
            } else if matches!(b, b'e' | b'E') {
                self.append.push(b);
                self.is_int = false;
                return self.read_exp();
            } else {
                self.unread();
                return Ok(());
            }
        }
    }

    fn read_number(&mut self, first: u8) -> Result<()> {
        self.is_int = true;
        self.append.push(first);

        if first == b'0' {
            // No leading zeros: `0` must be followed by `.` or a non-digit.
            let b = self.read()?;
            if b == b'.' {
                self.append.push(b);
                return self.read_fraction();
            }
            self.unread();
            return Ok(());
        }

        loop {
            let b = self.read()?;
            if b.is_ascii_digit() {
                self.append.push(b);
            } else if b == b'.' {
                self.append.push(b);
                return self.read_fraction();
            } else if matches!(b, b'e' | b'E') {
                self.append.push(b);
                self.is_int = false;
                return self.read_exp();
            } else {
                self.unread();
                return Ok(());
            }
        }
    }

    /// Derives the number event from the retained literal, picking `i64`
    /// when the digit count guarantees no overflow and arbitrary precision
    /// otherwise.
    fn number_event(&self) -> Result<Event> {
        let literal = core::str::from_utf8(&self.append).map_err(|_| Error::Lexical {
            location: self.prev_location(),
            message: "malformed number literal".into(),
        })?;
        let malformed = || Error::Lexical {
            location: self.prev_location(),
            message: "malformed number literal".into(),
        };
        if self.is_int {
            let digits = literal.len() - usize::from(literal.starts_with('-'));
            if digits < 19 {
                return Ok(Event::Int(literal.parse().map_err(|_| malformed())?));
            }
            let big: BigInt = literal.parse().map_err(|_| malformed())?;
            return Ok(match i64::try_from(&big) {
                Ok(v) => Event::Int(v),
                Err(_) => Event::BigInt(big),
            });
        }
        Ok(Event::Decimal(literal.parse().map_err(|_| malformed())?))
    }

    fn read_escape(&mut self) -> Result<()> {
        let b = self.read()?;
        match b {
            b'b' => self.append.push(0x08),
            b'f' => self.append.push(0x0C),
            b'n' => self.append.push(b'\n'),
            b'r' => self.append.push(b'\r'),
            b't' => self.append.push(b'\t'),
            b'\\' | b'/' | b'"' => self.append.push(b),
            b'u' => {
                let unit = self.read_hex4()?;
                let ch = if (0xD800..=0xDBFF).contains(&unit) {
                    // High surrogate: a `\uXXXX` low surrogate must follow.
                    self.read_low_surrogate(unit)?
                } else {
                    char::from_u32(u32::from(unit)).ok_or_else(|| Error::Lexical {
                        location: self.prev_location(),
                        message: format!("unpaired surrogate escape \\u{unit:04x}"),
                    })?
                };
                let mut buf = [0u8; 4];
                self.append.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            _ => {
                return Err(Error::Lexical {
                    location: self.prev_location(),
                    message: format!("unknown escape sequence '\\{}'", display_byte(b)),
                });
            }
        }
        Ok(())
    }

    fn read_hex4(&mut self) -> Result<u16> {
        let mut value: u16 = 0;
        for _ in 0..4 {
            let b = self.read()?;
            let hex = match b {
                b'0'..=b'9' => b - b'0',
                b'A'..=b'F' => b - b'A' + 10,
                b'a'..=b'f' => b - b'a' + 10,
                _ => return Err(self.unexpected_lexical(b)),
            };
            value = (value << 4) | u16::from(hex);
        }
        Ok(value)
    }

    fn read_low_surrogate(&mut self, high: u16) -> Result<char> {
        let err = |parser: &Self| Error::Lexical {
            location: parser.prev_location(),
            message: format!("unpaired surrogate escape \\u{high:04x}"),
        };
        let b = self.read()?;
        if b != b'\\' {
            return Err(err(self));
        }
        let b = self.read()?;
        if b != b'u' {
            return Err(err(self));
        }
        let low = self.read_hex4()?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return Err(err(self));
        }
        let code = 0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
        char::from_u32(code).ok_or_else(|| err(self))
    }

    /// Scans a string body into the append buffer; the opening quote has
    /// already been consumed and its location saved.
    fn read_string(&mut self) -> Result<()> {
        self.append.clear();
        loop {
            let b = self.read()?;
            match b {
                b'"' => return Ok(()),
                b'\\' => self.read_escape()?,
                // JSON forbids raw control characters in strings.
                0x00..=0x1F => return Err(self.unexpected_lexical(b)),
                _ => self.append.push(b),
            }
        }
    }

    fn take_string(&mut self) -> Result<String> {
        let bytes = core::mem::take(&mut self.append);
        String::from_utf8(bytes).map_err(|_| Error::Lexical {
            location: self.saved,
            message: "invalid UTF-8 in string".into(),
        })
    }

    fn save_location(&mut self) {
        self.saved = Location {
            line: self.line,
            column: self.column,
            offset: self.offset,
        };
    }

    // ------------------------------------------------------- token expecting

    fn expect_root(&mut self) -> Result<Event> {
        loop {
            let b = self.read()?;
            match b {
                b'[' => {
                    self.push_frame(Container::Array);
                    return Ok(Event::StartArray);
                }
                b'{' => {
                    self.push_frame(Container::Object);
                    return Ok(Event::StartObject);
                }
                b' ' | b'\t' | b'\r' => {}
                b'\n' => self.newline(),
                _ => self.scan_unexpected(b)?,
            }
        }
    }

    /// Expects `,` (returns `None`, the caller parses the next key) or `}`.
    fn expect_comma_object(&mut self) -> Result<Option<Event>> {
        loop {
            let b = self.read()?;
            match b {
                b',' => return Ok(None),
                b'}' => return self.pop_frame(Container::Object, b'}').map(Some),
                b' ' | b'\t' | b'\r' => {}
                b'\n' => self.newline(),
                _ => self.scan_unexpected(b)?,
            }
        }
    }

    fn expect_comma_array(&mut self) -> Result<Option<Event>> {
        loop {
            let b = self.read()?;
            match b {
                b',' => return Ok(None),
                b']' => return self.pop_frame(Container::Array, b']').map(Some),
                b' ' | b'\t' | b'\r' => {}
                b'\n' => self.newline(),
                _ => self.scan_unexpected(b)?,
            }
        }
    }

    fn expect_colon(&mut self) -> Result<()> {
        loop {
            let b = self.read()?;
            match b {
                b':' => return Ok(()),
                b' ' | b'\t' | b'\r' => {}
                b'\n' => self.newline(),
                _ => self.scan_unexpected(b)?,
            }
        }
    }

    fn expect_key(&mut self) -> Result<Event> {
        loop {
            let b = self.read()?;
            match b {
                b'"' => {
                    self.save_location();
                    self.read_string()?;
                    self.last_token = LastToken::Field;
                    return Ok(Event::Key(self.take_string()?));
                }
                b'}' => return self.pop_frame(Container::Object, b'}'),
                b' ' | b'\t' | b'\r' => {}
                b'\n' => self.newline(),
                _ => self.scan_unexpected(b)?,
            }
        }
    }

    fn expect_value(&mut self) -> Result<Event> {
        loop {
            let b = self.read()?;
            match b {
                b' ' | b'\t' | b'\r' => {}
                b'\n' => self.newline(),
                b'"' => {
                    self.save_location();
                    self.read_string()?;
                    self.last_token = LastToken::Value;
                    return Ok(Event::Text(self.take_string()?));
                }
                b'-' => {
                    self.append.clear();
                    self.append.push(b);
                    let digit = self.read()?;
                    if !digit.is_ascii_digit() {
                        return Err(self.unexpected_lexical(digit));
                    }
                    self.read_number(digit)?;
                    self.last_token = LastToken::Value;
                    return self.number_event();
                }
                b'0'..=b'9' => {
                    self.append.clear();
                    self.read_number(b)?;
                    self.last_token = LastToken::Value;
                    return self.number_event();
                }
                b'[' => {
                    self.push_frame(Container::Array);
                    return Ok(Event::StartArray);
                }
                // Closes an empty array (and, as in the original grammar,
                // tolerates a trailing comma).
                b']' => return self.pop_frame(Container::Array, b']'),
                b'{' => {
                    self.push_frame(Container::Object);
                    return Ok(Event::StartObject);
                }
                b't' => {
                    self.expect_literal(b"rue")?;
                    self.last_token = LastToken::Value;
                    return Ok(Event::Bool(true));
                }
                b'f' => {
                    self.expect_literal(b"alse")?;
                    self.last_token = LastToken::Value;
                    return Ok(Event::Bool(false));
                }
                b'n' => {
                    self.expect_literal(b"ull")?;
                    self.last_token = LastToken::Value;
                    return Ok(Event::Null);
                }
                _ => self.scan_unexpected(b)?,
            }
        }
    }

    fn advance(&mut self) -> Result<Event> {
        match self.state {
            State::Initial => self.expect_root(),
            State::InObject => {
                if self.last_token == LastToken::Field {
                    self.expect_colon()?;
                    return self.expect_value();
                }
                if self.last_token == LastToken::Value {
                    if let Some(end) = self.expect_comma_object()? {
                        return Ok(end);
                    }
                }
                self.expect_key()
            }
            State::InArray => {
                if self.last_token == LastToken::Value {
                    if let Some(end) = self.expect_comma_array()? {
                        return Ok(end);
                    }
                }
                self.expect_value()
            }
            State::End => Err(Error::Usage("next_event")),
        }
    }
}

impl<R: Read> EventSource for JsonParser<R> {
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

    /// Location of the first byte of the current event: brackets for
    /// container events, the opening quote for strings and keys, the first
    /// character for number and literal tokens.
    fn location(&self) -> Location {
        let diff = match self.event {
            Some(
                Event::StartObject | Event::EndObject | Event::StartArray | Event::EndArray,
            ) => 1,
            Some(Event::Int(_) | Event::BigInt(_) | Event::Decimal(_)) => {
                self.append.len() as u64
            }
            Some(Event::Key(_) | Event::Text(_)) => {
                return Location {
                    line: self.saved.line,
                    column: self.saved.column - 1,
                    offset: self.saved.offset - 1,
                };
            }
            Some(Event::Bool(true) | Event::Null) => 4,
            Some(Event::Bool(false)) => 5,
            Some(Event::Binary(_)) | None => 0,
        };
        Location {
            line: self.line,
            column: self.column - diff,
            offset: self.offset - diff,
        }
    }
}

fn display_byte(b: u8) -> String {
    if (0x20..0x7F).contains(&b) {
        char::from(b).to_string()
    } else {
        format!("\\u{:04x}", u32::from(b))
    }
}
