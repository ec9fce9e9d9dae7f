//! Character set sniffing and byte-order-mark writing.
//!
//! RFC 4627 does not require a BOM; the encoding of a JSON stream can be
//! deduced from where the zero bytes fall in the first characters, since
//! the first two characters are always ASCII. [`guess_charset`] applies
//! that pattern without consuming anything: the inspected bytes are pushed
//! back so the caller reads the stream from its true beginning.

use std::io::Read;

use crate::error::{Error, Result};

/// The character encodings a JSON stream can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl Charset {
    /// The byte-order mark for this encoding.
    #[must_use]
    pub fn bom(self) -> &'static [u8] {
        match self {
            Charset::Utf8 => &[0xEF, 0xBB, 0xBF],
            Charset::Utf16Le => &[0xFF, 0xFE],
            Charset::Utf16Be => &[0xFE, 0xFF],
            Charset::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
            Charset::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
        }
    }
}

/// Writes the BOM for `charset` and returns the number of bytes written.
///
/// # Errors
///
/// Propagates the writer's failure.
pub fn write_bom<W: std::io::Write>(writer: &mut W, charset: Charset) -> Result<usize> {
    let bytes = charset.bom();
    writer
        .write_all(bytes)
        .map_err(|e| Error::io("writing BOM", e))?;
    Ok(bytes.len())
}

/// A reader with a few bytes of pushback, produced by [`guess_charset`].
pub struct Pushback<R: Read> {
    inner: R,
    /// Pushed-back bytes in reading order.
    buf: Vec<u8>,
    pos: usize,
}

impl<R: Read> Pushback<R> {
    fn new(inner: R, buf: Vec<u8>) -> Self {
        Pushback { inner, buf, pos: 0 }
    }
}

impl<R: Read> Read for Pushback<R> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        if self.pos < self.buf.len() {
            let n = (self.buf.len() - self.pos).min(out.len());
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            return Ok(n);
        }
        self.inner.read(out)
    }
}

/// Sniffs the character set of a JSON stream from its first bytes.
///
/// Returns the detected charset and a reader that replays every inspected
/// byte before the rest of the stream.
///
/// # Errors
///
/// Fails when the stream is shorter than two bytes, which no JSON document
/// can be.
pub fn guess_charset<R: Read>(mut reader: R) -> Result<(Charset, Pushback<R>)> {
    let b1 = read_byte(&mut reader)?;
    let b2 = read_byte(&mut reader)?;

    if b1 == 0 {
        let charset = if b2 == 0 {
            Charset::Utf32Be
        } else {
            Charset::Utf16Be
        };
        return Ok((charset, Pushback::new(reader, vec![b1, b2])));
    }
    if b2 == 0 {
        let b3 = read_byte(&mut reader)?;
        let charset = if b3 == 0 {
            Charset::Utf32Le
        } else {
            Charset::Utf16Le
        };
        return Ok((charset, Pushback::new(reader, vec![b1, b2, b3])));
    }
    Ok((Charset::Utf8, Pushback::new(reader, vec![b1, b2])))
}

fn read_byte<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::io(
                "sniffing character set",
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "a JSON stream is at least two bytes",
                ),
            )
        } else {
            Error::io("sniffing character set", e)
        }
    })?;
    Ok(buf[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guess(bytes: &[u8]) -> (Charset, Vec<u8>) {
        let (charset, mut reader) = guess_charset(bytes).unwrap();
        let mut replay = Vec::new();
        reader.read_to_end(&mut replay).unwrap();
        (charset, replay)
    }

    #[test]
    fn detects_by_zero_byte_pattern() {
        assert_eq!(guess(b"{}").0, Charset::Utf8);
        assert_eq!(guess(&[0x7B, 0x00, 0x7D, 0x00]).0, Charset::Utf16Le);
        assert_eq!(guess(&[0x00, 0x7B, 0x00, 0x7D]).0, Charset::Utf16Be);
        assert_eq!(
            guess(&[0x7B, 0x00, 0x00, 0x00, 0x7D, 0x00, 0x00, 0x00]).0,
            Charset::Utf32Le
        );
        assert_eq!(
            guess(&[0x00, 0x00, 0x00, 0x7B, 0x00, 0x00, 0x00, 0x7D]).0,
            Charset::Utf32Be
        );
    }

    #[test]
    fn inspected_bytes_are_replayed() {
        let input = b"{\"a\":1}";
        let (_, replay) = {
            let (charset, mut reader) = guess_charset(&input[..]).unwrap();
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes).unwrap();
            (charset, bytes)
        };
        assert_eq!(replay, input);
    }

    #[test]
    fn too_short_input_fails() {
        assert!(matches!(guess_charset(&b"{"[..]), Err(Error::Io { .. })));
        assert!(matches!(guess_charset(&b""[..]), Err(Error::Io { .. })));
    }

    #[test]
    fn bom_bytes() {
        let mut out = Vec::new();
        assert_eq!(write_bom(&mut out, Charset::Utf8).unwrap(), 3);
        assert_eq!(out, [0xEF, 0xBB, 0xBF]);
        assert_eq!(Charset::Utf16Be.bom(), &[0xFE, 0xFF]);
        assert_eq!(Charset::Utf32Le.bom().len(), 4);
    }
}
