//! Second-pass repair of placeholder container lengths.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use crate::bson::parser::{BsonParser, BsonParserOptions};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::source::EventSource;

/// One container's length field and the value it should hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    /// Offset of the 4-byte length field.
    offset: u64,
    /// Total container size, length field and trailing NUL included.
    size: u32,
}

/// Patches every container length field of a BSON file in place.
///
/// The file must be structurally complete; its length fields may hold
/// anything (the encoder leaves zero placeholders). The file is first
/// re-parsed sequentially to recover each container's true byte span, then
/// each 4-byte length field is overwritten in ascending offset order.
/// Running the pass on an already-fixed file rewrites the same values, so
/// the pass is idempotent.
///
/// # Errors
///
/// Fails on malformed structure or I/O failure. An I/O failure during the
/// patch loop leaves the file partially patched; regenerate it rather than
/// retrying.
pub fn fix_lengths(path: &Path) -> Result<()> {
    let spans = collect_spans(path)?;
    log::debug!("patching {} container lengths in {}", spans.len(), path.display());

    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| Error::io(format!("opening {} for patching", path.display()), e))?;
    for span in &spans {
        file.seek(SeekFrom::Start(span.offset))
            .map_err(|e| Error::io("seeking to length field", e))?;
        file.write_all(&span.size.to_le_bytes())
            .map_err(|e| Error::io("patching length field", e))?;
    }
    file.flush()
        .map_err(|e| Error::io("flushing patched file", e))
}

/// Replays the parser over the file and pairs every container start with
/// its end. Start events are located at the length field, end events at the
/// trailing NUL, so `size = end + 1 - start`.
fn collect_spans(path: &Path) -> Result<Vec<Span>> {
    let file = File::open(path)
        .map_err(|e| Error::io(format!("opening {}", path.display()), e))?;
    let mut parser = BsonParser::new(BufReader::new(file), BsonParserOptions::default());

    let mut starts: Vec<u64> = Vec::new();
    let mut spans: Vec<Span> = Vec::new();
    while parser.has_next() {
        let event = parser.next_event()?;
        let opens = matches!(event, Event::StartObject | Event::StartArray);
        let closes = matches!(event, Event::EndObject | Event::EndArray);
        if opens {
            starts.push(parser.location().offset);
        } else if closes {
            let end = parser.location().offset + 1;
            let start = starts.pop().ok_or(Error::Usage("fix_lengths"))?;
            let size = u32::try_from(end - start).map_err(|_| Error::Decode {
                offset: start,
                message: "container exceeds the 32-bit length limit".into(),
            })?;
            spans.push(Span {
                offset: start,
                size,
            });
        }
    }

    // Nested spans are discovered innermost-first; patch front to back.
    spans.sort_by_key(|span| span.offset);
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bson::generator::BsonGenerator;
    use crate::sink::EventSink;
    use std::path::PathBuf;

    struct TempFile(PathBuf);

    impl TempFile {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "jbson-fix-{}-{name}.bson",
                std::process::id()
            ));
            TempFile(path)
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn generate() -> Vec<u8> {
        let mut out = Vec::new();
        let mut g = BsonGenerator::new(&mut out);
        g.start_object().unwrap();
        g.write_key("a").unwrap();
        g.write_int(1).unwrap();
        g.write_key("b").unwrap();
        g.start_array().unwrap();
        g.write_text("x").unwrap();
        g.start_object().unwrap();
        g.end_object().unwrap();
        g.end_array().unwrap();
        g.end_object().unwrap();
        g.close().unwrap();
        out
    }

    #[test]
    fn patches_all_containers() {
        let tmp = TempFile::new("patch");
        std::fs::write(&tmp.0, generate()).unwrap();
        fix_lengths(&tmp.0).unwrap();
        let fixed = std::fs::read(&tmp.0).unwrap();

        // Root length covers the whole file.
        let root = u32::from_le_bytes(fixed[0..4].try_into().unwrap());
        assert_eq!(root as usize, fixed.len());

        // Every length field is non-zero and the empty nested object got the
        // minimum size of 5.
        let spans = collect_spans(&tmp.0).unwrap();
        assert_eq!(spans.len(), 3);
        for span in &spans {
            let at = span.offset as usize;
            let declared = u32::from_le_bytes(fixed[at..at + 4].try_into().unwrap());
            assert_eq!(declared, span.size);
        }
        assert_eq!(spans.iter().map(|s| s.size).min(), Some(5));
    }

    #[test]
    fn second_run_changes_nothing() {
        let tmp = TempFile::new("idempotent");
        std::fs::write(&tmp.0, generate()).unwrap();
        fix_lengths(&tmp.0).unwrap();
        let once = std::fs::read(&tmp.0).unwrap();
        fix_lengths(&tmp.0).unwrap();
        let twice = std::fs::read(&tmp.0).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("jbson-fix-does-not-exist.bson");
        assert!(matches!(fix_lengths(&path), Err(Error::Io { .. })));
    }
}
