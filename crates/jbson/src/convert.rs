//! Generic event forwarding between any source and any sink.

use crate::error::Result;
use crate::event::Event;
use crate::sink::EventSink;
use crate::source::EventSource;

/// Drains `source` and replays every event against `sink`, then closes the
/// sink.
///
/// No value tree is built: the driver carries one event at a time, so a
/// document larger than memory converts fine. Scalars keep their exact
/// representation through [`Event`]; the sink decides how to serialize each
/// one, including binary payloads, which pass through untouched when the
/// destination format has a binary scalar and get re-encoded otherwise.
///
/// # Examples
///
/// ```
/// use jbson::{convert, JsonGenerator, JsonGeneratorOptions, JsonParser, JsonParserOptions};
///
/// let mut parser = JsonParser::new(&b"[1, {\"a\": null}]"[..], JsonParserOptions::default());
/// let mut out = Vec::new();
/// let mut generator = JsonGenerator::new(&mut out, JsonGeneratorOptions::default());
/// convert(&mut parser, &mut generator).unwrap();
/// assert_eq!(out, br#"[1,{"a":null}]"#);
/// ```
///
/// # Errors
///
/// The first parse or write failure aborts the conversion.
pub fn convert<S, D>(source: &mut S, sink: &mut D) -> Result<()>
where
    S: EventSource + ?Sized,
    D: EventSink + ?Sized,
{
    while source.has_next() {
        let event = source.next_event()?;
        log::trace!("event: {event:?}");
        sink.write_event(event)?;
    }
    sink.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bson::{BsonGenerator, BsonParser, BsonParserOptions};
    use crate::json::{JsonGenerator, JsonGeneratorOptions, JsonParser, JsonParserOptions};

    fn json_to_json(input: &str) -> String {
        let mut parser = JsonParser::new(input.as_bytes(), JsonParserOptions::default());
        let mut out = Vec::new();
        let mut generator = JsonGenerator::new(&mut out, JsonGeneratorOptions::default());
        convert(&mut parser, &mut generator).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn json_round_trip_is_compact() {
        assert_eq!(
            json_to_json("{ \"a\" : [ 1, 2.50, true, null, \"x\" ] }"),
            "{\"a\":[1,2.50,true,null,\"x\"]}"
        );
    }

    #[test]
    fn cross_format_equivalence() {
        let input = r#"{"a": [1, -2, 3.14, true, null, "text"], "b": {"c": 1e2}}"#;
        let direct = json_to_json(input);

        // JSON -> BSON -> JSON must match the direct JSON -> JSON output.
        let mut parser = JsonParser::new(input.as_bytes(), JsonParserOptions::default());
        let mut bson = Vec::new();
        let mut generator = BsonGenerator::new(&mut bson);
        convert(&mut parser, &mut generator).unwrap();

        let mut parser = BsonParser::new(&bson[..], BsonParserOptions::default());
        let mut out = Vec::new();
        let mut generator = JsonGenerator::new(&mut out, JsonGeneratorOptions::default());
        convert(&mut parser, &mut generator).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), direct);
    }

    #[test]
    fn binary_survives_bson_to_bson() {
        let payload = vec![0u8, 1, 2, 254, 255];
        let mut bson = Vec::new();
        let mut generator = BsonGenerator::new(&mut bson);
        generator.start_object().unwrap();
        generator.write_key("bin").unwrap();
        generator.write_binary(&payload).unwrap();
        generator.end_object().unwrap();
        generator.close().unwrap();

        let mut parser = BsonParser::new(&bson[..], BsonParserOptions::default());
        let mut copied = Vec::new();
        let mut generator = BsonGenerator::new(&mut copied);
        convert(&mut parser, &mut generator).unwrap();

        // Still a binary element, bytes untouched.
        assert_eq!(copied[4], 0x05);
        assert_eq!(copied, bson);
    }

    #[test]
    fn key_order_is_preserved() {
        assert_eq!(
            json_to_json(r#"{"z": 1, "a": 2, "m": 3}"#),
            r#"{"z":1,"a":2,"m":3}"#
        );
    }

    #[test]
    fn works_through_trait_objects() {
        let mut parser = JsonParser::new(&b"[true]"[..], JsonParserOptions::default());
        let mut out = Vec::new();
        let mut generator = JsonGenerator::new(&mut out, JsonGeneratorOptions::default());
        let source: &mut dyn EventSource = &mut parser;
        let sink: &mut dyn EventSink = &mut generator;
        convert(source, sink).unwrap();
        assert_eq!(out, b"[true]");
    }
}
