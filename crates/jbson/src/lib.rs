//! Pull-style streaming JSON and BSON codec.
//!
//! Both formats share one event vocabulary: a parser ([`EventSource`])
//! produces [`Event`]s one at a time, a generator ([`EventSink`]) consumes
//! them, and [`convert`] wires any source to any sink without building a
//! tree. The BSON encoder writes zero placeholder container lengths and
//! [`fix_lengths`] patches them in a second pass over the finished file.
//!
//! ```
//! use jbson::{convert, JsonGenerator, JsonGeneratorOptions, JsonParser, JsonParserOptions};
//!
//! let json = br#"{ "greeting": "hello", "counts": [1, 2, 3] }"#;
//! let mut parser = JsonParser::new(&json[..], JsonParserOptions::default());
//! let mut out = Vec::new();
//! let mut generator = JsonGenerator::new(&mut out, JsonGeneratorOptions::default());
//! convert(&mut parser, &mut generator).unwrap();
//! assert_eq!(out, br#"{"greeting":"hello","counts":[1,2,3]}"#);
//! ```

mod bom;
mod bson;
mod convert;
mod error;
mod event;
mod json;
mod numbers;
mod sink;
mod source;
mod value;


pub use bom::{Charset, Pushback, guess_charset, write_bom};
pub use bson::{BsonGenerator, BsonParser, BsonParserOptions, fix_lengths};
pub use convert::convert;
pub use error::{Error, Result};
pub use event::{Container, Event, Location};
pub use json::{JsonGenerator, JsonGeneratorOptions, JsonParser, JsonParserOptions};
pub use numbers::{Decimal, ParseDecimalError};
pub use sink::EventSink;
pub use source::EventSource;
pub use value::Value;
