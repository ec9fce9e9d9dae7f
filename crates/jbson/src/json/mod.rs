//! Textual JSON: pull parser and event-driven generator.

mod generator;
mod parser;

pub use generator::{JsonGenerator, JsonGeneratorOptions};
pub use parser::{JsonParser, JsonParserOptions};
