//! Binary BSON: decoder, encoder and the length-fixing pass.
//!
//! Containers in this format carry an `int32` byte length that precedes the
//! content, which a forward-only encoder cannot know yet. The encoder
//! therefore writes zero placeholders and [`fix_lengths`] patches them in a
//! second pass over the finished file. The decoder in turn never trusts
//! declared lengths and finds container ends structurally, so it can read
//! both fixed and not-yet-fixed files.

mod constants;
mod fix;
mod generator;
mod parser;

pub use fix::fix_lengths;
pub use generator::BsonGenerator;
pub use parser::{BsonParser, BsonParserOptions};
