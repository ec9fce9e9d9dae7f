//! BSON element type tags.

pub(crate) const DOUBLE: u8 = 0x01;
pub(crate) const STRING: u8 = 0x02;
pub(crate) const DOCUMENT: u8 = 0x03;
pub(crate) const ARRAY: u8 = 0x04;
pub(crate) const BINARY: u8 = 0x05;
pub(crate) const BOOL: u8 = 0x08;
pub(crate) const NULL: u8 = 0x0A;
pub(crate) const INT32: u8 = 0x10;
pub(crate) const INT64: u8 = 0x12;

/// Generic binary subtype.
pub(crate) const SUBTYPE_GENERIC: u8 = 0x00;
