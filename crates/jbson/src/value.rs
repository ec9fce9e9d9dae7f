//! In-memory value tree, for callers that want a sub-document rather than
//! an event stream.

use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::error::{Error, Result};
use crate::event::Event;
use crate::numbers::Decimal;
use crate::sink::EventSink;
use crate::source::EventSource;

/// A fully materialized JSON-like value.
///
/// Objects preserve member order, matching the order-preserving guarantee
/// of the event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Decimal(Decimal),
    Text(String),
    Binary(Vec<u8>),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Materializes the value the source is currently positioned on.
    ///
    /// For a scalar event this returns that scalar. For a container start
    /// event the source is drained up to and including the matching end,
    /// leaving it positioned to continue with whatever follows; the rest of
    /// the document stays streamed.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Usage`] when the current event is a key or a
    /// container end, and propagates parse errors from the source.
    pub fn from_source<S: EventSource + ?Sized>(source: &mut S) -> Result<Self> {
        let event = source.event().ok_or(Error::Usage("from_source"))?;
        match event {
            Event::StartArray => {
                let mut values = Vec::new();
                fill_array(source, &mut values)?;
                Ok(Value::Array(values))
            }
            Event::StartObject => {
                let mut members = IndexMap::new();
                fill_object(source, &mut members)?;
                Ok(Value::Object(members))
            }
            Event::Key(_) | Event::EndArray | Event::EndObject => {
                Err(Error::Usage("from_source"))
            }
            other => Ok(scalar(other)),
        }
    }

    /// Replays the value against a sink as events. The sink is not closed.
    ///
    /// # Errors
    ///
    /// Propagates the sink's write errors.
    pub fn write_to<D: EventSink + ?Sized>(&self, sink: &mut D) -> Result<()> {
        match self {
            Value::Null => sink.write_null(),
            Value::Bool(b) => sink.write_bool(*b),
            Value::Int(v) => sink.write_int(*v),
            Value::BigInt(v) => sink.write_big_int(v),
            Value::Decimal(d) => sink.write_decimal(d),
            Value::Text(s) => sink.write_text(s),
            Value::Binary(b) => sink.write_binary(b),
            Value::Array(values) => {
                sink.start_array()?;
                for value in values {
                    value.write_to(sink)?;
                }
                sink.end_array()
            }
            Value::Object(members) => {
                sink.start_object()?;
                for (name, value) in members {
                    sink.write_key(name)?;
                    value.write_to(sink)?;
                }
                sink.end_object()
            }
        }
    }
}

fn scalar(event: &Event) -> Value {
    match event {
        Event::Null => Value::Null,
        Event::Bool(b) => Value::Bool(*b),
        Event::Int(v) => Value::Int(*v),
        Event::BigInt(v) => Value::BigInt(v.clone()),
        Event::Decimal(d) => Value::Decimal(d.clone()),
        Event::Text(s) => Value::Text(s.clone()),
        Event::Binary(b) => Value::Binary(b.clone()),
        // Callers only reach here for value events.
        _ => Value::Null,
    }
}

fn fill_array<S: EventSource + ?Sized>(source: &mut S, values: &mut Vec<Value>) -> Result<()> {
    loop {
        let event = source.next_event()?;
        match event {
            Event::EndArray => return Ok(()),
            Event::StartArray => {
                let mut nested = Vec::new();
                fill_array(source, &mut nested)?;
                values.push(Value::Array(nested));
            }
            Event::StartObject => {
                let mut nested = IndexMap::new();
                fill_object(source, &mut nested)?;
                values.push(Value::Object(nested));
            }
            Event::Key(_) | Event::EndObject => return Err(Error::Usage("from_source")),
            other => values.push(scalar(other)),
        }
    }
}

fn fill_object<S: EventSource + ?Sized>(
    source: &mut S,
    members: &mut IndexMap<String, Value>,
) -> Result<()> {
    loop {
        let name = {
            let event = source.next_event()?;
            match event {
                Event::EndObject => return Ok(()),
                Event::Key(name) => name.clone(),
                _ => return Err(Error::Usage("from_source")),
            }
        };
        let value = {
            let event = source.next_event()?;
            match event {
                Event::StartArray => {
                    let mut nested = Vec::new();
                    fill_array(source, &mut nested)?;
                    Value::Array(nested)
                }
                Event::StartObject => {
                    let mut nested = IndexMap::new();
                    fill_object(source, &mut nested)?;
                    Value::Object(nested)
                }
                Event::Key(_) | Event::EndArray | Event::EndObject => {
                    return Err(Error::Usage("from_source"));
                }
                other => scalar(other),
            }
        };
        members.insert(name, value);
    }
}
