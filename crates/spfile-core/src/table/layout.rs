//! Declarative row layouts.
//!
//! A layout is a static slice of [`Field`]s read in order. Version-dependent
//! rows express their differences with [`Field::Versioned`], so the choice
//! between layouts is made in exactly one place.

use super::{BlockKind, MapRow, TableKind, Value};
use crate::error::Result;
use crate::stream::{LayoutVersion, StreamReader};
use std::io::Read;

/// One column of a row layout
#[derive(Debug, Clone, Copy)]
pub enum Field {
    /// Fixed-size undocumented bytes
    Bytes(&'static str, usize),
    /// Single-byte flag
    Boolean(&'static str),
    /// 32-bit integer
    Integer(&'static str),
    /// IEEE-754 double
    Double(&'static str),
    /// Tagged, length-prefixed string
    String(&'static str),
    /// Permuted 16-byte UUID
    Uuid(&'static str),
    /// Seconds-based timestamp
    Date(&'static str),
    /// Seconds-based time of day
    Time(&'static str),
    /// Seconds-based duration
    Duration(&'static str),
    /// Nested table
    Table(&'static str, TableKind),
    /// Nested table preceded by a presence flag
    TableConditional(&'static str, TableKind),
    /// Framed table of fixed-size blobs: row size, row magic
    UnknownTable(&'static str, usize, u32),
    /// Count-prefixed block list
    Blocks(&'static str, BlockKind),
    /// Fields present only when the named, already decoded integer is nonzero
    Flagged(&'static str, &'static [Field]),
    /// Fields that differ between the legacy and current layouts
    Versioned {
        /// Fields of files with major version 5 or lower
        legacy: &'static [Field],
        /// Fields of newer files
        current: &'static [Field],
    },
}

/// Decode `fields` in order into `row`
pub fn decode_fields<R: Read>(
    stream: &mut StreamReader<'_, R>,
    fields: &[Field],
    row: &mut MapRow,
) -> Result<()> {
    for field in fields {
        match *field {
            Field::Bytes(name, size) => row.put(name, Value::Bytes(stream.read_bytes(size)?)),
            Field::Boolean(name) => row.put(name, Value::Boolean(stream.read_boolean()?)),
            Field::Integer(name) => row.put(name, Value::Integer(stream.read_int()?)),
            Field::Double(name) => row.put(name, Value::Double(stream.read_double()?)),
            Field::String(name) => row.put(name, Value::String(stream.read_string()?)),
            Field::Uuid(name) => row.put(name, Value::Uuid(stream.read_uuid()?)),
            Field::Date(name) => row.put(name, Value::Date(stream.read_date()?)),
            Field::Time(name) => row.put(name, Value::Time(stream.read_time()?)),
            Field::Duration(name) => row.put(name, Value::Duration(stream.read_duration()?)),
            Field::Table(name, kind) => row.put(name, Value::Rows(stream.read_nested(kind)?)),
            Field::TableConditional(name, kind) => {
                row.put(name, Value::Rows(stream.read_nested_conditional(kind)?))
            }
            Field::UnknownTable(name, size, magic) => {
                row.put(name, Value::Rows(stream.read_unknown_table(size, magic)?))
            }
            Field::Blocks(name, kind) => {
                row.put(name, Value::Rows(stream.read_nested_blocks(kind)?))
            }
            Field::Flagged(flag, nested) => {
                if row.get_integer(flag).unwrap_or(0) != 0 {
                    decode_fields(stream, nested, row)?;
                }
            }
            Field::Versioned { legacy, current } => {
                let nested = match stream.layout() {
                    LayoutVersion::Legacy => legacy,
                    LayoutVersion::Current => current,
                };
                decode_fields(stream, nested, row)?;
            }
        }
    }
    Ok(())
}
