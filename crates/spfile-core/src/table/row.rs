//! Generic decoded rows.

use crate::model::Duration;
use chrono::{NaiveDateTime, NaiveTime};
use std::fmt;
use uuid::Uuid;

/// A single decoded column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean flag
    Boolean(bool),
    /// 32-bit integer
    Integer(i32),
    /// Double-precision number
    Double(f64),
    /// String; `None` when the file stores no text
    String(Option<String>),
    /// UUID
    Uuid(Uuid),
    /// Date and time; `None` when unset
    Date(Option<NaiveDateTime>),
    /// Time of day
    Time(Option<NaiveTime>),
    /// Duration
    Duration(Duration),
    /// Undocumented raw bytes
    Bytes(Vec<u8>),
    /// Rows of a nested table
    Rows(Vec<MapRow>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(Some(v)) => f.write_str(v),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Date(Some(v)) => write!(f, "{v}"),
            Value::Time(Some(v)) => write!(f, "{v}"),
            Value::String(None) | Value::Date(None) | Value::Time(None) => f.write_str("null"),
            Value::Duration(v) => write!(f, "{v}"),
            Value::Bytes(v) => f.write_str(&hex::encode(v)),
            Value::Rows(v) => write!(f, "[{} rows]", v.len()),
        }
    }
}

/// Ordered column name to value record produced for each decoded row.
///
/// Accessors return `None` (or an empty slice for nested rows) when a column
/// is absent or holds a different type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapRow {
    fields: Vec<(&'static str, Value)>,
}

impl MapRow {
    pub(crate) fn put(&mut self, name: &'static str, value: Value) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Raw value of a column
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| value)
    }

    /// String column
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::String(value)) => value.as_deref(),
            _ => None,
        }
    }

    /// Integer column
    pub fn get_integer(&self, name: &str) -> Option<i32> {
        match self.get(name) {
            Some(Value::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    /// Double column
    pub fn get_double(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Double(value)) => Some(*value),
            _ => None,
        }
    }

    /// Boolean column; absent reads as false
    pub fn get_boolean(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Value::Boolean(true)))
    }

    /// UUID column
    pub fn get_uuid(&self, name: &str) -> Option<Uuid> {
        match self.get(name) {
            Some(Value::Uuid(value)) => Some(*value),
            _ => None,
        }
    }

    /// Date column
    pub fn get_date(&self, name: &str) -> Option<NaiveDateTime> {
        match self.get(name) {
            Some(Value::Date(value)) => *value,
            _ => None,
        }
    }

    /// Time column
    pub fn get_time(&self, name: &str) -> Option<NaiveTime> {
        match self.get(name) {
            Some(Value::Time(value)) => *value,
            _ => None,
        }
    }

    /// Duration column
    pub fn get_duration(&self, name: &str) -> Option<Duration> {
        match self.get(name) {
            Some(Value::Duration(value)) => Some(*value),
            _ => None,
        }
    }

    /// Raw byte column
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        match self.get(name) {
            Some(Value::Bytes(value)) => Some(value.as_slice()),
            _ => None,
        }
    }

    /// Nested table rows
    pub fn get_rows(&self, name: &str) -> &[MapRow] {
        match self.get(name) {
            Some(Value::Rows(rows)) => rows.as_slice(),
            _ => &[],
        }
    }

    /// Moves nested table rows out of the row, leaving the column empty
    pub(crate) fn take_rows(&mut self, name: &str) -> Vec<MapRow> {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, Value::Rows(rows))) => std::mem::take(rows),
            _ => Vec::new(),
        }
    }

    /// Columns in decode order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(&'static str, Value)> for MapRow {
    fn from_iter<I: IntoIterator<Item = (&'static str, Value)>>(iter: I) -> Self {
        let mut row = MapRow::default();
        for (name, value) in iter {
            row.put(name, value);
        }
        row
    }
}

impl fmt::Display for MapRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[MapRow ")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str("]")
    }
}
