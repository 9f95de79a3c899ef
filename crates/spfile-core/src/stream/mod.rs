//! Typed sequential reading of one table's bytes.
//!
//! [`StreamReader`] is a forward-only cursor over an inflated table. It
//! exposes one method per primitive type (delegating to [`datatype`]) and the
//! entry points for nested tables and block lists. There is no seeking: every
//! read advances the cursor.

pub mod datatype;

use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, Result};
use crate::model::Duration;
use crate::table::{
    self, BlockKind, BlockReader, CommentaryReader, DayTypeAssignmentReader, DayTypeReader, MapRow,
    PredecessorReader, ResourceAssignmentReader, ResourceReader, TableKind, TableReader,
    TaskReader, TimeRangeReader, UnknownTableReader, UserFieldReader,
};
use chrono::{NaiveDateTime, NaiveTime};
use std::io::Read;
use uuid::Uuid;

/// Row and buffer layout family, derived once from the file's major version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutVersion {
    /// Major version 5 and earlier
    Legacy,
    /// Major version 6 and later
    Current,
}

impl LayoutVersion {
    /// Chooses the layout family for a major version
    pub fn from_major(major_version: u32) -> Self {
        if major_version > 5 {
            LayoutVersion::Current
        } else {
            LayoutVersion::Legacy
        }
    }

    /// Size of the opaque block preceding each row UUID
    pub fn row_preamble_size(self) -> usize {
        match self {
            LayoutVersion::Legacy => 16,
            LayoutVersion::Current => 8,
        }
    }

    /// Size of the sub-header at the start of each inflated table
    pub fn table_header_size(self) -> usize {
        match self {
            LayoutVersion::Legacy => 0,
            LayoutVersion::Current => 24,
        }
    }
}

/// Default limit on how deeply tables may nest inside one another
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 128;

/// Forward-only typed cursor over one table's data
pub struct StreamReader<'s, R> {
    layout: LayoutVersion,
    stream: R,
    sink: &'s mut dyn DiagnosticSink,
    depth: usize,
    max_depth: usize,
}

impl<'s, R: Read> StreamReader<'s, R> {
    /// Wraps a byte stream
    pub fn new(major_version: u32, stream: R, sink: &'s mut dyn DiagnosticSink) -> Self {
        Self {
            layout: LayoutVersion::from_major(major_version),
            stream,
            sink,
            depth: 0,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    /// Sets how many tables may be open at once before decoding fails
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Layout family for the file's major version
    pub fn layout(&self) -> LayoutVersion {
        self.layout
    }

    /// Diagnostic sink receiving decoded rows
    pub fn sink(&mut self) -> &mut dyn DiagnosticSink {
        &mut *self.sink
    }

    /// Consumes the reader, returning the underlying stream
    pub fn into_inner(self) -> R {
        self.stream
    }

    /// Read a single byte
    pub fn read_byte(&mut self) -> Result<u8> {
        datatype::get_byte(&mut self.stream)
    }

    /// Read a boolean
    pub fn read_boolean(&mut self) -> Result<bool> {
        datatype::get_boolean(&mut self.stream)
    }

    /// Read a fixed number of raw bytes
    pub fn read_bytes(&mut self, size: usize) -> Result<Vec<u8>> {
        datatype::get_bytes(&mut self.stream, size)
    }

    /// Read a UUID
    pub fn read_uuid(&mut self) -> Result<Uuid> {
        datatype::get_uuid(&mut self.stream)
    }

    /// Read a string
    pub fn read_string(&mut self) -> Result<Option<String>> {
        datatype::get_string(&mut self.stream)
    }

    /// Read a date
    pub fn read_date(&mut self) -> Result<Option<NaiveDateTime>> {
        datatype::get_date(&mut self.stream)
    }

    /// Read a time of day
    pub fn read_time(&mut self) -> Result<Option<NaiveTime>> {
        datatype::get_time(&mut self.stream)
    }

    /// Read a duration
    pub fn read_duration(&mut self) -> Result<Duration> {
        datatype::get_duration(&mut self.stream)
    }

    /// Read a 32-bit integer
    pub fn read_int(&mut self) -> Result<i32> {
        datatype::get_int(&mut self.stream)
    }

    /// Read a 32-bit magic number
    pub fn read_magic(&mut self) -> Result<u32> {
        datatype::get_magic(&mut self.stream)
    }

    /// Read a double
    pub fn read_double(&mut self) -> Result<f64> {
        datatype::get_double(&mut self.stream)
    }

    /// Read a nested table with a fresh reader of type `T`
    pub fn read_table<T: TableReader + Default>(&mut self) -> Result<Vec<MapRow>> {
        self.read_table_with(&mut T::default())
    }

    /// Read a table using an existing reader instance, which keeps any
    /// post-trailer state for the caller to inspect
    pub fn read_table_with<T: TableReader>(&mut self, reader: &mut T) -> Result<Vec<MapRow>> {
        if self.depth >= self.max_depth {
            return Err(Error::NestingTooDeep {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        let rows = table::read_table(self, reader);
        self.depth -= 1;
        rows
    }

    /// Read a nested table preceded by a presence flag; absent tables read
    /// as no rows
    pub fn read_table_conditional<T: TableReader + Default>(&mut self) -> Result<Vec<MapRow>> {
        if self.read_boolean()? {
            self.read_table::<T>()
        } else {
            Ok(Vec::new())
        }
    }

    /// Read a framed table whose rows are undocumented fixed-size blobs
    pub fn read_unknown_table(&mut self, row_size: usize, row_magic: u32) -> Result<Vec<MapRow>> {
        self.read_table_with(&mut UnknownTableReader::new(row_size, row_magic))
    }

    /// Read a count-prefixed list of blocks with a fresh reader of type `T`
    pub fn read_blocks<T: BlockReader + Default>(&mut self) -> Result<Vec<MapRow>> {
        table::read_blocks(self, &T::default())
    }

    /// Read a nested table of the given kind
    pub fn read_nested(&mut self, kind: TableKind) -> Result<Vec<MapRow>> {
        match kind {
            TableKind::DayType => self.read_table::<DayTypeReader>(),
            TableKind::DayTypeAssignment => self.read_table::<DayTypeAssignmentReader>(),
            TableKind::Resource => self.read_table::<ResourceReader>(),
            TableKind::UserField => self.read_table::<UserFieldReader>(),
            TableKind::Commentary => self.read_table::<CommentaryReader>(),
            TableKind::Predecessor => self.read_table::<PredecessorReader>(),
            TableKind::ResourceAssignment => self.read_table::<ResourceAssignmentReader>(),
            TableKind::Task => self.read_table::<TaskReader>(),
        }
    }

    /// Read a flag-guarded nested table of the given kind
    pub fn read_nested_conditional(&mut self, kind: TableKind) -> Result<Vec<MapRow>> {
        if self.read_boolean()? {
            self.read_nested(kind)
        } else {
            Ok(Vec::new())
        }
    }

    /// Read a block list of the given kind
    pub fn read_nested_blocks(&mut self, kind: BlockKind) -> Result<Vec<MapRow>> {
        match kind {
            BlockKind::TimeRange => self.read_blocks::<TimeRangeReader>(),
        }
    }
}
