//! Row framing for SP tables.
//!
//! Every table stream is framed the same way:
//!
//! ```text
//! header magic (0x39AF547A)
//! row count (i32)
//! rows:  row magic, [preamble bytes, UUID], fields...
//! trailer magic (0x6F99E416)
//! [post-trailer data]
//! ```
//!
//! A [`TableReader`] supplies the row magic, whether rows carry the UUID
//! preamble, and the field layout; [`read_table`] drives the framing. Block
//! lists ([`block`]) are the unframed alternative used for small repeating
//! structures.

mod block;
mod layout;
mod readers;
mod row;

pub use block::{read_blocks, BlockKind, BlockReader, TimeRangeReader};
pub use layout::{decode_fields, Field};
pub use readers::{
    CalendarReader, CommentaryReader, CompanyReader, DayTypeAssignmentReader, DayTypeReader,
    PredecessorReader, ResourceAssignmentReader, ResourceReader, TaskReader, UnknownTableReader,
    UserFieldReader,
};
pub use row::{MapRow, Value};

use crate::error::{Error, Result};
use crate::stream::StreamReader;
use std::io::Read;
use tracing::trace;

/// Magic number opening every table
pub const TABLE_HEADER_MAGIC: u32 = 0x39AF_547A;

/// Magic number closing every table
pub const TABLE_TRAILER_MAGIC: u32 = 0x6F99_E416;

/// The closed set of table schemas that can appear nested in another table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Named sets of working time ranges
    DayType,
    /// Dated calendar exceptions
    DayTypeAssignment,
    /// Resources, nested recursively
    Resource,
    /// User-defined field values
    UserField,
    /// Titled notes
    Commentary,
    /// Task dependencies
    Predecessor,
    /// Resources assigned to a task
    ResourceAssignment,
    /// Tasks, nested recursively
    Task,
}

/// Schema of one kind of table.
///
/// Implementors describe their rows; the framing itself lives in
/// [`read_table`]. The default row decode walks [`TableReader::layout`], so
/// most readers only declare their magic number and field list.
pub trait TableReader {
    /// Name used to tag decoded rows in diagnostics
    fn name(&self) -> &'static str;

    /// Magic number expected before each row
    fn row_magic(&self) -> u32;

    /// Whether each row starts with the version-sized preamble and a UUID
    fn has_uuid(&self) -> bool {
        true
    }

    /// Declarative field sequence of one row
    fn layout(&self) -> &'static [Field] {
        &[]
    }

    /// Decode the fields of one row, after the magic and any UUID preamble
    fn read_row<R: Read>(
        &mut self,
        stream: &mut StreamReader<'_, R>,
        row: &mut MapRow,
    ) -> Result<()> {
        decode_fields(stream, self.layout(), row)
    }

    /// Read anything that follows the trailer magic
    fn post_trailer<R: Read>(&mut self, stream: &mut StreamReader<'_, R>) -> Result<()> {
        let _ = stream;
        Ok(())
    }
}

/// Run the table framing protocol with `reader`, returning one row per record.
///
/// Any magic mismatch aborts the table; no rows are returned in that case.
pub fn read_table<R: Read, T: TableReader>(
    stream: &mut StreamReader<'_, R>,
    reader: &mut T,
) -> Result<Vec<MapRow>> {
    let header = stream.read_magic()?;
    if header != TABLE_HEADER_MAGIC {
        return Err(Error::unexpected_magic(
            "table header",
            TABLE_HEADER_MAGIC,
            header,
        ));
    }

    // A negative count reads as an empty table.
    let count = usize::try_from(stream.read_int()?).unwrap_or(0);
    trace!(reader = reader.name(), count, "reading table");

    let mut rows = Vec::new();
    for _ in 0..count {
        let magic = stream.read_magic()?;
        if magic != reader.row_magic() {
            return Err(Error::unexpected_magic("row", reader.row_magic(), magic));
        }

        let mut row = MapRow::default();
        if reader.has_uuid() {
            let preamble = stream.layout().row_preamble_size();
            row.put("UNKNOWN0", Value::Bytes(stream.read_bytes(preamble)?));
            row.put("UUID", Value::Uuid(stream.read_uuid()?));
        }
        reader.read_row(stream, &mut row)?;

        stream.sink().row(reader.name(), &row);
        rows.push(row);
    }

    let trailer = stream.read_magic()?;
    if trailer != TABLE_TRAILER_MAGIC {
        return Err(Error::unexpected_magic(
            "table trailer",
            TABLE_TRAILER_MAGIC,
            trailer,
        ));
    }

    reader.post_trailer(stream)?;
    Ok(rows)
}
