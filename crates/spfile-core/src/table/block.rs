//! Count-prefixed block lists.
//!
//! Blocks are fixed-layout repeating structures without any framing: an
//! `i32` count followed by that many records. There are no magic numbers
//! and no UUID preamble.

use super::{decode_fields, Field, MapRow};
use crate::error::Result;
use crate::stream::StreamReader;
use std::io::Read;

/// The closed set of block layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Working time ranges of a day type
    TimeRange,
}

/// Layout of one kind of block
pub trait BlockReader {
    /// Fields of a single block
    fn layout(&self) -> &'static [Field];

    /// Decode one block
    fn read_block<R: Read>(
        &self,
        stream: &mut StreamReader<'_, R>,
        row: &mut MapRow,
    ) -> Result<()> {
        decode_fields(stream, self.layout(), row)
    }
}

/// Read a count-prefixed list of blocks
pub fn read_blocks<R: Read, B: BlockReader>(
    stream: &mut StreamReader<'_, R>,
    reader: &B,
) -> Result<Vec<MapRow>> {
    let count = usize::try_from(stream.read_int()?).unwrap_or(0);
    let mut blocks = Vec::new();
    for _ in 0..count {
        let mut row = MapRow::default();
        reader.read_block(stream, &mut row)?;
        blocks.push(row);
    }
    Ok(blocks)
}

/// Start and end of one working period
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeRangeReader;

impl BlockReader for TimeRangeReader {
    fn layout(&self) -> &'static [Field] {
        &[Field::Time("START"), Field::Time("END")]
    }
}
