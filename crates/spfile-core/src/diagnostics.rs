//! Diagnostic sinks for inspecting the raw structure of an SP file.
//!
//! A [`DiagnosticSink`] is handed to each decode explicitly. It receives the
//! file header, version, table directory, inflated payloads and every decoded
//! row. All methods default to no-ops, so an implementation only overrides
//! what it cares about.

use crate::container::TableEntry;
use crate::table::MapRow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Number of bytes shown on each hex dump line
const HEX_LINE_WIDTH: usize = 16;

/// Receiver for labelled dumps produced while decoding.
pub trait DiagnosticSink {
    /// The opaque fixed-size file header
    fn header(&mut self, data: &[u8]) {
        let _ = data;
    }

    /// The version string
    fn version(&mut self, version: &str) {
        let _ = version;
    }

    /// One table directory entry, after lengths have been computed
    fn table_entry(&mut self, entry: &TableEntry) {
        let _ = entry;
    }

    /// The table name embedded at the start of a table's data
    fn table_name(&mut self, name: Option<&str>) {
        let _ = name;
    }

    /// An inflated table payload
    fn payload(&mut self, table: &str, data: &[u8]) {
        let _ = (table, data);
    }

    /// The per-table sub-header skipped before row data
    fn table_header(&mut self, table: &str, data: &[u8]) {
        let _ = (table, data);
    }

    /// One decoded row, tagged with the reader that produced it
    fn row(&mut self, reader: &'static str, row: &MapRow) {
        let _ = (reader, row);
    }
}

/// A sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {}

/// A sink that writes a human-readable dump.
///
/// Write errors do not interrupt decoding; the first one is kept and
/// reported by [`TextSink::finish`].
#[derive(Debug)]
pub struct TextSink<W: Write> {
    writer: W,
    error: Option<io::Error>,
}

impl TextSink<BufWriter<File>> {
    /// Opens (truncating) a log file
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> TextSink<W> {
    /// Wraps a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    /// Flushes and returns the writer, or the first write error seen
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn emit(&mut self, write: impl FnOnce(&mut W) -> io::Result<()>) {
        if self.error.is_none() {
            if let Err(err) = write(&mut self.writer) {
                self.error = Some(err);
            }
        }
    }

    fn labelled(&mut self, label: &str, text: &str) {
        self.emit(|w| writeln!(w, "{label}: {text}"));
    }

    fn hexdump(&mut self, data: &[u8]) {
        self.emit(|w| {
            for (line, chunk) in data.chunks(HEX_LINE_WIDTH).enumerate() {
                let ascii: String = chunk
                    .iter()
                    .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                    .collect();
                writeln!(
                    w,
                    "{:08x}  {:<width$}  |{}|",
                    line * HEX_LINE_WIDTH,
                    hex::encode(chunk),
                    ascii,
                    width = HEX_LINE_WIDTH * 2
                )?;
            }
            Ok(())
        });
    }
}

impl<W: Write> DiagnosticSink for TextSink<W> {
    fn header(&mut self, data: &[u8]) {
        self.labelled("HEADER", &hex::encode(data));
    }

    fn version(&mut self, version: &str) {
        self.labelled("VERSION", version);
    }

    fn table_entry(&mut self, entry: &TableEntry) {
        self.labelled("TABLE", &entry.to_string());
    }

    fn table_name(&mut self, name: Option<&str>) {
        self.labelled("READ", name.unwrap_or(""));
    }

    fn payload(&mut self, table: &str, data: &[u8]) {
        self.labelled("PAYLOAD", &format!("{table} ({} bytes)", data.len()));
        self.hexdump(data);
    }

    fn table_header(&mut self, table: &str, data: &[u8]) {
        self.labelled("TABLE HEADER", &format!("{table} {}", hex::encode(data)));
    }

    fn row(&mut self, reader: &'static str, row: &MapRow) {
        self.labelled("READER", reader);
        self.emit(|w| {
            for (name, value) in row.iter() {
                writeln!(w, "{name}: {value}")?;
            }
            writeln!(w)
        });
    }
}

/// A sink that counts what it sees
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsSink {
    /// Directory entries seen
    pub table_entries: usize,
    /// Inflated bytes per table
    pub inflated_bytes: BTreeMap<String, usize>,
    /// Decoded rows per reader
    pub rows: BTreeMap<&'static str, usize>,
}

impl StatsSink {
    /// Rows decoded by one reader
    pub fn rows_for(&self, reader: &str) -> usize {
        self.rows.get(reader).copied().unwrap_or(0)
    }
}

impl DiagnosticSink for StatsSink {
    fn table_entry(&mut self, _entry: &TableEntry) {
        self.table_entries += 1;
    }

    fn payload(&mut self, table: &str, data: &[u8]) {
        *self.inflated_bytes.entry(table.to_string()).or_default() += data.len();
    }

    fn row(&mut self, reader: &'static str, _row: &MapRow) {
        *self.rows.entry(reader).or_default() += 1;
    }
}
