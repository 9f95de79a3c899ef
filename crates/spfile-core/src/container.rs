//! The SP container: header, version, table directory and compressed tables.
//!
//! ## Layout
//!
//! ```text
//! 20 bytes      opaque header
//! string        dotted version ("6.1.0"); the first component is the major version
//! 48 bytes * n  directory entries: nul-terminated name at 0, i32 offset at 40,
//!               terminated by an entry with an empty name
//! tables        at their offsets: embedded name string, then a deflate payload
//! ```
//!
//! Only the [`RequiredTable`]s are inflated. Everything else is skipped
//! without decompression.

use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, Result};
use crate::stream::datatype::{self, get_int_at, get_simple_string};
use crate::stream::{LayoutVersion, StreamReader};
use bytes::{buf::Reader, Buf, Bytes};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use tracing::{debug, trace};

/// Size of the opaque file header
pub const HEADER_SIZE: usize = 20;

/// Size of one table directory entry
pub const DIRECTORY_ENTRY_SIZE: usize = 48;

/// Position of the table offset within a directory entry
const DIRECTORY_OFFSET_POSITION: usize = 40;

/// Tables decoded by the domain reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequiredTable {
    /// Task hierarchy
    Tasks,
    /// Calendars and day types
    Calendars,
    /// Companies and their resources
    Companies,
}

impl RequiredTable {
    /// Every required table
    pub const ALL: [RequiredTable; 3] = [
        RequiredTable::Tasks,
        RequiredTable::Calendars,
        RequiredTable::Companies,
    ];

    /// Directory name of the table
    pub fn name(self) -> &'static str {
        match self {
            RequiredTable::Tasks => "Tasks",
            RequiredTable::Calendars => "Calendars",
            RequiredTable::Companies => "Companies",
        }
    }

    /// Looks up a required table by directory name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.name() == name)
    }
}

impl fmt::Display for RequiredTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the table directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    /// Table name
    pub name: String,
    /// Absolute offset of the table in the file
    pub offset: u64,
    /// Bytes up to the next table; `None` for the last table, which runs to
    /// the end of the file
    pub length: Option<u64>,
}

impl fmt::Display for TableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} offset={}", self.name, self.offset)?;
        match self.length {
            Some(length) => write!(f, " length={length}"),
            None => f.write_str(" length=unbounded"),
        }
    }
}

/// Header, version and table directory of an SP file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    /// Version string as stored
    pub version: String,
    /// First component of the version
    pub major_version: u32,
    /// Table entries sorted by offset
    pub tables: Vec<TableEntry>,
}

impl Directory {
    /// Reads the header, version and directory, leaving `input` positioned
    /// after the directory terminator.
    pub fn read<R: Read>(input: R, sink: &mut dyn DiagnosticSink) -> Result<Self> {
        Self::read_counted(&mut PositionReader::new(input), sink)
    }

    fn read_counted<R: Read>(
        input: &mut PositionReader<R>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Self> {
        let header = datatype::get_bytes(input, HEADER_SIZE)?;
        sink.header(&header);

        let version = datatype::get_string(input)?.unwrap_or_default();
        sink.version(&version);
        let major_version = parse_major_version(&version)?;
        debug!(%version, major_version, "read SP version");

        let mut tables = Vec::new();
        let mut entry = [0u8; DIRECTORY_ENTRY_SIZE];
        loop {
            input.read_exact(&mut entry)?;
            let name = get_simple_string(&entry, 0);
            if name.is_empty() {
                break;
            }
            let offset = get_int_at(&entry, DIRECTORY_OFFSET_POSITION)?;
            let offset = u64::try_from(offset).map_err(|_| Error::InvalidTableOffset {
                name: name.clone(),
                offset,
            })?;
            tables.push(TableEntry {
                name,
                offset,
                length: None,
            });
        }

        tables.sort_by_key(|table| table.offset);
        let offsets: Vec<u64> = tables.iter().map(|table| table.offset).collect();
        for (table, next) in tables.iter_mut().zip(offsets.iter().skip(1)) {
            table.length = Some(next - table.offset);
        }

        for table in &tables {
            sink.table_entry(table);
        }

        Ok(Self {
            version,
            major_version,
            tables,
        })
    }
}

/// Extracts the major version from a dotted version string
pub fn parse_major_version(version: &str) -> Result<u32> {
    version
        .split('.')
        .next()
        .and_then(|major| major.trim().parse().ok())
        .ok_or_else(|| Error::InvalidVersion {
            version: version.to_string(),
        })
}

/// An SP file with its required tables inflated into memory
#[derive(Debug, Clone)]
pub struct Container {
    directory: Directory,
    tables: HashMap<RequiredTable, Bytes>,
}

impl Container {
    /// Reads the whole container, inflating every required table present.
    ///
    /// Inflated tables larger than `max_table_size` bytes are rejected.
    pub fn read<R: Read>(
        input: R,
        max_table_size: usize,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Self> {
        let mut input = PositionReader::new(input);
        let directory = Directory::read_counted(&mut input, sink)?;

        let mut tables = HashMap::new();
        for entry in &directory.tables {
            let Some(table) = RequiredTable::from_name(&entry.name) else {
                trace!(name = %entry.name, "skipping table");
                continue;
            };
            let data = read_table(&mut input, entry, max_table_size, sink)?;
            debug!(table = %table, inflated = data.len(), "read table");
            tables.insert(table, data);
        }

        Ok(Self { directory, tables })
    }

    /// Version string of the file
    pub fn version(&self) -> &str {
        &self.directory.version
    }

    /// Major version of the file
    pub fn major_version(&self) -> u32 {
        self.directory.major_version
    }

    /// Table directory sorted by offset
    pub fn entries(&self) -> &[TableEntry] {
        &self.directory.tables
    }

    /// Inflated bytes of a required table, if it was present
    pub fn raw_table(&self, table: RequiredTable) -> Option<&Bytes> {
        self.tables.get(&table)
    }

    /// Opens a required table for reading, skipping its sub-header
    pub fn table_data<'s>(
        &self,
        table: RequiredTable,
        sink: &'s mut dyn DiagnosticSink,
    ) -> Result<StreamReader<'s, Reader<Bytes>>> {
        let data = self
            .tables
            .get(&table)
            .ok_or_else(|| Error::missing_table(table.name()))?;
        let mut reader = data.clone().reader();

        let header_size = LayoutVersion::from_major(self.major_version()).table_header_size();
        if header_size > 0 {
            let header = datatype::get_bytes(&mut reader, header_size)?;
            sink.table_header(table.name(), &header);
        }

        Ok(StreamReader::new(self.major_version(), reader, sink))
    }
}

/// Read and inflate one table, consuming its whole span
fn read_table<R: Read>(
    input: &mut PositionReader<R>,
    entry: &TableEntry,
    max_table_size: usize,
    sink: &mut dyn DiagnosticSink,
) -> Result<Bytes> {
    let position = input.position();
    if entry.offset < position {
        return Err(Error::TableOverlap {
            name: entry.name.clone(),
            offset: entry.offset,
            position,
        });
    }
    input.skip(entry.offset - position)?;

    let name_start = input.position();
    let name = datatype::get_string(input)?;
    let name_length = input.position() - name_start;
    sink.table_name(name.as_deref());

    let mut compressed = Vec::new();
    match entry.length {
        Some(length) => {
            let remaining = length
                .checked_sub(name_length)
                .ok_or_else(|| Error::TableTruncated {
                    name: entry.name.clone(),
                })?;
            input.by_ref().take(remaining).read_to_end(&mut compressed)?;
            if (compressed.len() as u64) < remaining {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }
        }
        None => {
            input.read_to_end(&mut compressed)?;
        }
    }

    let data = inflate(&entry.name, &compressed, max_table_size)?;
    sink.payload(&entry.name, &data);
    Ok(Bytes::from(data))
}

/// Returns true if `data` starts with a zlib stream header
fn has_zlib_header(data: &[u8]) -> bool {
    match data {
        [cmf, flg, ..] => cmf & 0x0F == 8 && ((u16::from(*cmf) << 8) | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

/// Inflate a table payload, accepting either a zlib stream or raw deflate
pub fn inflate(name: &str, compressed: &[u8], limit: usize) -> Result<Vec<u8>> {
    let decoder: Box<dyn Read + '_> = if has_zlib_header(compressed) {
        Box::new(ZlibDecoder::new(compressed))
    } else {
        Box::new(DeflateDecoder::new(compressed))
    };

    let mut data = Vec::new();
    decoder
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut data)
        .map_err(|source| Error::inflate(name, source))?;
    if data.len() > limit {
        return Err(Error::TableTooLarge {
            name: name.to_string(),
            limit,
        });
    }
    Ok(data)
}

/// Reader that tracks how many bytes have been consumed
struct PositionReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> PositionReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    fn position(&self) -> u64 {
        self.position
    }

    /// Discard exactly `count` bytes
    fn skip(&mut self, count: u64) -> io::Result<()> {
        let skipped = io::copy(&mut self.by_ref().take(count), &mut io::sink())?;
        if skipped < count {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(())
    }
}

impl<R: Read> Read for PositionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.position += read as u64;
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{NullSink, StatsSink, TextSink};
    use flate2::write::{DeflateEncoder, ZlibEncoder};
    use flate2::Compression;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn string(value: &str) -> Vec<u8> {
        let mut out = vec![1, value.len() as u8];
        out.extend_from_slice(value.as_bytes());
        out
    }

    /// Assembles a container from (name, payload) pairs laid out in order
    fn container(version: &str, tables: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut out = vec![0xAB; HEADER_SIZE];
        out.extend(string(version));

        let mut offset = out.len() + DIRECTORY_ENTRY_SIZE * (tables.len() + 1);
        let mut bodies = Vec::new();
        for (name, payload) in tables {
            let mut entry = [0u8; DIRECTORY_ENTRY_SIZE];
            entry[..name.len()].copy_from_slice(name.as_bytes());
            entry[40..44].copy_from_slice(&(offset as i32).to_le_bytes());
            out.extend_from_slice(&entry);

            let mut body = string(name);
            body.extend(deflate(payload));
            offset += body.len();
            bodies.extend(body);
        }
        out.extend_from_slice(&[0u8; DIRECTORY_ENTRY_SIZE]);
        out.extend(bodies);
        out
    }

    #[test]
    fn test_required_table_names() {
        assert_eq!(RequiredTable::from_name("Tasks"), Some(RequiredTable::Tasks));
        assert_eq!(RequiredTable::from_name("Companies"), Some(RequiredTable::Companies));
        assert_eq!(RequiredTable::from_name("Resources"), None);
    }

    #[test]
    fn test_parse_major_version() {
        assert_eq!(parse_major_version("6.1.0").unwrap(), 6);
        assert_eq!(parse_major_version("5").unwrap(), 5);
        assert!(matches!(
            parse_major_version("beta"),
            Err(Error::InvalidVersion { .. })
        ));
        assert!(parse_major_version("").is_err());
    }

    #[test]
    fn test_directory_lengths() {
        let data = container(
            "6.1.0",
            &[
                ("Tasks", b"tasks".to_vec()),
                ("Notes", b"ignored".to_vec()),
                ("Calendars", b"calendars".to_vec()),
            ],
        );
        let mut sink = StatsSink::default();
        let directory = Directory::read(data.as_slice(), &mut sink).unwrap();

        assert_eq!(directory.version, "6.1.0");
        assert_eq!(directory.major_version, 6);
        let names: Vec<&str> = directory.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Tasks", "Notes", "Calendars"]);
        assert_eq!(
            directory.tables[0].length,
            Some(directory.tables[1].offset - directory.tables[0].offset)
        );
        assert_eq!(directory.tables[2].length, None);
        assert_eq!(sink.table_entries, 3);
    }

    #[test]
    fn test_reads_only_required_tables() {
        let data = container(
            "6.1.0",
            &[
                ("Tasks", b"task bytes".to_vec()),
                ("Notes", b"never inflated".to_vec()),
                ("Companies", b"company bytes".to_vec()),
            ],
        );
        let mut sink = StatsSink::default();
        let container = Container::read(data.as_slice(), 1 << 20, &mut sink).unwrap();

        assert_eq!(container.major_version(), 6);
        assert_eq!(
            container.raw_table(RequiredTable::Tasks).map(|b| &b[..]),
            Some(&b"task bytes"[..])
        );
        assert_eq!(
            container.raw_table(RequiredTable::Companies).map(|b| &b[..]),
            Some(&b"company bytes"[..])
        );
        assert!(container.raw_table(RequiredTable::Calendars).is_none());
        assert!(!sink.inflated_bytes.contains_key("Notes"));

        let err = container
            .table_data(RequiredTable::Calendars, &mut NullSink)
            .err()
            .unwrap();
        assert!(matches!(err, Error::MissingTable { .. }));
    }

    #[test]
    fn test_directory_order_is_by_offset() {
        // entries listed in reverse offset order
        let mut data = container(
            "5.0",
            &[("Tasks", b"a".to_vec()), ("Calendars", b"b".to_vec())],
        );
        let first = HEADER_SIZE + string("5.0").len();
        let entries = &mut data[first..first + 2 * DIRECTORY_ENTRY_SIZE];
        let (left, right) = entries.split_at_mut(DIRECTORY_ENTRY_SIZE);
        left.swap_with_slice(right);

        let container = Container::read(data.as_slice(), 1024, &mut NullSink).unwrap();
        assert_eq!(container.entries()[0].name, "Tasks");
        assert_eq!(
            container.raw_table(RequiredTable::Calendars).map(|b| &b[..]),
            Some(&b"b"[..])
        );
    }

    #[test]
    fn test_table_sub_header_skipped_when_current() {
        let mut payload = vec![0xCC; 24];
        payload.extend_from_slice(&[1, 2, 3]);
        let data = container("6.0", &[("Tasks", payload.clone())]);
        let container = Container::read(data.as_slice(), 1024, &mut NullSink).unwrap();

        let mut sink = TextSink::new(Vec::new());
        let stream = container
            .table_data(RequiredTable::Tasks, &mut sink)
            .unwrap();
        let rest: Vec<u8> = stream.into_inner().bytes().map(|b| b.unwrap()).collect();
        assert_eq!(rest, vec![1, 2, 3]);
        let log = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert!(log.starts_with("TABLE HEADER: Tasks cccc"));

        let legacy = container_with_version("5.2", &payload);
        let mut null_sink = NullSink;
        let stream = legacy
            .table_data(RequiredTable::Tasks, &mut null_sink)
            .unwrap();
        assert_eq!(stream.into_inner().into_inner().len(), payload.len());
    }

    fn container_with_version(version: &str, payload: &[u8]) -> Container {
        let data = container(version, &[("Tasks", payload.to_vec())]);
        Container::read(data.as_slice(), 1024, &mut NullSink).unwrap()
    }

    #[test]
    fn test_zlib_payload() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"zlib wrapped").unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(has_zlib_header(&compressed));
        assert_eq!(inflate("Tasks", &compressed, 64).unwrap(), b"zlib wrapped");
        assert_eq!(inflate("Tasks", &deflate(b"raw"), 64).unwrap(), b"raw");
    }

    #[test]
    fn test_inflate_limit() {
        let compressed = deflate(&[0u8; 4096]);
        assert!(inflate("Tasks", &compressed, 4096).is_ok());
        assert!(matches!(
            inflate("Tasks", &compressed, 4095),
            Err(Error::TableTooLarge { limit: 4095, .. })
        ));
    }

    #[test]
    fn test_inflate_unbounded_limit() {
        let compressed = deflate(b"payload");
        assert_eq!(inflate("Tasks", &compressed, usize::MAX).unwrap(), b"payload");
    }

    #[test]
    fn test_truncated_directory() {
        let data = container("6.0", &[("Tasks", b"x".to_vec())]);
        let cut = HEADER_SIZE + string("6.0").len() + DIRECTORY_ENTRY_SIZE + 10;
        let err = Container::read(&data[..cut], 1024, &mut NullSink).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_negative_offset() {
        let mut data = container("6.0", &[("Tasks", b"x".to_vec())]);
        let entry = HEADER_SIZE + string("6.0").len();
        data[entry + 40..entry + 44].copy_from_slice(&(-5i32).to_le_bytes());
        let err = Container::read(data.as_slice(), 1024, &mut NullSink).unwrap_err();
        assert!(matches!(err, Error::InvalidTableOffset { offset: -5, .. }));
    }

    #[test]
    fn test_table_entry_display() {
        let entry = TableEntry {
            name: "Tasks".to_string(),
            offset: 160,
            length: None,
        };
        assert_eq!(entry.to_string(), "Tasks offset=160 length=unbounded");
    }
}
