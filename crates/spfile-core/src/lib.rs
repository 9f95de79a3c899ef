//! # spfile-core
//!
//! A library for decoding Synchro SP project files.
//!
//! SP files are an undocumented container of deflate-compressed tables. This
//! crate provides:
//! - Reading the container header, version and table directory
//! - Decoding the framed, version-dependent table rows into generic rows
//! - Mapping those rows onto calendars, resources, tasks, dependencies and
//!   resource assignments
//!
//! ## Architecture
//!
//! The library is organized into several modules, leaves first:
//!
//! - [`stream`]: Primitive datatype decoding and the typed table cursor
//! - [`table`]: Row framing, declarative row layouts and concrete table readers
//! - [`container`]: Header, directory and table inflation
//! - [`reader`]: The two-pass mapping onto the [`model`]
//! - [`diagnostics`]: Sinks receiving raw structure dumps
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use spfile_core::SpReader;
//!
//! let project = SpReader::new().read_file("schedule.sp")?;
//!
//! for task in project.tasks() {
//!     println!("{:?} {:?} - {:?}", task.name, task.start, task.finish);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Diagnostics
//!
//! Every decode takes a [`DiagnosticSink`]. [`NullSink`] discards everything,
//! [`TextSink`] writes a labelled dump of headers, payloads and rows, and
//! [`StatsSink`] counts what was seen.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod container;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod reader;
pub mod stream;
pub mod table;

// Re-export primary types for convenience
pub use container::{Container, Directory, RequiredTable, TableEntry};
pub use diagnostics::{DiagnosticSink, NullSink, StatsSink, TextSink};
pub use error::{Error, Result};
pub use model::ProjectFile;
pub use reader::{ReaderConfig, SpReader};
pub use stream::{LayoutVersion, StreamReader};
pub use table::{MapRow, Value};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
