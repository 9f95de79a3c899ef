//! spfile - Inspect and decode Synchro SP project files
//!
//! Prints a summary of the calendars, resources and task tree decoded from an
//! SP file, or lists the raw table directory of the container.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use spfile_core::model::TaskId;
use spfile_core::{
    DiagnosticSink, Directory, NullSink, ProjectFile, ReaderConfig, SpReader, TextSink,
};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Inspect and decode Synchro SP project files
#[derive(Parser, Debug)]
#[command(name = "spfile")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "summary")]
    format: OutputFormat,

    /// Write a diagnostic dump of the decoded file to this path
    #[arg(long)]
    log: Option<PathBuf>,

    /// Largest accepted inflated table, in bytes
    #[arg(long, default_value_t = spfile_core::reader::DEFAULT_MAX_TABLE_SIZE)]
    max_table_size: usize,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single SP file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory searched recursively for SP files
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// What to print for each file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Counts, default calendar and the task tree
    Summary,
    /// Only the task tree
    Tree,
    /// The container's table directory, without decoding
    Tables,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, file, &mut out)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, directory, &mut out)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Process a single SP file
fn process_single_file(cli: &Cli, file: &Path, out: &mut impl Write) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    process_file(cli, file, out)
}

/// Process every SP file below a directory, skipping files that fail
fn process_directory(cli: &Cli, directory: &Path, out: &mut impl Write) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let files = sp_files(directory);
    let mut decoded = 0;
    for path in &files {
        debug!("Processing: {}", path.display());
        match process_file(cli, path, out) {
            Ok(()) => decoded += 1,
            // Log error but continue with other files
            Err(e) => warn!("Error processing {}: {:#}", path.display(), e),
        }
    }

    info!("Decoded {} of {} files", decoded, files.len());
    writeln!(out, "Decoded {} of {} files", decoded, files.len())?;
    Ok(())
}

/// Files with an `.sp` extension below `directory`, in walk order
fn sp_files(directory: &Path) -> Vec<PathBuf> {
    WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error walking directory: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("sp"))
                .unwrap_or(false)
        })
        .collect()
}

/// Decode or list one file according to the selected format
fn process_file(cli: &Cli, path: &Path, out: &mut impl Write) -> Result<()> {
    if cli.format == OutputFormat::Tables {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file: {}", path.display()))?;
        let directory = Directory::read(BufReader::new(file), &mut NullSink)
            .with_context(|| format!("Failed to read table directory: {}", path.display()))?;
        return write_tables(out, path, &directory);
    }

    let project = decode(cli, path)?;
    match cli.format {
        OutputFormat::Summary => write_summary(out, path, &project),
        _ => write_tree(out, &project),
    }
}

/// Decode a file, writing the diagnostic dump if one was requested
fn decode(cli: &Cli, path: &Path) -> Result<ProjectFile> {
    trace!("Reading {}", path.display());
    let reader = SpReader::with_config(ReaderConfig::new().max_table_size(cli.max_table_size));

    let Some(ref log) = cli.log else {
        return read(&reader, path, &mut NullSink);
    };

    let mut sink = TextSink::create(log)
        .with_context(|| format!("Failed to create log file: {}", log.display()))?;
    let project = read(&reader, path, &mut sink);
    sink.finish()
        .with_context(|| format!("Failed to write log file: {}", log.display()))?;
    project
}

fn read(reader: &SpReader, path: &Path, sink: &mut dyn DiagnosticSink) -> Result<ProjectFile> {
    reader
        .read_file_with_sink(path, sink)
        .with_context(|| format!("Failed to decode: {}", path.display()))
}

fn write_tables(out: &mut impl Write, path: &Path, directory: &Directory) -> Result<()> {
    writeln!(out, "{} (version {})", path.display(), directory.version)?;
    for table in &directory.tables {
        writeln!(out, "  {table}")?;
    }
    Ok(())
}

fn write_summary(out: &mut impl Write, path: &Path, project: &ProjectFile) -> Result<()> {
    writeln!(out, "{}", path.display())?;
    writeln!(out, "  calendars:   {}", project.calendars().len())?;
    writeln!(out, "  resources:   {}", project.resources().len())?;
    writeln!(out, "  tasks:       {}", project.tasks().len())?;
    writeln!(out, "  relations:   {}", project.relations().len())?;
    writeln!(out, "  assignments: {}", project.assignments().len())?;
    let default_calendar = project
        .default_calendar()
        .map(|calendar| calendar.name.as_deref().unwrap_or("(unnamed)"))
        .unwrap_or("(none)");
    writeln!(out, "  default calendar: {default_calendar}")?;
    write_tree(out, project)
}

fn write_tree(out: &mut impl Write, project: &ProjectFile) -> Result<()> {
    for &root in project.root_tasks() {
        write_task(out, project, root, 1)?;
    }
    Ok(())
}

fn write_task(
    out: &mut impl Write,
    project: &ProjectFile,
    id: TaskId,
    depth: usize,
) -> Result<()> {
    let task = project.task(id);
    let date = |value: Option<chrono::NaiveDateTime>| {
        value.map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string())
    };

    write!(out, "{:indent$}", "", indent = depth * 2)?;
    if let Some(code) = &task.code {
        write!(out, "{code} ")?;
    }
    write!(
        out,
        "{} [{} .. {}]",
        task.name.as_deref().unwrap_or("(unnamed)"),
        date(task.start),
        date(task.finish)
    )?;
    if task.milestone {
        write!(out, " milestone")?;
    }
    for relation in project.predecessors(id) {
        let predecessor = project.task(relation.predecessor);
        write!(
            out,
            " <- {} {}",
            predecessor
                .code
                .as_deref()
                .or(predecessor.name.as_deref())
                .unwrap_or("?"),
            relation.relation_type.as_str()
        )?;
    }
    writeln!(out)?;

    for &child in &task.children {
        write_task(out, project, child, depth + 1)?;
    }
    Ok(())
}
