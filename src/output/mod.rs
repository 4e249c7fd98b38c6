//! Output writers for transformed results

use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

pub mod csv;

pub use self::csv::{CsvRecordsWriter, ToCsvRow};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON of the whole result
    #[default]
    Json,
    /// One CSV row per record
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data
    fn flush(&mut self) -> OutputResult<()>;

    /// Flush and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Trait for writing records of one kind
pub trait RecordsWriter<R>: OutputWriter {
    /// Write a single record
    fn write_record(&mut self, record: &R) -> OutputResult<()>;

    /// Write multiple records at once
    fn write_records(&mut self, records: &[R]) -> OutputResult<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }
}

/// Buffered destination: the file at `path`, or stdout when `None`.
///
/// Parent directories are created as needed.
pub fn open_destination(path: Option<&Path>) -> OutputResult<Box<dyn Write>> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
            }
            let file = File::create(path)
                .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;
            info!("Writing output to {}", path.display());
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Write `value` as pretty JSON followed by a newline
pub fn write_json<T: Serialize, W: Write>(value: &T, mut out: W) -> OutputResult<()> {
    serde_json::to_writer_pretty(&mut out, value)
        .map_err(|e| OutputError::SerializationError(format!("Failed to write JSON: {}", e)))?;
    writeln!(out).map_err(|e| OutputError::IoError(e.to_string()))?;
    out.flush()
        .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
}
