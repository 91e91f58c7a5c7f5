//! Record Import
//!
//! Loads tracking records from files so they can be aggregated:
//!
//! - **JSON**: an array of `{ "key", "timestamp", "value" }` objects
//! - **NDJSON**: one such object per line
//! - **CSV**: long (`key,timestamp,value`) or wide (`date,mood,weight,...`) tables
//!
//! Rows that cannot be parsed are counted and reported, never fatal.
//!
//! # Example
//!
//! ```rust,no_run
//! use lifestats::import::RecordImporter;
//! use std::path::Path;
//!
//! let result = RecordImporter::new().import(Path::new("journal.csv"))?;
//! println!("{} records, {} bad rows", result.records.len(), result.rows_failed);
//! # Ok::<(), lifestats::import::ImportError>(())
//! ```

mod csv_import;
mod error;
mod json_import;
mod timestamp;

pub use error::ImportError;
pub use timestamp::{parse_duration, parse_range_end, parse_timestamp};

use crate::stats::Record;
use chrono::{FixedOffset, Offset, Utc};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// A JSON array of records
    Json,
    /// Newline-delimited JSON records
    NdJson,
    /// Comma-separated values
    Csv,
}

impl ImportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_str(ext)
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "ndjson" | "jsonl" => Some(Self::NdJson),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Shape of a CSV table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CsvLayout {
    /// Pick from the header row
    #[default]
    Auto,
    /// `key`, `timestamp` and `value` columns
    Long,
    /// One timestamp column plus one column per series
    Wide,
}

/// Outcome of an import
#[derive(Debug, Default)]
pub struct ImportResult {
    pub records: Vec<Record>,
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub errors: Vec<String>,
}

/// Row errors kept in an [`ImportResult`]
const MAX_REPORTED_ERRORS: usize = 100;

impl ImportResult {
    fn fail(&mut self, row: usize, message: impl std::fmt::Display) {
        self.rows_failed += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(format!("Row {}: {}", row, message));
        }
    }

    /// Note how many row errors were not kept
    fn finish(mut self) -> Self {
        if self.rows_failed > self.errors.len() {
            let hidden = self.rows_failed - self.errors.len();
            self.errors.push(format!("... and {} more errors", hidden));
        }
        self
    }
}

/// File importer with configurable format and column mapping
#[derive(Debug, Clone)]
pub struct RecordImporter {
    /// Input format (guessed from the file extension when unset)
    format: Option<ImportFormat>,
    /// CSV table shape
    layout: CsvLayout,
    /// CSV timestamp column name (detected when unset)
    timestamp_column: Option<String>,
    /// Whether the CSV has a header row
    has_header: bool,
    /// Offset for timestamps without one
    offset: FixedOffset,
}

impl Default for RecordImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordImporter {
    /// Create a new importer with default settings
    pub fn new() -> Self {
        Self {
            format: None,
            layout: CsvLayout::Auto,
            timestamp_column: None,
            has_header: true,
            offset: Utc.fix(),
        }
    }

    /// Force an input format
    pub fn with_format(mut self, format: ImportFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the CSV layout
    pub fn with_layout(mut self, layout: CsvLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the CSV timestamp column name
    pub fn with_timestamp_column(mut self, column: &str) -> Self {
        self.timestamp_column = Some(column.to_string());
        self
    }

    /// Set whether the CSV has a header row
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Set the offset used for naive timestamps
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Import records from a file
    pub fn import(&self, path: &Path) -> Result<ImportResult, ImportError> {
        let format = match self.format {
            Some(format) => format,
            None => ImportFormat::from_path(path)
                .ok_or_else(|| ImportError::UnsupportedFormat(path.display().to_string()))?,
        };

        let file = File::open(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let result = self.import_reader(BufReader::new(file), format)?;

        tracing::info!(
            path = %path.display(),
            records = result.records.len(),
            failed = result.rows_failed,
            "Imported records"
        );

        Ok(result)
    }

    /// Import records from any reader
    pub fn import_reader<R: Read>(
        &self,
        reader: R,
        format: ImportFormat,
    ) -> Result<ImportResult, ImportError> {
        let result = match format {
            ImportFormat::Json => json_import::read_array(reader, &self.offset)?,
            ImportFormat::NdJson => json_import::read_lines(reader, &self.offset)?,
            ImportFormat::Csv => csv_import::read(self, reader)?,
        };

        Ok(result.finish())
    }
}
