//! Data loading utilities

use crate::error::{Result, TabflowError};
use polars::prelude::*;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info};

/// Tokens read as missing in addition to empty fields
pub const DEFAULT_NULL_TOKENS: &[&str] = &["NA", "N/A", "NaN", "null"];

/// CSV loader for delimited text tables
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Field separator
    separator: u8,
    /// Cell values treated as missing
    null_values: Vec<String>,
    /// Rows scanned for schema inference (None = all rows)
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader for comma-separated input with a header row
    pub fn new() -> Self {
        Self {
            separator: b',',
            null_values: DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
            infer_schema_length: Some(1000),
        }
    }

    /// Set the field separator
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// Replace the set of null tokens
    pub fn with_null_values(mut self, tokens: Vec<String>) -> Self {
        self.null_values = tokens;
        self
    }

    /// Set how many rows are scanned to infer column types
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    fn read_options(&self) -> CsvReadOptions {
        let mut parse_opts = CsvParseOptions::default().with_separator(self.separator);
        if !self.null_values.is_empty() {
            let tokens: Vec<PlSmallStr> = self
                .null_values
                .iter()
                .map(|s| PlSmallStr::from(s.as_str()))
                .collect();
            parse_opts = parse_opts.with_null_values(Some(NullValues::AllColumns(tokens)));
        }

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
    }

    /// Load a CSV file from disk
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| TabflowError::LoadError(format!("{}: {}", path.display(), e)))?;

        let is_empty = file
            .metadata()
            .map(|m| m.len() == 0)
            .unwrap_or(false);
        if is_empty {
            return Err(TabflowError::LoadError(format!("{}: file is empty", path.display())));
        }

        let df = self
            .read_options()
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| TabflowError::LoadError(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), rows = df.height(), cols = df.width(), "Dataset loaded");
        Ok(df)
    }

    /// Load a CSV table from any byte stream (e.g. an uploaded file)
    pub fn load_reader<R: Read>(&self, mut reader: R) -> Result<DataFrame> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| TabflowError::LoadError(e.to_string()))?;

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(TabflowError::LoadError("input stream is empty".to_string()));
        }

        let df = self
            .read_options()
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| TabflowError::LoadError(e.to_string()))?;

        debug!(rows = df.height(), cols = df.width(), "Dataset loaded from stream");
        Ok(df)
    }

    /// Detect the separator from the extension and load
    pub fn load_auto<P: AsRef<Path>>(&self, path: P) -> Result<DataFrame> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "tsv" => self.clone().with_separator(b'\t').load_csv(path),
            "csv" | "txt" | "" => self.load_csv(path),
            other => Err(TabflowError::LoadError(format!(
                "unsupported file format: .{}",
                other
            ))),
        }
    }
}

/// Load a comma-separated file with default options
pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    DataLoader::new().load_csv(path)
}

/// Load a comma-separated table from a stream with default options
pub fn load_reader<R: Read>(reader: R) -> Result<DataFrame> {
    DataLoader::new().load_reader(reader)
}

/// Writes frames back to delimited text
pub struct DataSaver;

impl DataSaver {
    /// Save a DataFrame as CSV, overwriting any existing file
    pub fn save_csv<P: AsRef<Path>>(df: &DataFrame, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df.clone())?;
        Ok(())
    }
}
