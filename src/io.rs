use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SalesError};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Text encoding of input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// Every byte maps to the code point of the same value; never fails.
    #[default]
    Latin1,
    /// UTF-8 with invalid sequences replaced.
    Utf8,
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        match self {
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Read a CSV file with all columns as String dtype.
/// Trims whitespace from column names.
pub fn read_table(path: &Path, encoding: TextEncoding) -> Result<DataFrame> {
    info!(path = %path.display(), ?encoding, "Loading table");
    let bytes = fs::read(path)?;
    let df = parse_csv(encoding.decode(&bytes))?;
    debug!(rows = df.height(), columns = df.width(), "Table loaded");
    Ok(df)
}

/// Parse CSV text with a header row into a frame of String columns.
pub fn parse_csv(text: String) -> Result<DataFrame> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    Ok(df)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write a frame as CSV with a header row, creating parent directories.
pub fn write_table(df: &mut DataFrame, path: &Path) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path)?;
    CsvWriter::new(file).include_header(true).finish(df)?;
    info!(path = %path.display(), rows = df.height(), "Table written");
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    create_parent(path)?;
    fs::write(path, text)?;
    info!(path = %path.display(), "Report written");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_text(path, &serde_json::to_string_pretty(value)?)
}

/// First candidate that exists on disk.
pub fn resolve_input(candidates: &[PathBuf]) -> Result<PathBuf> {
    for path in candidates {
        if path.exists() {
            info!(path = %path.display(), "Found input file");
            return Ok(path.clone());
        }
        debug!(path = %path.display(), "Input file not found");
    }
    Err(SalesError::MissingInput {
        tried: candidates.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_decodes_any_bytes() {
        let bytes = b"Jos\xe9 M\xfcller";
        assert_eq!(TextEncoding::Latin1.decode(bytes), "José Müller");
        assert_eq!(TextEncoding::Utf8.decode(bytes), "Jos\u{FFFD} M\u{FFFD}ller");
    }

    #[test]
    fn bom_is_stripped() {
        let bytes = b"\xEF\xBB\xBFOrder ID";
        assert_eq!(TextEncoding::Latin1.decode(bytes), "Order ID");
    }

    #[test]
    fn parse_csv_keeps_strings_and_trims_headers() {
        let df = parse_csv(" Order ID ,Sales\nCA-1,10.50\nCA-2,\n".to_string()).unwrap();
        assert_eq!(df.get_column_names_str(), vec!["Order ID", "Sales"]);
        let sales = df.column("Sales").unwrap().str().unwrap();
        assert_eq!(sales.get(0), Some("10.50"));
        assert_eq!(sales.get(1), None);
    }

    #[test]
    fn resolve_input_reports_every_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        let present = dir.path().join("present.csv");
        fs::write(&present, "a\n1\n").unwrap();

        let found = resolve_input(&[missing.clone(), present.clone()]).unwrap();
        assert_eq!(found, present);

        match resolve_input(&[missing.clone()]) {
            Err(SalesError::MissingInput { tried }) => assert_eq!(tried, vec![missing]),
            other => panic!("expected missing input, got {other:?}"),
        }
    }

    #[test]
    fn write_table_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let mut df = DataFrame::new(vec![Column::new("x".into(), [1i64, 2])]).unwrap();
        write_table(&mut df, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x\n1\n2\n");
    }
}
