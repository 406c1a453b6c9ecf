use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesError {
    #[error("Parse error in column '{column}' at row {row}: {reason} (value: {value:?})")]
    Parse {
        column: String,
        row: usize,
        value: String,
        reason: String,
    },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Input column '{0}' clashes with a derived column")]
    ReservedColumn(String),

    #[error("Input not found, tried: {}", display_paths(.tried))]
    MissingInput { tried: Vec<PathBuf> },

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SalesError {
    pub(crate) fn parse(column: &str, row: usize, value: &str, reason: impl Into<String>) -> Self {
        SalesError::Parse {
            column: column.to_string(),
            row,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, SalesError>;
