use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::io::TextEncoding;

/// Paths and options shared by every stage.
///
/// Loaded from an optional TOML file; missing keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw export read by the cleaner.
    pub raw_path: PathBuf,
    /// Cleaned dataset written by the cleaner and read by the aggregator.
    pub cleaned_path: PathBuf,
    /// Directory for summaries, KPIs and quality reports.
    pub output_dir: PathBuf,
    /// Encoding of the raw export and of quality inputs.
    pub encoding: TextEncoding,
    /// Inputs tried in order by the quality reporter.
    pub quality_search_paths: Vec<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("data/raw_sales_data.csv"),
            cleaned_path: PathBuf::from("data/cleaned_sales_data.csv"),
            output_dir: PathBuf::from("outputs"),
            encoding: TextEncoding::Latin1,
            quality_search_paths: [
                "../data/cleaned_sales_data.csv",
                "data/cleaned_sales_data.csv",
                "../data/raw_sales_data.csv",
                "data/raw_sales_data.csv",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// `<output_dir>/<stem>.csv`
    pub fn table_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}.csv"))
    }

    pub fn report_path(&self, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("data_quality_report.{extension}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            output_dir = "reports"
            encoding = "utf8"
            "#,
        )
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("reports"));
        assert_eq!(config.encoding, TextEncoding::Utf8);
        assert_eq!(config.raw_path, PipelineConfig::default().raw_path);
        assert_eq!(config.quality_search_paths.len(), 4);
        assert_eq!(
            config.table_path("kpis"),
            PathBuf::from("reports").join("kpis.csv")
        );
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert!(toml::from_str::<PipelineConfig>("encoding = \"ebcdic\"").is_err());
    }
}
