use std::path::PathBuf;

use chrono::NaiveDateTime;
use tracing::info;

use crate::aggregation::{summarize, Summaries};
use crate::cleaning::{clean, restore, Cleaned};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::io::{self, TextEncoding};
use crate::kpi::{compute_kpis, Kpis};
use crate::model::SalesTable;
use crate::quality::{assess_quality, QualityReport};
use crate::schema::date_format;

/// Everything one end-to-end run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub cleaned: Cleaned,
    pub kpis: Kpis,
    pub summaries: Summaries,
    pub quality: QualityReport,
}

/// Read the raw export, clean it and write the cleaned dataset.
pub fn run_clean(config: &PipelineConfig) -> Result<Cleaned> {
    let df = io::read_table(&config.raw_path, config.encoding)?;
    let raw = SalesTable::from_frame(&df, date_format::RAW_ONLY)?;
    let cleaned = clean(&raw)?;
    io::write_table(&mut cleaned.table.frame().clone(), &config.cleaned_path)?;
    Ok(cleaned)
}

/// Read the cleaned dataset and write KPIs plus every summary table.
/// The cleaned file is always UTF-8, whatever the raw encoding was.
pub fn run_aggregate(config: &PipelineConfig) -> Result<(Kpis, Summaries)> {
    let df = io::read_table(&config.cleaned_path, TextEncoding::Utf8)?;
    let table = restore(SalesTable::from_frame(&df, date_format::CLEANED_ONLY)?)?;
    let kpis = compute_kpis(&table)?;
    let summaries = summarize(&table)?;
    write_aggregates(config, &kpis, &summaries)?;
    Ok((kpis, summaries))
}

/// Assess the first input found on the search path and write both reports.
/// Returns the report and the file it was computed from.
pub fn run_quality(
    config: &PipelineConfig,
    now: NaiveDateTime,
) -> Result<(QualityReport, PathBuf)> {
    let path = io::resolve_input(&config.quality_search_paths)?;
    let df = io::read_table(&path, config.encoding)?;
    let table = SalesTable::from_frame(&df, date_format::ANY)?;
    let report = assess_quality(&table, now)?;
    write_quality(config, &report)?;
    Ok((report, path))
}

/// Clean, aggregate and assess in one pass. Quality is measured on the
/// cleaned table exactly as written, derived columns included.
pub fn run_all(config: &PipelineConfig, now: NaiveDateTime) -> Result<PipelineOutput> {
    let cleaned = run_clean(config)?;
    let kpis = compute_kpis(&cleaned.table)?;
    let summaries = summarize(&cleaned.table)?;
    write_aggregates(config, &kpis, &summaries)?;

    let quality = assess_quality(&cleaned.table.to_sales_table(), now)?;
    write_quality(config, &quality)?;
    info!(
        rows = cleaned.report.final_rows,
        accuracy = quality.accuracy,
        "Pipeline finished"
    );

    Ok(PipelineOutput {
        cleaned,
        kpis,
        summaries,
        quality,
    })
}

fn write_aggregates(config: &PipelineConfig, kpis: &Kpis, summaries: &Summaries) -> Result<()> {
    for (stem, frame) in summaries.frames() {
        io::write_table(&mut frame.clone(), &config.table_path(stem))?;
    }
    io::write_table(&mut kpis.to_frame()?, &config.table_path("kpis"))
}

fn write_quality(config: &PipelineConfig, report: &QualityReport) -> Result<()> {
    io::write_text(&config.report_path("txt"), &report.summary_text())?;
    io::write_json(&config.report_path("json"), report)
}
