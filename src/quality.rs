use std::fmt::Write as _;

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregation::ratio;
use crate::error::Result;
use crate::model::{epoch_days, from_epoch_days, SalesTable};
use crate::schema::raw;

const IQR_FENCE: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    Excellent,
    Good,
    NeedsImprovement,
}

impl QualityBand {
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 98.0 {
            QualityBand::Excellent
        } else if accuracy >= 95.0 {
            QualityBand::Good
        } else {
            QualityBand::NeedsImprovement
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityBand::Excellent => "excellent",
            QualityBand::Good => "good",
            QualityBand::NeedsImprovement => "needs improvement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub rows: usize,
    pub columns: usize,
    /// Estimated in-memory size of the loaded frame.
    pub memory_bytes: usize,
    pub first_order_date: Option<NaiveDate>,
    pub last_order_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingValues {
    pub column: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validity {
    pub negative_sales: usize,
    pub negative_quantity: usize,
    /// Discount above 1.0 (more than 100%).
    pub high_discount: usize,
    /// Order dates after the report time. Depends on when the report runs.
    pub future_dates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outliers {
    pub column: &'static str,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub count: usize,
    pub percentage: f64,
}

/// Descriptive statistics over the non-null values of a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: &'static str,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1).
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub generated_at: NaiveDateTime,
    pub overview: Overview,
    pub missing: Vec<MissingValues>,
    pub duplicate_rows: usize,
    pub duplicate_pct: f64,
    pub validity: Validity,
    pub outliers: Vec<Outliers>,
    /// Share of rows free of issues. Issue counts overlap and are summed as-is.
    pub accuracy: f64,
    pub band: QualityBand,
    pub statistics: Vec<ColumnStats>,
}

/// Descriptive statistics of one numeric column, nulls skipped.
pub fn describe(df: &DataFrame, column: &'static str) -> Result<ColumnStats> {
    let x = || col(column).cast(DataType::Float64);
    let quantile = |q: f64| x().quantile(lit(q), QuantileMethod::Linear);
    let stats = df
        .clone()
        .lazy()
        .select([
            x().count().alias("count"),
            x().mean().alias("mean"),
            x().std(1).alias("std"),
            x().min().alias("min"),
            quantile(0.25).alias("q1"),
            quantile(0.5).alias("median"),
            quantile(0.75).alias("q3"),
            x().max().alias("max"),
        ])
        .collect()?;
    let value = |name: &str| -> Result<f64> {
        let column = stats.column(name)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.get(0).unwrap_or(f64::NAN))
    };
    Ok(ColumnStats {
        column,
        count: value("count")? as usize,
        mean: value("mean")?,
        std: value("std")?,
        min: value("min")?,
        q1: value("q1")?,
        median: value("median")?,
        q3: value("q3")?,
        max: value("max")?,
    })
}

/// Tukey fences: outside [Q1 - 1.5 IQR, Q3 + 1.5 IQR]. Percentage is over
/// the full table height.
pub fn outliers(df: &DataFrame, column: &'static str) -> Result<Outliers> {
    let stats = describe(df, column)?;
    let iqr = stats.q3 - stats.q1;
    let lower_fence = stats.q1 - IQR_FENCE * iqr;
    let upper_fence = stats.q3 + IQR_FENCE * iqr;

    let count = if stats.count == 0 {
        0
    } else {
        let x = col(column).cast(DataType::Float64);
        let flagged = df
            .clone()
            .lazy()
            .select([x
                .clone()
                .lt(lit(lower_fence))
                .or(x.gt(lit(upper_fence)))
                .sum()
                .alias("count")])
            .collect()?;
        count_of(&flagged, "count")?
    };
    Ok(Outliers {
        column,
        lower_fence,
        upper_fence,
        count,
        percentage: ratio(count as f64, df.height() as f64) * 100.0,
    })
}

fn count_of(df: &DataFrame, name: &str) -> Result<usize> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.get(0).unwrap_or(0) as usize)
}

/// Null counts for every column of the frame, in column order.
fn missing_values(df: &DataFrame) -> Vec<MissingValues> {
    df.get_columns()
        .iter()
        .filter_map(|c| {
            let count = c.null_count();
            (count > 0).then(|| MissingValues {
                column: c.name().to_string(),
                count,
                percentage: ratio(count as f64, df.height() as f64) * 100.0,
            })
        })
        .collect()
}

fn order_date_range(df: &DataFrame) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let days = col(raw::ORDER_DATE).cast(DataType::Int32);
    let range = df
        .clone()
        .lazy()
        .select([days.clone().min().alias("first"), days.max().alias("last")])
        .collect()?;
    let day = |name: &str| -> Result<Option<NaiveDate>> {
        Ok(range.column(name)?.i32()?.get(0).and_then(from_epoch_days))
    };
    Ok((day("first")?, day("last")?))
}

fn check_validity(df: &DataFrame, now: NaiveDateTime) -> Result<Validity> {
    // A date is later than `now` exactly when its day is later than today.
    let today = epoch_days(now.date());
    let checks = df
        .clone()
        .lazy()
        .select([
            col(raw::SALES).lt(lit(0.0)).sum().alias("negative_sales"),
            col(raw::QUANTITY).lt(lit(0)).sum().alias("negative_quantity"),
            col(raw::DISCOUNT).gt(lit(1.0)).sum().alias("high_discount"),
            col(raw::ORDER_DATE)
                .cast(DataType::Int32)
                .gt(lit(today))
                .sum()
                .alias("future_dates"),
        ])
        .collect()?;
    Ok(Validity {
        negative_sales: count_of(&checks, "negative_sales")?,
        negative_quantity: count_of(&checks, "negative_quantity")?,
        high_discount: count_of(&checks, "high_discount")?,
        future_dates: count_of(&checks, "future_dates")?,
    })
}

/// Assess a raw or cleaned table as loaded, every column included.
///
/// `now` is the report time; order dates later than it count as invalid, so
/// the result is not reproducible across runs for data near the present.
pub fn assess_quality(table: &SalesTable, now: NaiveDateTime) -> Result<QualityReport> {
    let df = table.frame();
    let n = df.height();
    info!(rows = n, "Generating data quality report");
    if n == 0 {
        warn!("Quality report requested for an empty table");
    }

    let (first_order_date, last_order_date) = order_date_range(df)?;
    let overview = Overview {
        rows: n,
        columns: df.width(),
        memory_bytes: df.estimated_size(),
        first_order_date,
        last_order_date,
    };

    let unique = df
        .clone()
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;
    let duplicate_rows = n - unique.height();
    let validity = check_validity(df, now)?;

    let total_issues = validity.negative_sales
        + validity.negative_quantity
        + validity.high_discount
        + validity.future_dates
        + duplicate_rows;
    let accuracy = ratio(n as f64 - total_issues as f64, n as f64) * 100.0;
    let band = QualityBand::from_accuracy(accuracy);
    info!(accuracy, band = band.label(), "Quality assessment completed");

    Ok(QualityReport {
        generated_at: now,
        overview,
        missing: missing_values(df),
        duplicate_rows,
        duplicate_pct: ratio(duplicate_rows as f64, n as f64) * 100.0,
        validity,
        outliers: vec![
            outliers(df, raw::SALES)?,
            outliers(df, raw::PROFIT)?,
            outliers(df, raw::QUANTITY)?,
        ],
        accuracy,
        band,
        statistics: vec![
            describe(df, raw::SALES)?,
            describe(df, raw::PROFIT)?,
            describe(df, raw::QUANTITY)?,
            describe(df, raw::DISCOUNT)?,
        ],
    })
}

fn rule(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{title}\n{}", "-".repeat(60));
}

fn date_or_dash(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}

impl QualityReport {
    /// Short text artifact: timestamp and overall accuracy.
    pub fn summary_text(&self) -> String {
        format!(
            "Data Quality Report\nGenerated: {}\nOverall Accuracy: {:.2}%\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.accuracy
        )
    }

    /// Full console rendering of every section.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}\nDATA QUALITY REPORT\n{}", "=".repeat(60), "=".repeat(60));

        rule(&mut out, "1. DATASET OVERVIEW");
        let o = &self.overview;
        let _ = writeln!(out, "Total Rows: {}", o.rows);
        let _ = writeln!(out, "Total Columns: {}", o.columns);
        let _ = writeln!(out, "Memory Usage: {:.2} MB", o.memory_bytes as f64 / 1024f64.powi(2));
        let _ = writeln!(
            out,
            "Date Range: {} to {}",
            date_or_dash(o.first_order_date),
            date_or_dash(o.last_order_date)
        );

        rule(&mut out, "2. MISSING VALUES ANALYSIS");
        if self.missing.is_empty() {
            let _ = writeln!(out, "No missing values found");
        }
        for m in &self.missing {
            let _ = writeln!(out, "{}: {} ({:.2}%)", m.column, m.count, m.percentage);
        }

        rule(&mut out, "3. DUPLICATE RECORDS");
        let _ = writeln!(
            out,
            "Duplicate Rows: {} ({:.2}%)",
            self.duplicate_rows, self.duplicate_pct
        );

        rule(&mut out, "4. DATA VALIDITY CHECKS");
        let v = &self.validity;
        let _ = writeln!(out, "Negative Sales Records: {}", v.negative_sales);
        let _ = writeln!(out, "Negative Quantity Records: {}", v.negative_quantity);
        let _ = writeln!(out, "Discounts > 100%: {}", v.high_discount);
        let _ = writeln!(out, "Future Order Dates: {}", v.future_dates);

        rule(&mut out, "5. STATISTICAL OUTLIERS (IQR method)");
        for x in &self.outliers {
            let _ = writeln!(out, "{} Outliers: {} ({:.2}%)", x.column, x.count, x.percentage);
        }

        rule(&mut out, "6. OVERALL DATA ACCURACY");
        let _ = writeln!(out, "Data Accuracy Score: {:.2}%", self.accuracy);
        let _ = writeln!(out, "Data quality: {}", self.band.label());

        rule(&mut out, "7. NUMERICAL COLUMNS STATISTICS");
        let _ = writeln!(
            out,
            "{:<10} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        );
        for s in &self.statistics {
            let _ = writeln!(
                out,
                "{:<10} {:>8} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                s.column, s.count, s.mean, s.std, s.min, s.q1, s.median, s.q3, s.max
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::clean;
    use crate::model::tests::{record, table};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn values(name: &str, values: &[Option<f64>]) -> DataFrame {
        DataFrame::new(vec![Column::new(name.into(), values.to_vec())]).unwrap()
    }

    #[test]
    fn quartiles_interpolate_linearly() {
        let df = values(raw::SALES, &[Some(4.0), Some(1.0), Some(3.0), Some(2.0)]);
        let s = describe(&df, raw::SALES).unwrap();
        assert_eq!(s.q1, 1.75);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.q3, 3.25);

        let single = describe(&values(raw::SALES, &[Some(7.0)]), raw::SALES).unwrap();
        assert_eq!(single.q1, 7.0);
        let empty = describe(&values(raw::SALES, &[]), raw::SALES).unwrap();
        assert_eq!(empty.count, 0);
        assert!(empty.median.is_nan());
    }

    #[test]
    fn tukey_fences_flag_extremes() {
        let df = values(
            raw::SALES,
            &[Some(1.0), Some(2.0), None, Some(3.0), Some(4.0), Some(100.0), None, Some(-50.0)],
        );
        let o = outliers(&df, raw::SALES).unwrap();
        // Q1 = 1.25, Q3 = 3.75, IQR = 2.5
        assert_eq!(o.lower_fence, -2.5);
        assert_eq!(o.upper_fence, 7.5);
        assert_eq!(o.count, 2);
        // over all 8 rows, nulls included
        assert_eq!(o.percentage, 25.0);
    }

    #[test]
    fn describe_matches_sample_statistics() {
        let df = values(
            raw::PROFIT,
            &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].map(Some),
        );
        let s = describe(&df, raw::PROFIT).unwrap();
        assert_eq!(s.count, 8);
        assert_eq!(s.mean, 5.0);
        assert!((s.std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.median, 4.5);
        assert_eq!(s.max, 9.0);

        let single = describe(&values(raw::PROFIT, &[Some(3.0)]), raw::PROFIT).unwrap();
        assert!(single.std.is_nan());
    }

    #[test]
    fn bands() {
        assert_eq!(QualityBand::from_accuracy(100.0), QualityBand::Excellent);
        assert_eq!(QualityBand::from_accuracy(98.0), QualityBand::Excellent);
        assert_eq!(QualityBand::from_accuracy(97.99), QualityBand::Good);
        assert_eq!(QualityBand::from_accuracy(95.0), QualityBand::Good);
        assert_eq!(QualityBand::from_accuracy(94.9), QualityBand::NeedsImprovement);
        assert_eq!(QualityBand::from_accuracy(f64::NAN), QualityBand::NeedsImprovement);
    }

    #[test]
    fn raw_issues_are_counted_and_summed() {
        let mut high_discount = record("3", "C", 10.0, 1, "1/3/2023");
        high_discount.discount = Some(1.5);
        let mut no_region = record("4", "D", 10.0, 1, "1/4/2023");
        no_region.region = None;

        let input = table(vec![
            record("1", "A", 100.0, 1, "1/1/2023"),
            record("2", "B", -5.0, -1, "1/2/2023"),
            record("2", "B", -5.0, -1, "1/2/2023"),
            high_discount,
            no_region,
            record("5", "E", 20.0, 1, "12/25/2030"),
            record("6", "F", 30.0, 2, "6/1/2024"),
            record("7", "G", 40.0, 1, "5/31/2024"),
            record("8", "H", 50.0, 1, "2/2/2023"),
            record("9", "I", 60.0, 1, "2/3/2023"),
        ]);
        let report = assess_quality(&input, now()).unwrap();

        assert_eq!(report.overview.rows, 10);
        assert_eq!(report.overview.columns, 14);
        assert!(report.overview.memory_bytes > 0);
        assert_eq!(report.overview.first_order_date, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(report.overview.last_order_date, NaiveDate::from_ymd_opt(2030, 12, 25));

        assert_eq!(report.duplicate_rows, 1);
        assert_eq!(report.validity.negative_sales, 2);
        assert_eq!(report.validity.negative_quantity, 2);
        assert_eq!(report.validity.high_discount, 1);
        // 6/1/2024 at midnight is before noon on the same day
        assert_eq!(report.validity.future_dates, 1);

        // 2 + 2 + 1 + 1 + 1 overlapping issues over 10 rows
        assert!((report.accuracy - 30.0).abs() < 1e-9);
        assert_eq!(report.band, QualityBand::NeedsImprovement);

        assert_eq!(
            report.missing,
            vec![MissingValues {
                column: raw::REGION.to_string(),
                count: 1,
                percentage: 10.0,
            }]
        );
        assert_eq!(report.statistics[0].count, 10);
    }

    #[test]
    fn cleaned_table_scores_excellent() {
        let raw_table = table(vec![
            record("1", "A", 100.0, 1, "1/1/2023"),
            record("1", "A", 100.0, 1, "1/1/2023"),
            record("2", "B", -5.0, 1, "1/2/2023"),
            record("3", "C", 30.0, 2, "1/3/2023"),
        ]);
        let cleaned = clean(&raw_table).unwrap().table.to_sales_table();
        let report = assess_quality(&cleaned, now()).unwrap();
        assert_eq!(report.overview.rows, 2);
        assert_eq!(report.overview.columns, 23);
        assert_eq!(report.accuracy, 100.0);
        assert_eq!(report.band, QualityBand::Excellent);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn derived_columns_count_toward_missing_values() {
        let mut anonymous = record("1", "A", 100.0, 1, "1/1/2023");
        anonymous.customer_id = None;
        anonymous.discount = None;
        let cleaned = clean(&table(vec![anonymous])).unwrap().table.to_sales_table();
        let report = assess_quality(&cleaned, now()).unwrap();

        let missing: Vec<&str> = report.missing.iter().map(|m| m.column.as_str()).collect();
        assert_eq!(
            missing,
            vec![
                raw::CUSTOMER_ID,
                raw::DISCOUNT,
                "Discount Amount",
                "Customer_Segment_Value"
            ]
        );
    }

    #[test]
    fn empty_table_has_nan_accuracy() {
        let report = assess_quality(&table(Vec::new()), now()).unwrap();
        assert!(report.accuracy.is_nan());
        assert_eq!(report.band, QualityBand::NeedsImprovement);
        assert_eq!(report.outliers[0].count, 0);
        assert_eq!(report.overview.first_order_date, None);
    }

    #[test]
    fn summary_text_layout() {
        let report =
            assess_quality(&table(vec![record("1", "A", 100.0, 1, "1/1/2023")]), now()).unwrap();
        assert_eq!(
            report.summary_text(),
            "Data Quality Report\nGenerated: 2024-06-01 12:00:00.000000\nOverall Accuracy: 100.00%\n"
        );
        assert!(report.render().contains("Negative Sales Records: 0"));
    }
}
