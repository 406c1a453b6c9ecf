use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use polars::prelude::*;

use crate::error::{Result, SalesError};
use crate::schema::{derived, raw};

// ── Segment tiers ───────────────────────────────────────────────────────────

/// Customer value tier derived from cumulative sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Low,
    Medium,
    High,
    Vip,
}

impl Segment {
    /// Exclusive upper bound per tier, evaluated in order. The lowest tier
    /// starts at 0 inclusive.
    const TIERS: [(f64, Segment); 4] = [
        (1_000.0, Segment::Low),
        (5_000.0, Segment::Medium),
        (10_000.0, Segment::High),
        (f64::INFINITY, Segment::Vip),
    ];

    pub fn label(self) -> &'static str {
        match self {
            Segment::Low => "Low",
            Segment::Medium => "Medium",
            Segment::High => "High",
            Segment::Vip => "VIP",
        }
    }

    /// String expression bucketing a sales total into its tier label.
    /// Negative and null totals fall outside every tier.
    pub fn bucket(total: Expr) -> Expr {
        let none = || lit(NULL).cast(DataType::String);
        let tiers = Self::TIERS
            .iter()
            .rev()
            .fold(none(), |otherwise, (upper, segment)| {
                let within = if upper.is_infinite() {
                    total.clone().is_not_null()
                } else {
                    total.clone().lt(lit(*upper))
                };
                when(within).then(lit(segment.label())).otherwise(otherwise)
            });
        when(total.lt(lit(0.0))).then(none()).otherwise(tiers)
    }
}

// ── Tables ──────────────────────────────────────────────────────────────────

/// A loaded sales table with typed required columns.
///
/// Text columns are String, dates are Date, `Sales`/`Profit`/`Discount` are
/// Float64 and `Quantity` is Int64. Every other input column is kept as
/// String in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesTable {
    pub(crate) df: DataFrame,
}

impl SalesTable {
    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Type a frame of text columns.
    ///
    /// Required columns: see `schema::raw::REQUIRED`.
    /// Dates must match one of `date_formats` (tried in order); null tokens
    /// are null. Every column is kept, including ones named like derived
    /// columns, so quality checks see the file as it was written.
    pub fn from_frame(df: &DataFrame, date_formats: &[&str]) -> Result<Self> {
        require_columns(df, &raw::REQUIRED)?;
        let columns = df
            .get_columns()
            .iter()
            .map(|c| typed_column(c, date_formats))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            df: DataFrame::new(columns)?,
        })
    }
}

/// The cleaner's output: input columns in input order followed by
/// `derived::ALL`. Calendar parts are Int32.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTable {
    pub(crate) df: DataFrame,
}

impl CleanedTable {
    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// The full cleaned frame. Dates are written as ISO `YYYY-MM-DD`.
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// The cleaned frame as a loaded table, derived columns included.
    pub fn to_sales_table(&self) -> SalesTable {
        SalesTable {
            df: self.df.clone(),
        }
    }

    /// The input columns only, ready to be cleaned again.
    pub fn input_table(&self) -> SalesTable {
        SalesTable {
            df: self.df.drop_many(derived::ALL),
        }
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

pub(crate) fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(SalesError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

fn epoch() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

/// Days since 1970-01-01, the physical value of a polars Date.
pub(crate) fn epoch_days(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

pub(crate) fn from_epoch_days(days: i32) -> Option<NaiveDate> {
    epoch().checked_add_signed(TimeDelta::days(days.into()))
}

/// Parse one text column into its schema type, reporting the first bad cell
/// with its row.
fn typed_column(column: &Column, date_formats: &[&str]) -> Result<Column> {
    let name = column.name().as_str();
    let text = column.cast(&DataType::String)?;
    let cells = text.str()?;

    let typed = match name {
        raw::ORDER_DATE | raw::SHIP_DATE => {
            let days = cells
                .into_iter()
                .enumerate()
                .map(|(row, v)| Ok(parse_date(name, row, v, date_formats)?.map(epoch_days)))
                .collect::<Result<Vec<Option<i32>>>>()?;
            Column::new(name.into(), days).cast(&DataType::Date)?
        }
        raw::SALES | raw::PROFIT | raw::DISCOUNT => {
            let values = cells
                .into_iter()
                .enumerate()
                .map(|(row, v)| parse_float(name, row, v))
                .collect::<Result<Vec<Option<f64>>>>()?;
            Column::new(name.into(), values)
        }
        raw::QUANTITY => {
            let values = cells
                .into_iter()
                .enumerate()
                .map(|(row, v)| parse_quantity(row, v))
                .collect::<Result<Vec<Option<i64>>>>()?;
            Column::new(name.into(), values)
        }
        _ => Column::new(
            name.into(),
            cells
                .into_iter()
                .map(|v| cell(v).map(str::to_string))
                .collect::<Vec<Option<String>>>(),
        ),
    };
    Ok(typed)
}

/// Cell texts read as null, matching common CSV exports.
const NULL_TOKENS: [&str; 12] = [
    "", "#N/A", "#NA", "<NA>", "N/A", "n/a", "NA", "NULL", "null", "NaN", "nan", "None",
];

fn cell(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !NULL_TOKENS.contains(&s.trim()))
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    cell(value).map(|s| s.trim_matches([' ', '\t', '\r', '\n']))
}

fn parse_date(
    column: &str,
    row: usize,
    value: Option<&str>,
    formats: &[&str],
) -> Result<Option<NaiveDate>> {
    let Some(text) = trimmed(value) else {
        return Ok(None);
    };
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(Some)
        .ok_or_else(|| {
            SalesError::parse(
                column,
                row,
                text,
                format!("expected a date in format {}", formats.join(" or ")),
            )
        })
}

fn parse_float(column: &str, row: usize, value: Option<&str>) -> Result<Option<f64>> {
    let Some(text) = trimmed(value) else {
        return Ok(None);
    };
    text.parse::<f64>()
        .map(Some)
        .map_err(|e| SalesError::parse(column, row, text, e.to_string()))
}

fn parse_quantity(row: usize, value: Option<&str>) -> Result<Option<i64>> {
    let Some(text) = trimmed(value) else {
        return Ok(None);
    };
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Some(n));
    }
    match text.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f.is_finite() => Ok(Some(f as i64)),
        Ok(_) => Err(SalesError::parse(raw::QUANTITY, row, text, "quantity must be a whole number")),
        Err(e) => Err(SalesError::parse(raw::QUANTITY, row, text, e.to_string())),
    }
}
