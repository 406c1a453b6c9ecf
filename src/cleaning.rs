use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, SalesError};
use crate::model::{CleanedTable, SalesTable, Segment};
use crate::schema::{derived, raw};

/// Row accounting for one cleaning run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningReport {
    pub initial_rows: usize,
    /// Rows with null sales, profit or quantity.
    pub null_rows: usize,
    pub duplicate_rows: usize,
    /// Rows with sales <= 0 or quantity <= 0.
    pub non_positive_rows: usize,
    pub final_rows: usize,
    pub removed_rows: usize,
    /// final / initial * 100; 0.0 for an empty input.
    pub retention_pct: f64,
}

#[derive(Debug, Clone)]
pub struct Cleaned {
    pub table: CleanedTable,
    pub report: CleaningReport,
}

/// Calendar parts, discount amount and profit margin, in `derived::ALL` order.
fn derived_columns() -> [Expr; 8] {
    let date = || col(raw::ORDER_DATE).dt();
    [
        date().year().alias(derived::YEAR),
        date().month().cast(DataType::Int32).alias(derived::MONTH),
        date().strftime("%B").alias(derived::MONTH_NAME),
        date().quarter().cast(DataType::Int32).alias(derived::QUARTER),
        date().strftime("%A").alias(derived::DAY_OF_WEEK),
        // ISO 8601 week of year
        date().week().cast(DataType::Int32).alias(derived::WEEK_NUMBER),
        (col(raw::SALES) * col(raw::DISCOUNT)).alias(derived::DISCOUNT_AMOUNT),
        (col(raw::PROFIT) / col(raw::SALES) * lit(100.0)).alias(derived::PROFIT_MARGIN),
    ]
}

/// Bucket every row by its customer's lifetime sales over the rows present.
/// Rows without a customer id get no segment.
fn with_customer_segments(lazy: LazyFrame) -> LazyFrame {
    let lifetime = col(raw::SALES).sum().over([col(raw::CUSTOMER_ID)]);
    lazy.with_column(
        when(col(raw::CUSTOMER_ID).is_null())
            .then(lit(NULL).cast(DataType::String))
            .otherwise(Segment::bucket(lifetime))
            .alias(derived::CUSTOMER_SEGMENT_VALUE),
    )
}

fn complete_numerics() -> Expr {
    col(raw::SALES)
        .is_not_null()
        .and(col(raw::PROFIT).is_not_null())
        .and(col(raw::QUANTITY).is_not_null())
}

/// Clean a loaded sales table.
///
/// Dates were already parsed when the table was loaded. The remaining steps
/// run in order: drop rows with null numerics, drop exact duplicates (first
/// occurrence kept), derive fields, drop non-positive sales or quantity, then
/// bucket each row's customer by lifetime sales over the surviving rows.
///
/// Input columns named like derived columns are rejected.
pub fn clean(table: &SalesTable) -> Result<Cleaned> {
    let df = table.frame();
    if let Some(name) = df
        .get_column_names_str()
        .into_iter()
        .find(|c| derived::ALL.contains(c))
    {
        return Err(SalesError::ReservedColumn(name.to_string()));
    }

    let initial_rows = df.height();
    info!(rows = initial_rows, "Starting cleaning");
    if initial_rows == 0 {
        warn!("Input table has no rows");
    }

    let complete = df.clone().lazy().filter(complete_numerics()).collect()?;
    let null_rows = initial_rows - complete.height();
    debug!(dropped = null_rows, "Dropped rows with null sales, profit or quantity");

    let unique = complete
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;
    let duplicate_rows = initial_rows - null_rows - unique.height();
    debug!(dropped = duplicate_rows, "Dropped duplicate rows");

    let before_positive = unique.height();
    let positive = unique
        .lazy()
        .with_columns(derived_columns())
        .filter(col(raw::SALES).gt(lit(0.0)).and(col(raw::QUANTITY).gt(lit(0))))
        .collect()?;
    let non_positive_rows = before_positive - positive.height();
    debug!(dropped = non_positive_rows, "Dropped rows with non-positive sales or quantity");

    let df = with_customer_segments(positive.lazy()).collect()?;

    let final_rows = df.height();
    let removed_rows = initial_rows - final_rows;
    let retention_pct = if initial_rows == 0 {
        0.0
    } else {
        final_rows as f64 / initial_rows as f64 * 100.0
    };
    info!(final_rows, removed_rows, retention_pct, "Cleaning completed");

    Ok(Cleaned {
        table: CleanedTable { df },
        report: CleaningReport {
            initial_rows,
            null_rows,
            duplicate_rows,
            non_positive_rows,
            final_rows,
            removed_rows,
            retention_pct,
        },
    })
}

/// Rebuild a cleaned table from a reloaded cleaned dataset.
///
/// Derived columns in the file are dropped and recomputed from the input
/// columns. Null sales, profit or quantity means the file was not produced
/// by `clean` and is rejected.
pub fn restore(table: SalesTable) -> Result<CleanedTable> {
    let df = table.df.drop_many(derived::ALL);
    for column in [raw::SALES, raw::PROFIT, raw::QUANTITY] {
        let nulls = df.column(column)?.is_null();
        if let Some(row) = nulls.into_iter().position(|v| v == Some(true)) {
            return Err(SalesError::parse(
                column,
                row,
                "",
                "cleaned data must not contain null values",
            ));
        };
    }

    let df = with_customer_segments(df.lazy().with_columns(derived_columns())).collect()?;
    Ok(CleanedTable { df })
}
