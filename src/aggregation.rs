use polars::prelude::*;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::{CleanedTable, Segment};
use crate::schema::{derived, raw, summary};

/// `numerator / denominator`, or NaN when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}

/// Float division that yields NaN on a zero denominator.
pub(crate) fn safe_div(numerator: Expr, denominator: Expr) -> Expr {
    let denominator = denominator.cast(DataType::Float64);
    when(denominator.clone().eq(lit(0.0)))
        .then(lit(f64::NAN))
        .otherwise(numerator.cast(DataType::Float64) / denominator)
}

/// Distinct non-null values.
fn distinct(column: &str) -> Expr {
    col(column).drop_nulls().n_unique().cast(DataType::Int64)
}

/// Aggregates shared by every summary table.
fn totals() -> Vec<Expr> {
    vec![
        col(raw::SALES).sum().alias(summary::TOTAL_SALES),
        col(raw::PROFIT).sum().alias(summary::TOTAL_PROFIT),
        col(raw::QUANTITY).sum().alias(summary::TOTAL_QUANTITY),
        distinct(raw::ORDER_ID).alias(summary::TOTAL_ORDERS),
    ]
}

fn total_columns() -> [Expr; 4] {
    [
        col(summary::TOTAL_SALES),
        col(summary::TOTAL_PROFIT),
        col(summary::TOTAL_QUANTITY),
        col(summary::TOTAL_ORDERS),
    ]
}

fn profit_margin() -> Expr {
    (safe_div(col(summary::TOTAL_PROFIT), col(summary::TOTAL_SALES)) * lit(100.0))
        .alias(summary::PROFIT_MARGIN)
}

/// Group by `keys` in order of first appearance and aggregate the totals
/// plus `extra`. Rows with a null in any key belong to no group.
fn grouped(lazy: LazyFrame, keys: &[&str], extra: Vec<Expr>) -> LazyFrame {
    let present = keys
        .iter()
        .fold(lit(true), |acc, key| acc.and(col(*key).is_not_null()));
    let mut aggs = totals();
    aggs.extend(extra);
    lazy.filter(present)
        .group_by_stable(keys.iter().map(|key| col(*key)).collect::<Vec<_>>())
        .agg(aggs)
}

/// Sort descending by total sales. Ties keep first-appearance order.
fn by_sales_desc(lazy: LazyFrame) -> LazyFrame {
    lazy.sort(
        [summary::TOTAL_SALES],
        SortMultipleOptions::default()
            .with_order_descending(true)
            .with_maintain_order(true),
    )
}

fn select_with_totals(lazy: LazyFrame, keys: &[&str], tail: Vec<Expr>) -> LazyFrame {
    let mut columns: Vec<Expr> = keys.iter().map(|key| col(*key)).collect();
    columns.extend(total_columns());
    columns.extend(tail);
    lazy.select(columns)
}

/// Sales by calendar month, ascending by "YYYY-MM". Rows without an order
/// date have no month and are left out.
pub fn monthly_summary(table: &CleanedTable) -> Result<DataFrame> {
    let lazy = table.frame().clone().lazy().with_column(
        col(raw::ORDER_DATE)
            .dt()
            .strftime("%Y-%m")
            .alias(summary::YEAR_MONTH),
    );
    let keys = [derived::YEAR, derived::MONTH, derived::MONTH_NAME, summary::YEAR_MONTH];
    let df = grouped(
        lazy,
        &keys,
        vec![
            distinct(raw::CUSTOMER_ID).alias(summary::UNIQUE_CUSTOMERS),
            col(raw::DISCOUNT).mean().alias(summary::AVG_DISCOUNT),
        ],
    )
    .with_column(profit_margin())
    .sort([summary::YEAR_MONTH], SortMultipleOptions::default().with_maintain_order(true))
    .select([
        col(derived::YEAR),
        col(derived::MONTH).alias(summary::MONTH_NUMBER),
        col(derived::MONTH_NAME),
        col(summary::TOTAL_SALES),
        col(summary::TOTAL_PROFIT),
        col(summary::TOTAL_QUANTITY),
        col(summary::TOTAL_ORDERS),
        col(summary::UNIQUE_CUSTOMERS),
        col(summary::AVG_DISCOUNT),
        col(summary::PROFIT_MARGIN),
        col(summary::YEAR_MONTH),
    ])
    .collect()?;
    Ok(df)
}

pub fn category_summary(table: &CleanedTable) -> Result<DataFrame> {
    let keys = [raw::CATEGORY];
    let lazy = grouped(table.frame().clone().lazy(), &keys, Vec::new()).with_columns([
        profit_margin(),
        safe_div(col(summary::TOTAL_SALES), col(summary::TOTAL_ORDERS))
            .alias(summary::AVG_ORDER_VALUE),
    ]);
    let lazy = select_with_totals(
        by_sales_desc(lazy),
        &keys,
        vec![col(summary::PROFIT_MARGIN), col(summary::AVG_ORDER_VALUE)],
    );
    Ok(lazy.collect()?)
}

pub fn product_summary(table: &CleanedTable) -> Result<DataFrame> {
    let keys = [raw::CATEGORY, raw::SUB_CATEGORY];
    let lazy = grouped(table.frame().clone().lazy(), &keys, Vec::new()).with_column(profit_margin());
    let lazy = select_with_totals(by_sales_desc(lazy), &keys, vec![col(summary::PROFIT_MARGIN)]);
    Ok(lazy.collect()?)
}

/// One row per customer. `Segment` and `Customer_Name` come from the
/// customer's first row in table order, even when that value is null.
pub fn customer_summary(table: &CleanedTable) -> Result<DataFrame> {
    let keys = [raw::CUSTOMER_ID];
    let lazy = grouped(
        table.frame().clone().lazy(),
        &keys,
        vec![
            col(raw::SEGMENT).first().alias(raw::SEGMENT),
            col(raw::CUSTOMER_NAME).first().alias(summary::CUSTOMER_NAME),
        ],
    )
    .with_columns([
        Segment::bucket(col(summary::TOTAL_SALES)).alias(summary::VALUE_SEGMENT),
        profit_margin(),
        safe_div(col(summary::TOTAL_PROFIT), col(summary::TOTAL_ORDERS))
            .alias(summary::PROFIT_PER_ORDER),
    ]);
    let lazy = select_with_totals(
        by_sales_desc(lazy),
        &keys,
        vec![
            col(raw::SEGMENT),
            col(summary::CUSTOMER_NAME),
            col(summary::VALUE_SEGMENT),
            col(summary::PROFIT_MARGIN),
            col(summary::PROFIT_PER_ORDER),
        ],
    );
    Ok(lazy.collect()?)
}

pub fn regional_summary(table: &CleanedTable) -> Result<DataFrame> {
    let keys = [raw::REGION, raw::STATE];
    let lazy = grouped(table.frame().clone().lazy(), &keys, Vec::new()).with_column(profit_margin());
    let lazy = select_with_totals(by_sales_desc(lazy), &keys, vec![col(summary::PROFIT_MARGIN)]);
    Ok(lazy.collect()?)
}

// ── All summaries ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Summaries {
    pub monthly: DataFrame,
    pub category: DataFrame,
    pub product: DataFrame,
    pub customer: DataFrame,
    pub regional: DataFrame,
}

impl Summaries {
    /// (file stem, frame) for every table, in output order.
    pub fn frames(&self) -> [(&'static str, &DataFrame); 5] {
        [
            ("monthly_summary", &self.monthly),
            ("category_summary", &self.category),
            ("product_summary", &self.product),
            ("customer_summary", &self.customer),
            ("regional_summary", &self.regional),
        ]
    }
}

pub fn summarize(table: &CleanedTable) -> Result<Summaries> {
    info!(rows = table.len(), "Building summary tables");
    let summaries = Summaries {
        monthly: monthly_summary(table)?,
        category: category_summary(table)?,
        product: product_summary(table)?,
        customer: customer_summary(table)?,
        regional: regional_summary(table)?,
    };
    debug!(
        months = summaries.monthly.height(),
        categories = summaries.category.height(),
        products = summaries.product.height(),
        customers = summaries.customer.height(),
        regions = summaries.regional.height(),
        "Summary tables built"
    );
    Ok(summaries)
}
