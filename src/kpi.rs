use polars::prelude::*;
use tracing::info;

use crate::aggregation::ratio;
use crate::error::Result;
use crate::model::CleanedTable;
use crate::schema::{kpi, raw};

/// How a KPI value should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiKind {
    Amount,
    Percent,
    Count,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub total_revenue: f64,
    pub total_profit: f64,
    pub total_orders: usize,
    pub total_customers: usize,
    pub average_order_value: f64,
    pub average_profit_per_order: f64,
    pub profit_margin: f64,
    pub average_discount: f64,
    pub total_quantity: i64,
    pub customer_ltv: f64,
}

impl Kpis {
    /// Every metric in output order, with its presentation kind.
    pub fn entries(&self) -> [(&'static str, f64, KpiKind); 10] {
        [
            (kpi::TOTAL_REVENUE, self.total_revenue, KpiKind::Amount),
            (kpi::TOTAL_PROFIT, self.total_profit, KpiKind::Amount),
            (kpi::TOTAL_ORDERS, self.total_orders as f64, KpiKind::Count),
            (kpi::TOTAL_CUSTOMERS, self.total_customers as f64, KpiKind::Count),
            (kpi::AVERAGE_ORDER_VALUE, self.average_order_value, KpiKind::Amount),
            (
                kpi::AVERAGE_PROFIT_PER_ORDER,
                self.average_profit_per_order,
                KpiKind::Amount,
            ),
            (kpi::PROFIT_MARGIN, self.profit_margin, KpiKind::Percent),
            (kpi::AVERAGE_DISCOUNT, self.average_discount, KpiKind::Percent),
            (kpi::TOTAL_QUANTITY, self.total_quantity as f64, KpiKind::Count),
            (kpi::CUSTOMER_LTV, self.customer_ltv, KpiKind::Amount),
        ]
    }

    /// One-row KPI table.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let columns = vec![
            Column::new(kpi::TOTAL_REVENUE.into(), [self.total_revenue]),
            Column::new(kpi::TOTAL_PROFIT.into(), [self.total_profit]),
            Column::new(kpi::TOTAL_ORDERS.into(), [self.total_orders as i64]),
            Column::new(kpi::TOTAL_CUSTOMERS.into(), [self.total_customers as i64]),
            Column::new(kpi::AVERAGE_ORDER_VALUE.into(), [self.average_order_value]),
            Column::new(
                kpi::AVERAGE_PROFIT_PER_ORDER.into(),
                [self.average_profit_per_order],
            ),
            Column::new(kpi::PROFIT_MARGIN.into(), [self.profit_margin]),
            Column::new(kpi::AVERAGE_DISCOUNT.into(), [self.average_discount]),
            Column::new(kpi::TOTAL_QUANTITY.into(), [self.total_quantity]),
            Column::new(kpi::CUSTOMER_LTV.into(), [self.customer_ltv]),
        ];
        Ok(DataFrame::new(columns)?)
    }
}

/// Render a KPI value for the console: `$1,234.56`, `12.34%` or `1,235`.
pub fn format_kpi(value: f64, kind: KpiKind) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    match kind {
        KpiKind::Amount => format!("${}", group_thousands(value, 2)),
        KpiKind::Percent => format!("{value:.2}%"),
        KpiKind::Count => group_thousands(value, 0),
    }
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        grouped.insert(0, '-');
    }
    grouped
}

/// Group count column in `group_means` output.
const GROUPS: &str = "groups";

/// Sum `values` per non-null `key` and average the per-key sums. The result
/// is one row: the group count followed by one mean per value column.
fn group_means(lazy: LazyFrame, key: &str, values: &[&str]) -> Result<DataFrame> {
    let sums: Vec<Expr> = values.iter().map(|v| col(*v).sum()).collect();
    let mut means = vec![len().alias(GROUPS)];
    means.extend(values.iter().map(|v| col(*v).mean()));
    let df = lazy
        .filter(col(key).is_not_null())
        .group_by([col(key)])
        .agg(sums)
        .select(means)
        .collect()?;
    Ok(df)
}

/// First value of a one-row column as f64; null reads as NaN.
fn scalar(df: &DataFrame, name: &str) -> Result<f64> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.get(0).unwrap_or(f64::NAN))
}

fn int_scalar(df: &DataFrame, name: &str) -> Result<i64> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.get(0).unwrap_or(0))
}

/// Compute the headline metrics over the whole cleaned dataset.
///
/// Order and customer averages aggregate per order (or customer) first and
/// then average those sums. Ratios with a zero denominator are NaN.
pub fn compute_kpis(table: &CleanedTable) -> Result<Kpis> {
    info!(rows = table.len(), "Calculating KPIs");
    let lazy = table.frame().clone().lazy();

    let totals = lazy
        .clone()
        .select([
            col(raw::SALES).sum().alias(kpi::TOTAL_REVENUE),
            col(raw::PROFIT).sum().alias(kpi::TOTAL_PROFIT),
            col(raw::QUANTITY).sum().alias(kpi::TOTAL_QUANTITY),
            col(raw::DISCOUNT).mean().alias(kpi::AVERAGE_DISCOUNT),
        ])
        .collect()?;
    let orders = group_means(lazy.clone(), raw::ORDER_ID, &[raw::SALES, raw::PROFIT])?;
    let customers = group_means(lazy, raw::CUSTOMER_ID, &[raw::SALES])?;

    let total_revenue = scalar(&totals, kpi::TOTAL_REVENUE)?;
    let total_profit = scalar(&totals, kpi::TOTAL_PROFIT)?;

    Ok(Kpis {
        total_revenue,
        total_profit,
        total_orders: int_scalar(&orders, GROUPS)? as usize,
        total_customers: int_scalar(&customers, GROUPS)? as usize,
        average_order_value: scalar(&orders, raw::SALES)?,
        average_profit_per_order: scalar(&orders, raw::PROFIT)?,
        profit_margin: ratio(total_profit, total_revenue) * 100.0,
        average_discount: scalar(&totals, kpi::AVERAGE_DISCOUNT)? * 100.0,
        total_quantity: int_scalar(&totals, kpi::TOTAL_QUANTITY)?,
        customer_ltv: scalar(&customers, raw::SALES)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::clean;
    use crate::model::tests::{record, table, SaleRow};

    fn kpis_of(rows: Vec<SaleRow>) -> Kpis {
        compute_kpis(&clean(&table(rows)).unwrap().table).unwrap()
    }

    #[test]
    fn two_orders_one_customer() {
        let kpis = kpis_of(vec![
            record("1", "A", 500.0, 2, "1/1/2023"),
            record("2", "A", 600.0, 1, "2/1/2023"),
        ]);

        assert_eq!(kpis.total_revenue, 1_100.0);
        assert_eq!(kpis.total_orders, 2);
        assert_eq!(kpis.total_customers, 1);
        assert_eq!(kpis.customer_ltv, 1_100.0);
        assert_eq!(kpis.average_order_value, 550.0);
        assert_eq!(kpis.total_quantity, 3);
        assert!((kpis.profit_margin - 10.0).abs() < 1e-9);
        assert_eq!(kpis.average_discount, 0.0);
    }

    #[test]
    fn order_value_aggregates_before_averaging() {
        // Three rows but two orders: row mean would be 200, order mean is 300
        let kpis = kpis_of(vec![
            record("1", "A", 100.0, 1, "1/1/2023"),
            record("1", "A", 200.0, 1, "1/1/2023"),
            record("2", "B", 300.0, 1, "1/2/2023"),
        ]);
        assert_eq!(kpis.average_order_value, 300.0);
        assert_eq!(kpis.average_profit_per_order, 30.0);
        assert_eq!(kpis.customer_ltv, 300.0);
    }

    #[test]
    fn empty_table_yields_nan_ratios() {
        let kpis = kpis_of(Vec::new());
        assert_eq!(kpis.total_revenue, 0.0);
        assert_eq!(kpis.total_orders, 0);
        assert!(kpis.profit_margin.is_nan());
        assert!(kpis.average_order_value.is_nan());
        assert!(kpis.customer_ltv.is_nan());
        assert!(kpis.average_discount.is_nan());
    }

    #[test]
    fn entries_and_frame_keep_metric_order() {
        let kpis = kpis_of(vec![record("1", "A", 10.0, 1, "1/1/2023")]);
        let names: Vec<&str> = kpis.entries().iter().map(|(n, _, _)| *n).collect();
        let frame = kpis.to_frame().unwrap();
        assert_eq!(frame.height(), 1);
        assert_eq!(frame.get_column_names_str(), names);
        assert_eq!(names.last(), Some(&"Customer_ltv"));
    }

    #[test]
    fn console_formatting() {
        assert_eq!(format_kpi(1_234_567.891, KpiKind::Amount), "$1,234,567.89");
        assert_eq!(format_kpi(-1_500.0, KpiKind::Amount), "$-1,500.00");
        assert_eq!(format_kpi(12.5, KpiKind::Percent), "12.50%");
        assert_eq!(format_kpi(9_994.0, KpiKind::Count), "9,994");
        assert_eq!(format_kpi(999.0, KpiKind::Count), "999");
        assert_eq!(format_kpi(f64::NAN, KpiKind::Percent), "NaN");
    }
}
