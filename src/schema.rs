/// Column-name constants for the sales dataset and its summary tables.
/// Single source of truth for readers, writers and tests.

// ── Raw input columns ───────────────────────────────────────────────────────
pub mod raw {
    pub const ORDER_ID: &str = "Order ID";
    pub const CUSTOMER_ID: &str = "Customer ID";
    pub const CUSTOMER_NAME: &str = "Customer Name";
    pub const ORDER_DATE: &str = "Order Date";
    pub const SHIP_DATE: &str = "Ship Date";
    pub const SALES: &str = "Sales";
    pub const PROFIT: &str = "Profit";
    pub const QUANTITY: &str = "Quantity";
    pub const DISCOUNT: &str = "Discount";
    pub const CATEGORY: &str = "Category";
    pub const SUB_CATEGORY: &str = "Sub-Category";
    pub const REGION: &str = "Region";
    pub const STATE: &str = "State";
    pub const SEGMENT: &str = "Segment";

    pub const REQUIRED: [&str; 14] = [
        ORDER_ID,
        CUSTOMER_ID,
        CUSTOMER_NAME,
        ORDER_DATE,
        SHIP_DATE,
        SALES,
        PROFIT,
        QUANTITY,
        DISCOUNT,
        CATEGORY,
        SUB_CATEGORY,
        REGION,
        STATE,
        SEGMENT,
    ];
}

// ── Columns added by the cleaner ────────────────────────────────────────────
pub mod derived {
    pub const YEAR: &str = "Year";
    pub const MONTH: &str = "Month";
    pub const MONTH_NAME: &str = "Month_Name";
    pub const QUARTER: &str = "Quarter";
    pub const DAY_OF_WEEK: &str = "Day_of_Week";
    pub const WEEK_NUMBER: &str = "Week_Number";
    pub const DISCOUNT_AMOUNT: &str = "Discount Amount";
    pub const PROFIT_MARGIN: &str = "Profit Margin";
    pub const CUSTOMER_SEGMENT_VALUE: &str = "Customer_Segment_Value";

    pub const ALL: [&str; 9] = [
        YEAR,
        MONTH,
        MONTH_NAME,
        QUARTER,
        DAY_OF_WEEK,
        WEEK_NUMBER,
        DISCOUNT_AMOUNT,
        PROFIT_MARGIN,
        CUSTOMER_SEGMENT_VALUE,
    ];
}

// ── Summary table columns ───────────────────────────────────────────────────
pub mod summary {
    pub const MONTH_NUMBER: &str = "Month_Number";
    pub const TOTAL_SALES: &str = "Total_Sales";
    pub const TOTAL_PROFIT: &str = "Total_Profit";
    pub const TOTAL_QUANTITY: &str = "Total_Quantity";
    pub const TOTAL_ORDERS: &str = "Total_Orders";
    pub const UNIQUE_CUSTOMERS: &str = "Unique_Customers";
    pub const AVG_DISCOUNT: &str = "Avg_Discount";
    pub const PROFIT_MARGIN: &str = "Profit_Margin";
    pub const YEAR_MONTH: &str = "Year_Month";
    pub const AVG_ORDER_VALUE: &str = "Avg_Order_Value";
    pub const CUSTOMER_NAME: &str = "Customer_Name";
    pub const VALUE_SEGMENT: &str = "Value_Segment";
    pub const PROFIT_PER_ORDER: &str = "Profit_per_Order";
}

// ── KPI names ───────────────────────────────────────────────────────────────
pub mod kpi {
    pub const TOTAL_REVENUE: &str = "Total_Revenue";
    pub const TOTAL_PROFIT: &str = "Total_Profit";
    pub const TOTAL_ORDERS: &str = "Total_Orders";
    pub const TOTAL_CUSTOMERS: &str = "Total_Customers";
    pub const AVERAGE_ORDER_VALUE: &str = "Average_Order_Value";
    pub const AVERAGE_PROFIT_PER_ORDER: &str = "Average_Profit_Per_Order";
    pub const PROFIT_MARGIN: &str = "Profit_Margin";
    pub const AVERAGE_DISCOUNT: &str = "Average_Discount";
    pub const TOTAL_QUANTITY: &str = "Total_Quantity";
    pub const CUSTOMER_LTV: &str = "Customer_ltv";
}

// ── Date formats ────────────────────────────────────────────────────────────
pub mod date_format {
    /// Month/day/year as found in raw exports.
    pub const RAW: &str = "%m/%d/%Y";
    /// ISO dates as written to the cleaned dataset.
    pub const ISO: &str = "%Y-%m-%d";

    pub const RAW_ONLY: &[&str] = &[RAW];
    pub const CLEANED_ONLY: &[&str] = &[ISO];
    pub const ANY: &[&str] = &[RAW, ISO];
}
