//! Retail sales analytics: clean a raw sales export, aggregate it into KPIs
//! and summary tables, and score its data quality.

pub mod aggregation;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod io;
pub mod kpi;
pub mod model;
pub mod pipeline;
pub mod quality;
pub mod schema;

pub use cleaning::{clean, Cleaned, CleaningReport};
pub use config::PipelineConfig;
pub use error::{Result, SalesError};
pub use model::{CleanedTable, SalesTable, Segment};
pub use pipeline::{run_aggregate, run_all, run_clean, run_quality, PipelineOutput};
