use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use sales_insights::cleaning::Cleaned;
use sales_insights::config::PipelineConfig;
use sales_insights::kpi::{format_kpi, Kpis};
use sales_insights::pipeline;

mod logging;

#[derive(Parser)]
#[command(name = "sales-insights")]
#[command(about = "Clean, aggregate and quality-check retail sales exports")]
#[command(version)]
struct Cli {
    /// TOML file with pipeline paths and options
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the raw export into the cleaned dataset
    Clean {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Compute KPIs and summary tables from the cleaned dataset
    Aggregate {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write the data quality report
    Quality {
        /// Skip the fallback search and assess this file
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Clean, aggregate and assess in one pass
    Run,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let now = chrono::Local::now().naive_local();

    match cli.command {
        Commands::Clean { input, output } => {
            if let Some(input) = input {
                config.raw_path = input;
            }
            if let Some(output) = output {
                config.cleaned_path = output;
            }
            let cleaned = pipeline::run_clean(&config).context("cleaning failed")?;
            print_cleaning(&cleaned);
            println!("\nCleaned data saved to {}", config.cleaned_path.display());
        }
        Commands::Aggregate { input, output_dir } => {
            if let Some(input) = input {
                config.cleaned_path = input;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            let (kpis, summaries) = pipeline::run_aggregate(&config).context("aggregation failed")?;
            print_kpis(&kpis);
            println!(
                "\nSummaries written to {} ({} months, {} customers)",
                config.output_dir.display(),
                summaries.monthly.height(),
                summaries.customer.height()
            );
        }
        Commands::Quality { input } => {
            if let Some(input) = input {
                config.quality_search_paths = vec![input];
            }
            let (report, path) = pipeline::run_quality(&config, now).context("quality check failed")?;
            info!(path = %path.display(), "Quality report computed");
            print!("{}", report.render());
        }
        Commands::Run => {
            let output = pipeline::run_all(&config, now).context("pipeline failed")?;
            print_cleaning(&output.cleaned);
            print_kpis(&output.kpis);
            print!("{}", output.quality.render());
        }
    }

    Ok(())
}

fn print_cleaning(cleaned: &Cleaned) {
    let r = &cleaned.report;
    println!("\nCleaning summary:");
    println!("  Initial rows:      {}", r.initial_rows);
    println!("  Null rows removed: {}", r.null_rows);
    println!("  Duplicates:        {}", r.duplicate_rows);
    println!("  Non-positive:      {}", r.non_positive_rows);
    println!("  Final rows:        {}", r.final_rows);
    println!("  Retention:         {:.2}%", r.retention_pct);

    let sample = cleaned.table.frame().head(Some(5));
    println!("\nSample of cleaned data:\n{sample}");
}

fn print_kpis(kpis: &Kpis) {
    println!("\nKey performance indicators:");
    for (name, value, kind) in kpis.entries() {
        println!("  {:<26} {}", name, format_kpi(value, kind));
    }
}
