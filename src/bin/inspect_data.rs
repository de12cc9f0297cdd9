//! Print a summary of a calwater data directory.
//!
//! Loads every dataset, then prints row counts, the columns of each table, the
//! water quality statistics and one sample county. Exits non-zero if any
//! dataset fails to load.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use calwater::config::DataConfig;
use calwater::records::Record;
use calwater::stats::Summary;
use calwater::{init_tracing, log_timed_operation, service, Dataset, DatasetKind};

#[derive(Parser, Debug)]
#[command(name = "inspect_data", about = "Inspect a calwater data directory")]
struct Args {
    /// Directory containing the data files
    #[arg(default_value = "data")]
    data_dir: PathBuf,

    /// County to show as a sample
    #[arg(long, default_value = "Alameda")]
    county: String,
}

fn print_columns<R: Record>(label: &str, rows: &[R]) {
    match rows.first() {
        Some(row) => println!("  {}: {}", label, row.field_names().join(", ")),
        None => println!("  {}: (empty)", label),
    }
}

fn print_summary(label: &str, summary: &Summary) {
    println!(
        "  {:<24} n={:<4} mean={:.3} median={:.3} min={:.3} max={:.3} stddev={:.3}",
        label,
        summary.count,
        summary.mean,
        summary.median,
        summary.min,
        summary.max,
        summary.stddev
    );
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing("warn");

    println!("Inspecting data directory: {}", args.data_dir.display());
    let dataset = log_timed_operation("inspect_load", || {
        Dataset::load_all(DataConfig::with_data_dir(&args.data_dir))
    })
    .with_context(|| format!("failed to load datasets from {}", args.data_dir.display()))?;

    println!("\n=== ROW COUNTS ===");
    for kind in DatasetKind::ALL {
        let rows = dataset.load(kind)?;
        let unit = if kind == DatasetKind::CountyBoundaries {
            "features"
        } else {
            "rows"
        };
        println!("  {:<20} {} {}", kind, rows, unit);
    }

    println!("\n=== COLUMNS ===");
    print_columns("population", dataset.population()?);
    print_columns("water_quality", dataset.water_quality()?);
    print_columns("treatment_plants", dataset.treatment_plants()?);

    println!("\n=== WATER QUALITY STATISTICS ===");
    let stats = service::water_quality_statistics(&dataset)?;
    print_summary("lead_avg_ug_per_L", &stats.lead);
    print_summary("arsenic_avg_ug_per_L", &stats.arsenic);
    print_summary("nitrate_avg_mg_per_L", &stats.nitrate);

    println!("\n=== SAMPLE COUNTY ===");
    match service::get_county(&dataset, &args.county)? {
        Some(county) => println!("{}", serde_json::to_string_pretty(&county)?),
        None => println!("  {} not found in the merged county table", args.county),
    }

    Ok(())
}
