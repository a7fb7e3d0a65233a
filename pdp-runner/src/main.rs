// PDP Runner - Command-line runner for the PDP pipeline
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # PDP Runner
//!
//! Generates synthetic events, runs the star-schema transformation and
//! writes the analytics reports. Tables live as CSV files in a data
//! directory.
//!
//! ## Usage
//!
//! ```bash
//! # Generate 10k raw events into ./data
//! pdp generate --data data --rows 10000 --parallel
//!
//! # Build staging, dimensions and facts
//! pdp run --data data --mode full
//!
//! # Add a later batch and load only what is new
//! pdp generate --data data --rows 500 --start 2025-01-01 --end 2025-01-02 --append
//! pdp run --data data --mode incremental
//!
//! # Write every report to ./data/reports
//! pdp report --data data
//! ```

mod config;
mod error;
mod report;
mod store;

use clap::{Parser, Subcommand, ValueEnum};
use config::{parse_cli_timestamp, RunnerConfig};
use error::{Result, RunnerError};
use pdp::{LoadMode, Pipeline, RawEvent, ReportName, Table, TableStore, WriteMode};
use pdp_testdata::{EventBatch, EventBatchBuilder};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use store::CsvStore;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// PDP pipeline runner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file (generator and pipeline sections)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate raw user activity events into the data directory
    Generate {
        /// Data directory
        #[arg(short, long, default_value = "data")]
        data: PathBuf,

        /// Number of rows (overrides the config file)
        #[arg(short = 'n', long)]
        rows: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Window start, `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`
        #[arg(long)]
        start: Option<String>,

        /// Window end (exclusive)
        #[arg(long)]
        end: Option<String>,

        /// User pool size
        #[arg(long)]
        users: Option<usize>,

        /// Product pool size
        #[arg(long)]
        products: Option<usize>,

        /// Add to the existing raw table instead of replacing it
        #[arg(long)]
        append: bool,

        /// Generate rows on all cores
        #[arg(long)]
        parallel: bool,

        /// Also export the batch as a JSON array
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Transform the raw table into staging, dimensions and facts
    Run {
        /// Data directory
        #[arg(short, long, default_value = "data")]
        data: PathBuf,

        /// Load mode
        #[arg(short, long, value_enum, default_value_t = Mode::Full)]
        mode: Mode,

        /// Write the run summary as JSON to this file
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Run analytics reports over the loaded tables
    Report {
        /// Data directory
        #[arg(short, long, default_value = "data")]
        data: PathBuf,

        /// Report name, or `all`
        #[arg(short, long, default_value = "all")]
        name: String,

        /// Output directory (defaults to `<data>/reports`)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print the reports as JSON instead of writing CSV files
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Full,
    Incremental,
}

impl From<Mode> for LoadMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Full => LoadMode::Full,
            Mode::Incremental => LoadMode::Incremental,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("PDP Runner v{} (pdp v{})", env!("CARGO_PKG_VERSION"), pdp::VERSION);

    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(args: Args) -> Result<()> {
    let config = RunnerConfig::load_or_default(args.config.as_deref())?;
    config.validate()?;

    match args.command {
        Commands::Generate {
            data,
            rows,
            seed,
            start,
            end,
            users,
            products,
            append,
            parallel,
            json,
        } => {
            let mut generator = config.generator;
            if let Some(rows) = rows {
                generator.num_rows = rows;
            }
            if let Some(seed) = seed {
                generator.seed = seed;
            }
            if let Some(start) = start {
                generator.start = parse_cli_timestamp(&start)?;
            }
            if let Some(end) = end {
                generator.end = parse_cli_timestamp(&end)?;
            }
            if let Some(users) = users {
                generator.user_pool_size = users;
            }
            if let Some(products) = products {
                generator.product_pool_size = products;
            }

            let builder = EventBatchBuilder::new(generator);
            let batch = if parallel {
                builder.build_par(builder.config().num_rows)?
            } else {
                builder.build_configured()?
            };
            generate(&data, &batch, append, json.as_deref())
        }

        Commands::Run {
            data,
            mode,
            summary,
        } => run(&data, config, mode.into(), summary.as_deref()),

        Commands::Report {
            data,
            name,
            out,
            json,
        } => {
            let out = out.unwrap_or_else(|| data.join("reports"));
            report(&data, &name, &out, json)
        }
    }
}

fn generate(data: &Path, batch: &EventBatch, append: bool, json: Option<&Path>) -> Result<()> {
    let mut store = CsvStore::open(data)?;
    let mode = if append {
        WriteMode::Append
    } else {
        WriteMode::Overwrite
    };
    store.write_table(&batch.events, mode)?;
    info!(
        "Wrote {} raw events to {}",
        batch.len(),
        store.table_path(RawEvent::NAME).display()
    );

    if let Some(path) = json {
        batch.to_json(path)?;
        info!("Exported JSON to {}", path.display());
    }
    Ok(())
}

fn run(data: &Path, config: RunnerConfig, mode: LoadMode, summary: Option<&Path>) -> Result<()> {
    let mut store = CsvStore::open(data)?;
    if !store.contains(RawEvent::NAME) {
        return Err(RunnerError::NoRawEvents(data.display().to_string()));
    }

    let pipeline = Pipeline::new(config.pipeline)?;
    let result = pipeline.run_stored(&mut store, mode)?;

    let cleaning = &result.cleaning;
    if cleaning.dropped_null_user > 0 {
        warn!("Dropped {} rows without user_id", cleaning.dropped_null_user);
    }
    if cleaning.total_coercion_failures() > 0 {
        warn!(
            "{} values failed coercion and were nulled",
            cleaning.total_coercion_failures()
        );
    }
    let gaps = &result.join_gaps;
    if gaps.user + gaps.product + gaps.platform > 0 {
        warn!(
            "Unmatched joins: {} user, {} product, {} platform",
            gaps.user, gaps.product, gaps.platform
        );
    }

    for load in [
        &result.dim_user,
        &result.dim_product,
        &result.dim_platform,
        &result.facts,
    ] {
        info!(
            "{}: +{} rows ({} total, {} excluded)",
            load.table, load.written, load.total, load.excluded
        );
    }

    let text = serde_json::to_string_pretty(&result)?;
    match summary {
        Some(path) => std::fs::write(path, text)?,
        None => println!("{}", text),
    }
    Ok(())
}

fn report(data: &Path, name: &str, out: &Path, json: bool) -> Result<()> {
    let store = CsvStore::open(data)?;
    let tables = if name.eq_ignore_ascii_case("all") {
        pdp::pipeline::report_all(&store)?
    } else {
        let name: ReportName = name.parse()?;
        vec![pdp::pipeline::report(&store, name)?]
    };

    if json {
        let object: serde_json::Map<String, serde_json::Value> = tables
            .iter()
            .map(|t| (t.name().to_string(), t.to_json()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&object)?);
        return Ok(());
    }

    for path in report::write_all(&tables, out)? {
        info!("Wrote {}", path.display());
    }
    Ok(())
}
