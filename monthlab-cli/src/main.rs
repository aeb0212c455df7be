//! MonthLab CLI: run, inspect, and report commands.
//!
//! Commands:
//! - `run`: harmonize every series of a TOML manifest and merge the panel
//! - `inspect`: show how one raw file would be read and classified
//! - `report`: data quality summary of a written panel CSV

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use monthlab_runner::{
    inspect, quality_report, run_pipeline, NoProgress, PipelineConfig, PipelineProgress,
    RunSummary, SeriesStatus, StdoutProgress, REPORT_FILE,
};

#[derive(Parser)]
#[command(
    name = "monthlab",
    about = "MonthLab CLI: monthly harmonization of mixed-frequency macro series"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harmonize every series declared in a manifest and write the panel.
    Run {
        /// Path to the pipeline manifest (TOML).
        #[arg(long)]
        config: PathBuf,

        /// Debug-level logging.
        #[arg(long, short, default_value_t = false, conflicts_with = "quiet")]
        verbose: bool,

        /// Warnings only, no progress output.
        #[arg(long, short, default_value_t = false)]
        quiet: bool,
    },
    /// Detect the date pattern and frequency of a raw CSV file.
    Inspect {
        /// Raw CSV file.
        file: PathBuf,

        /// Name of the date column.
        #[arg(long)]
        date_column: String,
    },
    /// Print row, range, and missingness statistics of a panel CSV.
    Report {
        /// Panel CSV written by `run`.
        panel: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            verbose,
            quiet,
        } => {
            init_tracing(verbose, quiet);
            run_cmd(&config, quiet)
        }
        Commands::Inspect { file, date_column } => {
            init_tracing(false, false);
            inspect_cmd(&file, &date_column)
        }
        Commands::Report { panel } => {
            init_tracing(false, false);
            report_cmd(&panel)
        }
    }
}

/// `RUST_LOG` wins; otherwise the level follows the flags.
fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_cmd(config_path: &Path, quiet: bool) -> Result<()> {
    let config = PipelineConfig::load(config_path)
        .with_context(|| format!("loading manifest {}", config_path.display()))?;

    let progress: &dyn PipelineProgress = if quiet { &NoProgress } else { &StdoutProgress };
    let summary = run_pipeline(&config, progress).context("writing pipeline output")?;

    if !quiet {
        print_summary(&summary);
        println!(
            "Report saved to: {}",
            config.output.dir.join(REPORT_FILE).display()
        );
    }

    if summary.has_failures() {
        for outcome in summary.series.iter().filter(|s| !s.is_success()) {
            eprintln!(
                "Error for {}: {}",
                outcome.name,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        std::process::exit(1);
    }

    Ok(())
}

fn inspect_cmd(file: &Path, date_column: &str) -> Result<()> {
    let inspection =
        inspect(file, date_column).with_context(|| format!("inspecting {}", file.display()))?;
    println!("{inspection}");
    Ok(())
}

fn report_cmd(panel: &Path) -> Result<()> {
    let report = quality_report(panel).with_context(|| format!("reading panel {}", panel.display()))?;
    println!("{report}");
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("=== Harmonization Result ===");
    println!("Series:         {} ({} failed)", summary.total, summary.failed);
    println!("Config hash:    {}", &summary.config_hash[..16.min(summary.config_hash.len())]);
    println!();
    println!(
        "{:<12} {:<10} {:>6} {:>8}  {:<24}",
        "Series", "Frequency", "Rows", "Months", "Range"
    );
    println!("{}", "-".repeat(64));
    for outcome in &summary.series {
        let frequency = match (outcome.status, outcome.frequency) {
            (SeriesStatus::Succeeded, Some(class)) => class.to_string(),
            _ => "FAILED".to_string(),
        };
        let range = match (outcome.first_date, outcome.last_date) {
            (Some(first), Some(last)) => format!("{first} to {last}"),
            _ => "-".to_string(),
        };
        println!(
            "{:<12} {:<10} {:>6} {:>8}  {:<24}",
            outcome.name, frequency, outcome.input_rows, outcome.output_rows, range
        );
    }

    if let Some(panel) = &summary.panel {
        println!();
        println!("--- Panel ---");
        println!("Shape:          {} rows x {} columns", panel.rows, panel.columns);
        if let (Some(first), Some(last)) = (panel.first_date, panel.last_date) {
            println!("Period:         {first} to {last}");
        }
        for m in panel.missingness.iter().filter(|m| m.missing > 0) {
            println!("Missing:        {} {} ({:.2}%)", m.column, m.missing, m.percentage);
        }
    }

    if !summary.diagnostics.is_empty() {
        println!();
        for diagnostic in &summary.diagnostics {
            println!("WARNING: {diagnostic}");
        }
    }
    println!();
}
