//! Gauge Battle - Development Tools

use std::path::{Path, PathBuf};

use battle_tools::skirmish::{default_skills, run_skirmish, SkirmishOptions};
use battle_tools::validate::{load_config, load_skills, validate_data_directory, validate_file};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "battle-tools")]
#[command(about = "Development tools for the gauge battle core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a data file or every RON file in a directory
    Validate {
        /// Path to a data file or directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Run a headless battle and print a summary
    Skirmish {
        /// RNG seed
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Tick limit
        #[arg(long, default_value_t = 3600)]
        ticks: u64,
        /// Party size
        #[arg(long, default_value_t = 3)]
        party: usize,
        /// Troop size
        #[arg(long, default_value_t = 3)]
        troop: usize,
        /// Gauge gained per tick
        #[arg(long, default_value_t = 12)]
        gauge_rate: i32,
        /// Battle config RON file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skill list RON file
        #[arg(long)]
        skills: Option<PathBuf>,
    },
}

fn validate(path: &Path) -> Result<(), String> {
    if path.is_dir() {
        let count = validate_data_directory(path).map_err(|e| e.to_string())?;
        tracing::info!(count, "Files validated");
    } else {
        validate_file(path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data in: {}", path.display());
            match validate(&path) {
                Ok(()) => tracing::info!("Validation passed"),
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Skirmish {
            seed,
            ticks,
            party,
            troop,
            gauge_rate,
            config,
            skills,
        } => {
            let config = match config.as_deref().map(load_config).transpose() {
                Ok(config) => config.unwrap_or_default(),
                Err(e) => {
                    tracing::error!("Config rejected: {e}");
                    std::process::exit(1);
                }
            };
            let skills = match skills.as_deref().map(load_skills).transpose() {
                Ok(skills) => skills.unwrap_or_else(default_skills),
                Err(e) => {
                    tracing::error!("Skills rejected: {e}");
                    std::process::exit(1);
                }
            };
            let options = SkirmishOptions {
                seed,
                ticks,
                party,
                troop,
                gauge_rate,
            };
            match run_skirmish(config, skills, options) {
                Ok(report) => {
                    println!(
                        "outcome={:?} ticks={} actions={} hits={} misses={} defeated={} telegraphs={} faults={} hash={:016x}",
                        report.outcome,
                        report.ticks,
                        report.actions,
                        report.hits,
                        report.misses,
                        report.defeated,
                        report.telegraphs,
                        report.faults,
                        report.state_hash
                    );
                }
                Err(e) => {
                    tracing::error!("Skirmish failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
