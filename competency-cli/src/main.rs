use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use competency_core::parse_instant;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod dataset;

use commands::Context;
use config::{ConfigLoader, OutputFormat};

#[derive(Parser)]
#[command(name = "competency", about = "Skill gaps, team KPIs and time travel over evaluation history")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Dataset file (defaults to data.path from config)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Treat this instant as "now" (RFC 3339 or YYYY-MM-DD)
    #[arg(long, global = true)]
    now: Option<String>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one (level, frequency, criticality) triple
    Classify(commands::classify::ClassifyArgs),
    /// List the periods available for the dataset
    Periods(commands::periods::PeriodsArgs),
    /// Reconstruct a collaborator's skills at a point in time
    Snapshot(commands::snapshot::SnapshotArgs),
    /// Gaps, strengths, maturity and risk of a collaborator
    Profile(commands::profile::ProfileArgs),
    /// Team KPIs, with deltas against an earlier period
    Metrics(commands::metrics::MetricsArgs),
    /// Score growth, monthly team averages and support cases over a window
    Evolution(commands::evolution::EvolutionArgs),
    /// Switch a period to another granularity
    Match(commands::period_match::MatchArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ConfigLoader::load()?;
    let now = match cli.now.as_deref() {
        Some(raw) => match parse_instant(raw) {
            Some(instant) => instant,
            None => bail!("Invalid --now instant '{raw}'"),
        },
        None => Utc::now(),
    };
    let ctx = Context {
        data: cli.data.unwrap_or_else(|| config.data.path.clone()),
        format: if cli.json {
            OutputFormat::Json
        } else {
            config.output.format
        },
        now,
        config,
    };

    match cli.command {
        Commands::Classify(args) => commands::classify::run(&ctx, args),
        Commands::Periods(args) => commands::periods::run(&ctx, args),
        Commands::Snapshot(args) => commands::snapshot::run(&ctx, args),
        Commands::Profile(args) => commands::profile::run(&ctx, args),
        Commands::Metrics(args) => commands::metrics::run(&ctx, args),
        Commands::Evolution(args) => commands::evolution::run(&ctx, args),
        Commands::Match(args) => commands::period_match::run(&ctx, args),
        Commands::Config(args) => commands::config::run(&ctx, args),
    }
}
