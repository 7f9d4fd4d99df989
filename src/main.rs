use std::{io, num::NonZeroUsize, path::PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    events::Trigger,
    render::RenderOptions,
    simulate::SimParams,
};

mod channel;
mod config;
mod error;
mod events;
mod export;
mod gradient;
mod render;
mod segment;
mod simulate;
mod telemetry;

#[derive(Debug, Parser)]
#[command(author, version, about = "Black box telemetry map generator")]
struct Cli {
    /// TOML config file (defaults to ./telemap.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render logs as HTML maps with the route colored by a channel
    Render {
        /// CSV logs, each rendered independently
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Channel to color by: RPM, Spd, Ax, Ay or Throttle
        #[arg(long, default_value = "RPM")]
        channel: String,

        /// Output file (single input only); defaults to <stem>_<channel>_heatmap.html
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Which samples get a marker
        #[arg(long, value_enum)]
        trigger: Option<Trigger>,

        /// RPM threshold for the rpm trigger
        #[arg(long)]
        threshold: Option<u32>,

        /// Keep every Nth marker
        #[arg(long)]
        every: Option<NonZeroUsize>,
    },
    /// Generate a synthetic drive around Western University
    Simulate {
        #[arg(long, default_value_t = 500)]
        points: usize,

        /// Sample interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,

        /// RNG seed; random when omitted
        #[arg(long)]
        seed: Option<u64>,

        #[arg(short, long, default_value = "data/robust_drive.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Render {
            files,
            channel,
            output,
            trigger,
            threshold,
            every,
        } => {
            if output.is_some() && files.len() > 1 {
                bail!("--output can only be used with a single input file");
            }

            let mut rule = config.events.rule();
            if let Some(trigger) = trigger {
                rule.trigger = trigger;
            }
            if let Some(threshold) = threshold {
                rule.threshold = threshold;
            }
            let options = RenderOptions {
                channel,
                output,
                rule,
                every: every.unwrap_or(config.events.every),
            };
            for file in files {
                match render::run(&file, &options, &config) {
                    Ok(path) => info!("Map saved to {}", path.display()),
                    Err(e) => error!("{}: {e}", file.display()),
                }
            }
        }

        Command::Simulate {
            points,
            interval_ms,
            seed,
            output,
        } => {
            let seed = seed.unwrap_or_else(rand::random::<u64>);
            info!("Simulating with seed {seed}");
            let params = SimParams {
                points,
                interval_ms,
                seed,
            };
            if let Err(e) = simulate::run(&params, &output) {
                error!("{e:#}");
            }
        }
    };

    Ok(())
}
