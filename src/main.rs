use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mpath_sim::codec::Field;
use mpath_sim::config::{self, DEFAULT_QUEUE_CAPACITY, DEFAULT_RATE, SimConfig};
use mpath_sim::Simulator;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Use mimalloc as the global allocator for the binary (non-Windows only)
#[cfg(not(windows))]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(
    name = "mpath_sim",
    author,
    version,
    about = "Multipath RLNC relay simulator: one source, three recoding relays, one sink"
)]
struct Cli {
    /// Comma-separated loss probabilities of the six links
    #[arg(long, value_delimiter = ',')]
    losses: Vec<f64>,
    /// Comma-separated delays of the six links, e.g. 50ms,10ms,...
    #[arg(long, value_delimiter = ',', value_parser = parse_duration)]
    delays: Vec<Duration>,
    /// Comma-separated times before each of the three relays is reset (0 disables)
    #[arg(long, value_delimiter = ',', value_parser = parse_duration)]
    resets: Vec<Duration>,
    /// Comma-separated downtimes of the three relays after their reset
    #[arg(long, value_delimiter = ',', value_parser = parse_duration)]
    downtimes: Vec<Duration>,

    /// Generation size
    #[arg(long, default_value_t = 40)]
    symbols: usize,
    /// Symbol size in bytes
    #[arg(long = "symbol-size", alias = "symbolSize", default_value_t = 1000)]
    symbol_size: usize,
    /// Transmission rate in bytes per second
    #[arg(long, default_value_t = DEFAULT_RATE)]
    rate: u64,
    /// Finite field: binary8 or binary
    #[arg(long, default_value = "binary8")]
    field: Field,
    /// Number of simulation runs
    #[arg(long, default_value_t = 1)]
    runs: usize,
    /// Capacity of every link and intake queue
    #[arg(long = "queue-capacity", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
    /// Seed for reproducible loss patterns and source data
    #[arg(long)]
    seed: Option<u64>,
    /// Directory the JSON report is written to
    #[arg(long, default_value = ".")]
    output: PathBuf,
    /// Do not write a report file
    #[arg(long = "no-report")]
    no_report: bool,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    config::parse_duration(s).map_err(|e| e.to_string())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Cli::parse();
    let config = SimConfig {
        field: args.field,
        symbols: args.symbols,
        symbol_size: args.symbol_size,
        rate: args.rate,
        losses: args.losses,
        delays: args.delays,
        resets: args.resets,
        downtimes: args.downtimes,
        runs: args.runs,
        queue_capacity: args.queue_capacity,
        seed: args.seed,
        output_dir: (!args.no_report).then_some(args.output),
    };

    let mut simulator = Simulator::new(config)?;
    let report = simulator.run().await.context("simulation failed")?;

    if let Some(mean) = report.mean_latency() {
        info!(
            "{} runs decoded correctly, mean latency {:.3}s",
            report.runs(),
            mean
        );
    }
    if let Some(dir) = &simulator.config().output_dir {
        report.write_json(dir)?;
    }
    Ok(())
}
