//! heatclust command-line interface.
//!
//! Replays recorded temperature-delta streams through the stream learner.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::redundant_closure_for_method_calls
)]

use clap::{Parser, Subcommand};

use heatclust_stream::{JsonLinesSink, LearnerConfig, ReplayOracle, StreamLearner, SummarySink};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Stream(#[from] heatclust_stream::Error),
}

/// Streaming clustering of temperature-delta recordings.
#[derive(Parser)]
#[command(name = "heatclust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Learner settings shared by the subcommands. Flags override the file.
#[derive(clap::Args, Debug, Default)]
struct ConfigArgs {
    /// JSON learner configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of clusters per bucket
    #[arg(short)]
    k: Option<usize>,

    /// K-Means convergence bound
    #[arg(long)]
    epsilon: Option<f64>,

    /// Observations per initial bucket
    #[arg(long)]
    batch_size: Option<usize>,

    /// Seed for K-Means reclustering
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay `timestamp,result,considered` lines and write one JSON summary
    /// per finalized bucket
    Replay {
        /// Recorded delta responses
        input: PathBuf,

        /// Output file (JSON lines); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: ConfigArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the bucket time horizon derived from a configuration
    Horizon {
        #[command(flatten)]
        settings: ConfigArgs,
    },
}

fn load_config(args: &ConfigArgs) -> Result<LearnerConfig> {
    let mut config = match &args.config {
        Some(path) => LearnerConfig::from_json_file(path)?,
        None => LearnerConfig::default(),
    };
    if let Some(k) = args.k {
        config.max_clusters = k;
    }
    if let Some(epsilon) = args.epsilon {
        config.epsilon = epsilon;
    }
    if let Some(p) = args.batch_size {
        config.batch_size = p;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;
    Ok(config)
}

/// Runs the learner over a recording. Returns (responses, buckets finalized).
fn replay<S: SummarySink>(input: &Path, config: LearnerConfig, sink: &mut S) -> Result<(usize, usize)> {
    let mut oracle = ReplayOracle::from_reader(BufReader::new(File::open(input)?))?;
    let responses = oracle.remaining();
    let mut learner = StreamLearner::new(config)?;
    let finalized = learner.run(&mut oracle, sink)?;
    Ok((responses, finalized))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            input,
            output,
            settings,
            verbose,
        } => {
            let config = load_config(&settings)?;
            if verbose {
                eprintln!("Replaying: {}", input.display());
                eprintln!("Max clusters: {}", config.max_clusters);
                eprintln!("Batch size: {}", config.batch_size);
                eprintln!("Horizon: {}s", config.time_horizon_secs());
            }

            let start = Instant::now();
            let (responses, finalized) = match &output {
                Some(path) => {
                    let mut sink = JsonLinesSink::create(path)?;
                    let counts = replay(&input, config, &mut sink)?;
                    sink.flush()?;
                    counts
                }
                None => {
                    let mut sink = JsonLinesSink::new(io::stdout().lock());
                    let counts = replay(&input, config, &mut sink)?;
                    sink.flush()?;
                    counts
                }
            };

            if verbose {
                eprintln!(
                    "Replayed {} responses into {} buckets in {:.2}s",
                    responses,
                    finalized,
                    start.elapsed().as_secs_f64()
                );
            }
        }

        Commands::Horizon { settings } => {
            let config = load_config(&settings)?;
            let secs = config.time_horizon_secs();
            println!("Batch size: {}", config.batch_size);
            println!("Request interval: {}s", config.request_interval_secs());
            println!("Max bucket size: {}", config.max_bucket_size);
            println!("Time horizon: {}s ({:.2} h)", secs, secs as f64 / 3600.0);
        }
    }

    Ok(())
}
