//! Headless match runner.
//!
//! Plays scripted matches without any presentation layer.
//!
//! # Usage
//!
//! ```bash
//! # Run a single match and print its summary
//! cargo run -p nexo_headless -- run --scenario scenarios/skirmish.ron
//!
//! # Run a batch of seeds in parallel
//! cargo run -p nexo_headless -- batch --count 200 --output results/batch.json
//!
//! # Verify determinism
//! cargo run -p nexo_headless -- verify --seed 12345 --runs 5
//! ```
//!
//! Summaries are printed to stdout as JSON; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nexo_headless::{
    batch::{run_batch, verify_determinism, verify_snapshot, BatchConfig},
    runner::MatchRunner,
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "nexo_headless")]
#[command(about = "Headless lane battle runner for policy testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single match
    Run {
        /// Scenario file to load (built-in skirmish if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run a batch of matches for balance testing
    Batch {
        /// Scenario file to load (built-in skirmish if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output file for results
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Scenario file to load (built-in skirmish if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Run { scenario, seed } => cmd_run(scenario, seed),
        Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
        } => cmd_batch(scenario, count, parallel, output, seed),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(scenario, seed, runs),
    }
}

/// Load a scenario file, or the built-in skirmish. Exits on failure.
fn load_scenario(path: Option<PathBuf>) -> Scenario {
    let Some(path) = path else {
        return Scenario::skirmish();
    };
    match Scenario::load(&path) {
        Ok(scenario) => scenario,
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "Failed to load scenario");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a single match and print its summary.
fn cmd_run(scenario: Option<PathBuf>, seed: Option<u64>) {
    let mut scenario = load_scenario(scenario);
    if let Some(seed) = seed {
        scenario.seed = seed;
    }

    let mut runner = match MatchRunner::from_scenario(&scenario) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };
    let summary = runner.run();

    match summary.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("FATAL: Failed to encode summary: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a batch of matches and print or save the results.
fn cmd_batch(
    scenario: Option<PathBuf>,
    count: u32,
    parallel: u32,
    output: Option<PathBuf>,
    seed: u64,
) {
    let scenario = load_scenario(scenario);
    tracing::info!(
        scenario = %scenario.name,
        count,
        parallel,
        seed,
        "Batch configuration"
    );

    let mut config = BatchConfig::new(scenario, count).with_seed(seed);
    config.parallel_games = parallel;
    let results = run_batch(config);

    if let Some(path) = output {
        if let Err(e) = results.save(&path) {
            tracing::error!(error = %e, path = %path.display(), "Failed to save results");
            eprintln!("FATAL: Failed to save results: {e}");
            std::process::exit(1);
        }
    } else {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("FATAL: Failed to encode results: {e}");
                std::process::exit(1);
            }
        }
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Player {} / AI {} / Draw {} / Undecided {}",
        summary.player_wins, summary.ai_wins, summary.draws, summary.undecided
    );
    eprintln!("Sudden deaths: {}", summary.sudden_deaths);
    eprintln!("Average duration: {:.1}s", summary.avg_duration_ms / 1000.0);

    if !results.errors.is_empty() {
        std::process::exit(1);
    }
}

/// Verify determinism for one scenario and seed.
fn cmd_verify(scenario: Option<PathBuf>, seed: u64, runs: u32) {
    let mut scenario = load_scenario(scenario);
    scenario.seed = seed;
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    if !verify_determinism(&scenario, runs) {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
    if !verify_snapshot(&scenario) {
        eprintln!("FAIL: Final state did not survive a snapshot round trip");
        std::process::exit(1);
    }
    eprintln!("PASS: All {} runs produced identical results", runs);
}
