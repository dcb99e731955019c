//! Batch match runner for balance testing.
//!
//! Runs many seeds of one scenario in parallel using rayon and collects the
//! per-match summaries plus an aggregate.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use nexo_core::state::MatchState;

use crate::metrics::{BatchSummary, MatchSummary};
use crate::runner::MatchRunner;
use crate::scenario::Scenario;

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario to run; its own seed is replaced per match.
    pub scenario: Scenario,
    /// Number of matches to run.
    pub game_count: u32,
    /// Seed of the first match; later matches count up from it.
    pub seed_start: u64,
    /// Maximum parallel matches (0 = rayon default).
    pub parallel_games: u32,
}

impl BatchConfig {
    /// Config for `game_count` matches of a scenario.
    #[must_use]
    pub fn new(scenario: Scenario, game_count: u32) -> Self {
        Self {
            scenario,
            game_count,
            seed_start: 0,
            parallel_games: 0,
        }
    }

    /// Set the starting seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenario name.
    pub scenario: String,
    /// Per-match summaries in seed order.
    pub games: Vec<MatchSummary>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total wall-clock runtime.
    pub duration_seconds: f64,
    /// Matches that could not be run.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file or its directory cannot be written.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or malformed.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// A match in the batch that could not be run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index within the batch.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Run one match of a scenario with a given seed.
fn run_single_game(scenario: &Scenario, seed: u64) -> Result<MatchSummary, String> {
    let mut scenario = scenario.clone();
    scenario.seed = seed;
    let mut runner = MatchRunner::from_scenario(&scenario).map_err(|e| e.to_string())?;
    Ok(runner.run())
}

/// Run a batch of matches.
#[must_use]
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        "Starting batch run: {} games of '{}'",
        config.game_count, config.scenario.name
    );

    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<MatchSummary, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match run_single_game(&config.scenario, seed) {
                Ok(summary) => {
                    debug!(game = i, seed, status = ?summary.status, "game complete");
                    Ok(summary)
                }
                Err(message) => {
                    warn!("Game {} failed: {}", i, message);
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message,
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<MatchSummary> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_summaries(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s ({} errors)",
        games.len(),
        duration_seconds,
        errors.len()
    );

    BatchResults {
        scenario: config.scenario.name,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Run the same scenario and seed several times and compare final hashes.
///
/// Returns false if any run fails or disagrees with the first.
#[must_use]
pub fn verify_determinism(scenario: &Scenario, runs: u32) -> bool {
    let hashes: Vec<Option<u64>> = (0..runs)
        .map(|_| {
            run_single_game(scenario, scenario.seed)
                .map(|summary| summary.final_state_hash)
                .ok()
        })
        .collect();

    let Some(Some(first)) = hashes.first().copied() else {
        return false;
    };
    let all_match = hashes.iter().all(|h| *h == Some(first));
    if !all_match {
        warn!("Determinism check failed: {:?}", hashes);
    }
    all_match
}

/// Run a scenario once and check its final state survives a bincode snapshot.
#[must_use]
pub fn verify_snapshot(scenario: &Scenario) -> bool {
    let mut runner = match MatchRunner::from_scenario(scenario) {
        Ok(runner) => runner,
        Err(e) => {
            warn!("Snapshot check could not start: {}", e);
            return false;
        }
    };
    let summary = runner.run();
    let restored = runner
        .state()
        .to_bytes()
        .and_then(|bytes| MatchState::from_bytes(&bytes));
    match restored {
        Ok(state) => state.state_hash() == summary.final_state_hash,
        Err(e) => {
            warn!("Snapshot round trip failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_scenario() -> Scenario {
        let mut scenario = Scenario::skirmish();
        scenario.tick_ms = 100;
        scenario.max_ticks = 300;
        scenario
    }

    #[test]
    fn test_batch_runs_every_seed() {
        let results = run_batch(BatchConfig::new(short_scenario(), 4).with_seed(10));
        assert_eq!(results.games.len(), 4);
        assert!(results.errors.is_empty());
        let mut seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        seeds.sort_unstable();
        assert_eq!(seeds, vec![10, 11, 12, 13]);
        assert_eq!(results.summary.total_games, 4);
    }

    #[test]
    fn test_invalid_scenario_is_reported_per_game() {
        let mut scenario = short_scenario();
        scenario.player.deck.push("unknown_card".into());
        let results = run_batch(BatchConfig::new(scenario, 2));
        assert!(results.games.is_empty());
        assert_eq!(results.errors.len(), 2);
    }

    #[test]
    fn test_verify_determinism() {
        assert!(verify_determinism(&short_scenario(), 3));
    }

    #[test]
    fn test_final_state_survives_snapshot() {
        assert!(verify_snapshot(&short_scenario()));
    }
}
