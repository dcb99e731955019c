//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the battle engine produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the engine guards against:
//!
//! - **Floating-point math**: fixed-point arithmetic via
//!   [`nexo_core::math::Fixed`] throughout.
//!
//! - **Hidden randomness**: the only random input is position jitter, and it
//!   comes through an injected [`nexo_core::entropy::Entropy`]. Seed it the
//!   same way and two runs must match.
//!
//! - **Entity ids**: handed out by a counter stored in the match state.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual subsystems (movement, combat, spells)
//! 2. **Property tests**: random inputs must still produce deterministic outputs
//! 3. **Integration tests**: full scripted matches are reproducible
//! 4. **Parallel tests**: running N matches on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use nexo_core::entropy::SeededEntropy;
use nexo_core::simulation::Simulation;
use nexo_core::state::MatchState;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// A match in progress: engine, snapshot and the seeded jitter source.
#[derive(Debug, Clone)]
pub struct MatchRun {
    /// Engine.
    pub sim: Simulation,
    /// Current snapshot.
    pub state: MatchState,
    /// Jitter source.
    pub entropy: SeededEntropy,
}

impl MatchRun {
    /// Start a run with the given seed.
    #[must_use]
    pub fn new(sim: Simulation, state: MatchState, seed: u64) -> Self {
        Self {
            sim,
            state,
            entropy: SeededEntropy::new(seed),
        }
    }

    /// Advance one tick.
    pub fn step(&mut self, delta_ms: u32) {
        self.state = self.sim.advance(&self.state, delta_ms, &mut self.entropy);
    }
}

/// Run the same match twice with a fixed tick length and compare the
/// trajectory hash (every tick's state hash folded together).
///
/// Returns `true` if both runs produced identical trajectories.
pub fn verify_match_determinism<F>(setup_fn: F, num_ticks: u64, delta_ms: u32) -> bool
where
    F: Fn() -> MatchRun,
{
    let result = verify_determinism(
        2,
        num_ticks,
        || (setup_fn(), DefaultHasher::new()),
        |(run, trajectory)| {
            run.step(delta_ms);
            run.state.state_hash().hash(trajectory);
        },
        |(_, trajectory)| trajectory.finish(),
    );
    result.is_deterministic
}

/// Result of parallel match runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks each run simulated.
    pub ticks: u64,
    /// Number of runs.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all runs produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all runs matched.
    ///
    /// # Panics
    ///
    /// Panics if runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N matches on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_matches<F>(setup_fn: F, num_sims: usize, num_ticks: u64, delta_ms: u32) -> ParallelSimResult
where
    F: Fn() -> MatchRun + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut run = setup_fn();
                    for _ in 0..num_ticks {
                        run.step(delta_ms);
                    }
                    run.state.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree, `Some(tick)` if they diverge at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, delta_ms: u32) -> Option<u64>
where
    F: Fn() -> MatchRun,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state.state_hash() != b.state.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.step(delta_ms);
        b.step(delta_ms);

        if a.state.state_hash() != b.state.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a bincode round-trip preserves the snapshot exactly.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64, delta_ms: u32) -> bool
where
    F: Fn() -> MatchRun,
{
    let mut run = setup_fn();
    for _ in 0..num_ticks {
        run.step(delta_ms);
    }

    let hash_before = run.state.state_hash();
    let Ok(bytes) = run.state.to_bytes() else {
        return false;
    };
    let Ok(restored) = MatchState::from_bytes(&bytes) else {
        return false;
    };
    restored.state_hash() == hash_before && restored == run.state
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for engine inputs.
pub mod strategies {
    use nexo_core::arena::{ARENA_HEIGHT, ARENA_WIDTH};
    use nexo_core::components::Team;
    use nexo_core::math::{Fixed, Vec2Fixed};
    use proptest::prelude::*;

    /// Either side.
    pub fn arb_team() -> impl Strategy<Value = Team> {
        prop_oneof![Just(Team::Player), Just(Team::Ai)]
    }

    /// A tick length between one frame and a full second.
    pub fn arb_delta_ms() -> impl Strategy<Value = u32> {
        1u32..=1000u32
    }

    /// A sequence of tick lengths.
    pub fn arb_deltas(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        prop::collection::vec(arb_delta_ms(), 1..max_len)
    }

    /// A point inside the arena.
    pub fn arb_arena_point() -> impl Strategy<Value = Vec2Fixed> {
        (0..=ARENA_WIDTH, 0..=ARENA_HEIGHT).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
    }

    /// A point on the given team's half.
    pub fn arb_home_point(team: Team) -> impl Strategy<Value = Vec2Fixed> {
        let half = ARENA_WIDTH / 2;
        let xs = match team {
            Team::Player => 0..=half,
            Team::Ai => half..=ARENA_WIDTH,
        };
        (xs, 0..=ARENA_HEIGHT).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
    }

    /// A damage amount, possibly larger than any hp pool.
    pub fn arb_damage() -> impl Strategy<Value = Fixed> {
        (0i32..5000i32).prop_map(Fixed::from_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{skirmish, standard_sim};

    #[test]
    fn test_verify_determinism_counter() {
        let result = verify_determinism(3, 10, || 0u64, |s| *s += 1, |s| *s);
        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![10, 10, 10]);
    }

    #[test]
    fn test_unique_hashes() {
        let result = DeterminismResult {
            is_deterministic: false,
            hashes: vec![3, 1, 3],
            ticks: 1,
        };
        assert_eq!(result.unique_hashes(), vec![1, 3]);
    }

    #[test]
    fn test_skirmish_is_deterministic() {
        let setup = || MatchRun::new(standard_sim(), skirmish(), 7);
        assert!(verify_match_determinism(setup, 200, 50));
        assert_eq!(find_first_divergence(setup, 50, 50), None);
    }

    #[test]
    fn test_snapshot_round_trip_mid_match() {
        assert!(verify_serialization_determinism(
            || MatchRun::new(standard_sim(), skirmish(), 11),
            120,
            50
        ));
    }
}
