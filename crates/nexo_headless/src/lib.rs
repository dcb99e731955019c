//! Headless match runner for policy testing and CI verification.
//!
//! Plays full matches without any presentation layer, with both sides
//! driven by simple policies. This enables:
//!
//! - **Balance runs**: many seeds of one scenario in parallel
//! - **CI verification**: automated checks of match logic and determinism
//! - **Metrics export**: per-match and aggregate summaries as JSON
//!
//! Summaries go to stdout as JSON; logs go to stderr.
//!
//! # Example
//!
//! ```bash
//! # Run one match
//! cargo run -p nexo_headless -- run --scenario scenarios/skirmish.ron
//!
//! # Run a batch of seeds
//! cargo run -p nexo_headless -- batch --count 100 --output results/batch.json
//!
//! # Verify determinism
//! cargo run -p nexo_headless -- verify --runs 5
//! ```

pub mod batch;
pub mod metrics;
pub mod policy;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, verify_snapshot, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, MatchSummary, SideSummary};
pub use policy::{Action, OpponentPolicy};
pub use runner::{MatchRunner, RunnerError};
pub use scenario::{Scenario, ScenarioError};
