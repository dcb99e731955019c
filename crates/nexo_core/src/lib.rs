//! # Nexo Core
//!
//! Deterministic battle simulation for Nexo Arena, a two-lane tower-defense
//! battler.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond optional catalog loading
//! - No system randomness (jitter comes through [`entropy::Entropy`])
//! - No floating-point math (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`simulation`] - Tick function plus deploy and ability actions
//! - [`state`] - Match snapshot, tower layout and metrics
//! - [`cards`] - Card catalog
//! - [`abilities`] - Commander abilities
//! - [`combat`], [`projectiles`], [`spells`], [`towers`] - Damage paths
//! - [`targeting`], [`movement`], [`arena`] - Geometry and pursuit
//! - [`clock`] - Time, energy and match resolution
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod abilities;
pub mod arena;
pub mod cards;
pub mod clock;
pub mod combat;
pub mod components;
pub mod entropy;
pub mod error;
pub mod factory;
pub mod math;
pub mod movement;
pub mod projectiles;
pub mod rules;
pub mod simulation;
pub mod spells;
pub mod state;
pub mod targeting;
pub mod towers;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::abilities::{AbilityId, AbilitySelection, EmpMode, HiveMode};
    pub use crate::cards::{CardCatalog, CardDef};
    pub use crate::components::*;
    pub use crate::entropy::{Entropy, NoJitter, SeededEntropy, SequenceEntropy};
    pub use crate::error::{ActionRejected, GameError, Result};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::rules::MatchRules;
    pub use crate::simulation::Simulation;
    pub use crate::state::{ArenaState, MatchMetrics, MatchState, MatchStatus};
}
