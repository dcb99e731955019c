//! Error types for the battle simulation.
//!
//! The per-tick engine never fails: bad input degrades to skipped effects.
//! Errors only surface from the fallible edges (catalog loading, state
//! snapshots) and as typed rejection reasons for player actions.

use thiserror::Error;

use crate::components::Team;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for catalog and snapshot operations.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or embedded name) of the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Failed to read a data file from disk.
    #[error("Failed to read data file '{path}': {source}")]
    DataReadError {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Two catalog entries share an id.
    #[error("Duplicate card id in catalog: {0}")]
    DuplicateCard(String),

    /// Invalid card identifier.
    #[error("Unknown card id: {0}")]
    UnknownCard(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

/// Why a deploy or ability action was refused.
///
/// Refused actions leave the match state untouched; callers treat the
/// rejection as the signal instead of re-checking predicates themselves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionRejected {
    /// The match is not in the playing state.
    #[error("Match is not in progress")]
    NotPlaying,

    /// No card with this id exists in the catalog.
    #[error("Unknown card id: {0}")]
    UnknownCard(String),

    /// No ability with this id exists.
    #[error("Unknown ability id: {0}")]
    UnknownAbility(String),

    /// Not enough energy for the action.
    #[error("{team:?} needs {required} energy, has {available}")]
    InsufficientEnergy {
        /// Acting side.
        team: Team,
        /// Energy cost of the action.
        required: u32,
        /// Whole energy currently available.
        available: u32,
    },

    /// The commander ability is still cooling down.
    #[error("{team:?} ability on cooldown for {remaining_ms} ms")]
    OnCooldown {
        /// Acting side.
        team: Team,
        /// Milliseconds left on the cooldown.
        remaining_ms: u32,
    },

    /// A unit card was placed outside the caster's half.
    #[error("Card {0} must be deployed on the caster's own half")]
    InvalidZone(String),

    /// An ability-exclusive structure is already alive for this side.
    #[error("{team:?} already has an active {what}")]
    AlreadyActive {
        /// Acting side.
        team: Team,
        /// The exclusive entity kind.
        what: &'static str,
    },

    /// The ability needs a card option that is missing or unusable.
    #[error("Ability option '{option}' is invalid: {reason}")]
    InvalidOption {
        /// Option key.
        option: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// The caster's king tower is gone.
    #[error("{0:?} has no living king tower")]
    MissingKing(Team),
}
