//! Scenario loading and configuration.
//!
//! Scenarios define a headless match: rules, seed, tick length, and for each
//! side a deck, an optional commander ability and the policy that plays it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nexo_core::abilities::AbilitySelection;
use nexo_core::cards::CardCatalog;
use nexo_core::components::{CardId, Team};
use nexo_core::rules::MatchRules;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed, but refers to things that do not exist.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// Which policy drives a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Cheapest affordable card into the weaker lane; ability when affordable.
    #[default]
    Scripted,
    /// Never acts. Useful for tower and clock tests.
    Idle,
}

/// Commander ability as written in a scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityConfig {
    /// Ability name (`emp_overwatch`, `mothership_command`, `aracno_hive`,
    /// `mecha_nexodo`).
    pub name: String,
    /// Ability options such as `mode`, `hangar_card` or `pilot_card`.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl AbilityConfig {
    /// Create an ability config with options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: &[(&str, &str)]) -> Self {
        Self {
            name: name.into(),
            options: options
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    /// Resolve into an engine selection.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Invalid`] for an unknown ability or bad option.
    pub fn selection(&self) -> Result<AbilitySelection, ScenarioError> {
        AbilitySelection::from_options(&self.name, &self.options)
            .map_err(|e| ScenarioError::Invalid(format!("ability {}: {e}", self.name)))
    }
}

/// Setup for one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideSetup {
    /// Deck in draw order; the first four cards form the opening hand.
    pub deck: Vec<String>,
    /// Commander ability, if any.
    #[serde(default)]
    pub ability: Option<AbilityConfig>,
    /// Controlling policy.
    #[serde(default)]
    pub policy: PolicyKind,
}

impl SideSetup {
    /// Deck as card ids.
    #[must_use]
    pub fn deck_ids(&self) -> Vec<CardId> {
        self.deck.iter().map(|id| CardId::new(id.as_str())).collect()
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Clock and energy tunables.
    #[serde(default)]
    pub rules: MatchRules,
    /// Seed for spawn jitter.
    #[serde(default)]
    pub seed: u64,
    /// Milliseconds per tick.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u32,
    /// Tick budget; the run stops here even if the match is undecided.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Left side.
    pub player: SideSetup,
    /// Right side.
    pub ai: SideSetup,
}

fn default_tick_ms() -> u32 {
    50
}

fn default_max_ticks() -> u64 {
    // Regular time plus a full sudden death at 50 ms ticks, with headroom.
    5_000
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable or malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    ///
    /// # Errors
    ///
    /// Fails if the text is malformed.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Serialize to pretty RON.
    ///
    /// # Errors
    ///
    /// Fails only if serialization itself fails.
    pub fn to_ron_string(&self) -> Result<String, ScenarioError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ScenarioError::Invalid(e.to_string()))
    }

    /// Standard mirror skirmish: two scripted sides, EMP against mecha.
    #[must_use]
    pub fn skirmish() -> Self {
        Self {
            name: "Standard Skirmish".to_string(),
            description: "Scripted mirror match for regression and balance runs".to_string(),
            rules: MatchRules::default(),
            seed: 0,
            tick_ms: default_tick_ms(),
            max_ticks: default_max_ticks(),
            player: SideSetup {
                deck: standard_deck(),
                ability: Some(AbilityConfig::new("emp_overwatch", &[("mode", "disruptor")])),
                policy: PolicyKind::Scripted,
            },
            ai: SideSetup {
                deck: standard_deck(),
                ability: Some(AbilityConfig::new(
                    "mecha_nexodo",
                    &[("pilot_card", "shock_trooper"), ("mode", "laser")],
                )),
                policy: PolicyKind::Scripted,
            },
        }
    }

    /// Setup for one side.
    #[must_use]
    pub fn side(&self, team: Team) -> &SideSetup {
        match team {
            Team::Player => &self.player,
            Team::Ai => &self.ai,
        }
    }

    /// Check rules, decks and abilities against a catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Invalid`] describing the first problem found.
    pub fn validate(&self, catalog: &CardCatalog) -> Result<(), ScenarioError> {
        self.rules.validate().map_err(ScenarioError::Invalid)?;
        if self.tick_ms == 0 {
            return Err(ScenarioError::Invalid("tick_ms must be positive".into()));
        }
        for team in Team::ALL {
            let side = self.side(team);
            for card in &side.deck {
                if catalog.get_str(card).is_none() {
                    return Err(ScenarioError::Invalid(format!("{team:?} deck: unknown card {card}")));
                }
            }
            if let Some(ability) = &side.ability {
                ability.selection()?;
            }
        }
        Ok(())
    }
}

fn standard_deck() -> Vec<String> {
    [
        "marine_squad",
        "shock_trooper",
        "plasma_drones",
        "plasma_bomb",
        "nova_brawler",
        "sky_fighter",
        "field_medic",
        "sentinel_pylon",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
