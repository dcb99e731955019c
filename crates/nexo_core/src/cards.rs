//! Card catalog: the static table of unit and spell definitions.
//!
//! Definitions are authored as plain integers in RON and converted to
//! fixed-point when the factory builds a unit. The engine only ever reads
//! the catalog.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::{CardId, EffectKind, Faction, ProjectileStyle, TargetPreference, UnitKind};
use crate::error::{GameError, Result};
use crate::math::Fixed;

/// Catalog shipped with the engine.
const BUILTIN_CARDS: &str = include_str!("../data/cards.ron");

/// Default separation radius for units.
pub const DEFAULT_COLLISION_RADIUS: u32 = 22;

/// Static definition of a deployable card.
///
/// # Example RON
///
/// ```ron
/// (
///     id: "shock_trooper",
///     name: "Shock Trooper",
///     cost: 3,
///     kind: Ground,
///     faction: Human,
///     hp: 620,
///     damage: 75,
///     speed: 45,
///     range: 24,
///     attack_interval_ms: 1200,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDef {
    /// Unique id.
    pub id: CardId,
    /// Display name.
    pub name: String,
    /// Energy cost.
    pub cost: u32,
    /// Unit or spell kind.
    pub kind: UnitKind,
    /// Faction.
    pub faction: Faction,
    /// Hit points per copy.
    #[serde(default)]
    pub hp: u32,
    /// Damage per attack; negative values heal.
    #[serde(default)]
    pub damage: i32,
    /// Movement speed in units per second.
    #[serde(default)]
    pub speed: u32,
    /// Attack range.
    #[serde(default)]
    pub range: u32,
    /// Minimum ms between attacks.
    #[serde(default = "default_attack_interval")]
    pub attack_interval_ms: u32,
    /// Who this card's units pick as targets.
    #[serde(default = "default_target_pref")]
    pub target_pref: TargetPreference,
    /// Attack delivery style.
    #[serde(default = "default_projectile")]
    pub projectile: ProjectileStyle,
    /// Splash radius.
    #[serde(default)]
    pub aoe_radius: Option<u32>,
    /// Stun applied by this spell.
    #[serde(default)]
    pub stun_ms: Option<u32>,
    /// Poison applied by this spell.
    #[serde(default)]
    pub dot_ms: Option<u32>,
    /// Card spawned where a unit of this card dies.
    #[serde(default)]
    pub split_child: Option<CardId>,
    /// Copies per deploy.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Separation radius override.
    #[serde(default)]
    pub collision_radius: Option<u32>,
    /// Spell lingers as a pulsing healing field.
    #[serde(default)]
    pub persistent_field: bool,
    /// Impact effect for instant spells.
    #[serde(default)]
    pub impact_effect: Option<EffectKind>,
    /// Only reachable through abilities or other cards.
    #[serde(default)]
    pub hidden: bool,
}

const fn default_attack_interval() -> u32 {
    1000
}

const fn default_target_pref() -> TargetPreference {
    TargetPreference::Any
}

const fn default_projectile() -> ProjectileStyle {
    ProjectileStyle::None
}

const fn default_count() -> u32 {
    1
}

impl CardDef {
    /// Spell cards never become units.
    #[must_use]
    pub fn is_spell(&self) -> bool {
        self.kind == UnitKind::Spell
    }

    /// Melee ground card that deploys a single unit.
    #[must_use]
    pub fn is_melee_single(&self) -> bool {
        self.kind == UnitKind::Ground
            && self.projectile == ProjectileStyle::None
            && self.count == 1
    }

    /// Ground and building cards must be placed on the caster's half.
    #[must_use]
    pub fn needs_home_zone(&self) -> bool {
        matches!(self.kind, UnitKind::Ground | UnitKind::Building)
    }

    /// Damage as fixed-point.
    #[must_use]
    pub fn damage_fixed(&self) -> Fixed {
        Fixed::from_num(self.damage)
    }

    /// Visual effect for an instant spell impact.
    #[must_use]
    pub fn spell_effect(&self) -> EffectKind {
        match self.impact_effect {
            Some(kind) => kind,
            None if self.damage < 0 => EffectKind::Heal,
            None => EffectKind::Explosion,
        }
    }
}

/// Read-only lookup of card definitions by id.
#[derive(Debug, Clone, Default)]
pub struct CardCatalog {
    cards: Vec<CardDef>,
    index: HashMap<CardId, usize>,
}

impl CardCatalog {
    /// Catalog compiled into the engine.
    ///
    /// # Errors
    ///
    /// Fails only if the embedded table is malformed.
    pub fn builtin() -> Result<Self> {
        Self::from_ron_str(BUILTIN_CARDS, "builtin:cards.ron")
    }

    /// Load a catalog from a RON file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataReadError`] if the file cannot be read, or a
    /// parse/validation error for malformed content.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| GameError::DataReadError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&contents, &path.display().to_string())
    }

    /// Parse a catalog from RON text. `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Fails on malformed RON, duplicate ids, or references to missing cards.
    pub fn from_ron_str(ron_text: &str, origin: &str) -> Result<Self> {
        let cards: Vec<CardDef> =
            ron::from_str(ron_text).map_err(|e| GameError::DataParseError {
                path: origin.to_string(),
                message: e.to_string(),
            })?;
        Self::from_cards(cards)
    }

    /// Build a catalog from already-constructed definitions.
    ///
    /// # Errors
    ///
    /// Fails on duplicate ids or split children that do not exist.
    pub fn from_cards(cards: Vec<CardDef>) -> Result<Self> {
        let mut index = HashMap::with_capacity(cards.len());
        for (i, card) in cards.iter().enumerate() {
            if index.insert(card.id.clone(), i).is_some() {
                return Err(GameError::DuplicateCard(card.id.to_string()));
            }
        }
        for card in &cards {
            if let Some(child) = &card.split_child {
                if !index.contains_key(child) {
                    return Err(GameError::UnknownCard(child.to_string()));
                }
            }
        }
        tracing::debug!(cards = cards.len(), "card catalog built");
        Ok(Self { cards, index })
    }

    /// Look up a card.
    #[must_use]
    pub fn get(&self, id: &CardId) -> Option<&CardDef> {
        self.index.get(id).map(|&i| &self.cards[i])
    }

    /// Look up a card by raw id.
    #[must_use]
    pub fn get_str(&self, id: &str) -> Option<&CardDef> {
        self.get(&CardId::new(id))
    }

    /// Look up a card, failing with [`GameError::UnknownCard`].
    ///
    /// # Errors
    ///
    /// Returns an error if no card has this id.
    pub fn require(&self, id: &CardId) -> Result<&CardDef> {
        self.get(id)
            .ok_or_else(|| GameError::UnknownCard(id.to_string()))
    }

    /// All cards in table order.
    pub fn iter(&self) -> impl Iterator<Item = &CardDef> {
        self.cards.iter()
    }

    /// Cards a deck may contain.
    pub fn deckable(&self) -> impl Iterator<Item = &CardDef> {
        self.cards.iter().filter(|c| !c.hidden)
    }

    /// Number of cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True when the catalog has no cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = CardCatalog::builtin().unwrap();
        assert!(catalog.len() > 10);
        for required in [
            "orbital_laser",
            "healing_matrix",
            "mothership_flagship",
            "aracno_hive",
            "aracno_spider_lethal",
            "aracno_spider_heal",
            "aracno_spider_kami",
        ] {
            assert!(catalog.get_str(required).is_some(), "missing {required}");
        }
    }

    #[test]
    fn test_builtin_has_mecha_pilots() {
        let catalog = CardCatalog::builtin().unwrap();
        assert!(catalog.deckable().any(CardDef::is_melee_single));
    }

    #[test]
    fn test_spell_effects() {
        let catalog = CardCatalog::builtin().unwrap();
        assert_eq!(
            catalog.get_str("orbital_laser").unwrap().spell_effect(),
            EffectKind::EmpWave
        );
        assert!(catalog.get_str("healing_matrix").unwrap().persistent_field);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let ron_text = r#"[
            (id: "a", name: "A", cost: 1, kind: Ground, faction: Human),
            (id: "a", name: "A2", cost: 2, kind: Ground, faction: Human),
        ]"#;
        let err = CardCatalog::from_ron_str(ron_text, "test").unwrap_err();
        assert!(matches!(err, GameError::DuplicateCard(id) if id == "a"));
    }

    #[test]
    fn test_missing_split_child_rejected() {
        let ron_text = r#"[
            (id: "a", name: "A", cost: 1, kind: Ground, faction: Alien, split_child: Some("ghost")),
        ]"#;
        let err = CardCatalog::from_ron_str(ron_text, "test").unwrap_err();
        assert!(matches!(err, GameError::UnknownCard(_)));
    }

    #[test]
    fn test_defaults_applied() {
        let ron_text = r#"[(id: "a", name: "A", cost: 1, kind: Ground, faction: Human)]"#;
        let catalog = CardCatalog::from_ron_str(ron_text, "test").unwrap();
        let card = catalog.get_str("a").unwrap();
        assert_eq!(card.count, 1);
        assert_eq!(card.attack_interval_ms, 1000);
        assert_eq!(card.projectile, ProjectileStyle::None);
        assert!(card.is_melee_single());
    }

    #[test]
    fn test_load_missing_file() {
        let err = CardCatalog::load("/nonexistent/cards.ron").unwrap_err();
        assert!(matches!(err, GameError::DataReadError { .. }));
    }
}
