//! Test fixtures and helpers.
//!
//! Pre-built match states and unit configurations for consistent testing.

use fixed::types::I32F32;

use nexo_core::cards::CardCatalog;
use nexo_core::components::{
    Capabilities, CardId, EntityId, Faction, Lane, ProjectileStyle, StatusTimers, TargetPreference,
    Team, Tower, TowerLane, TowerTier, Unit, UnitKind,
};
use nexo_core::entropy::NoJitter;
use nexo_core::factory::build_unit;
use nexo_core::math::Vec2Fixed;
use nexo_core::rules::MatchRules;
use nexo_core::simulation::Simulation;
use nexo_core::state::MatchState;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Engine over the built-in catalog.
///
/// # Panics
///
/// Panics if the built-in catalog does not parse.
#[must_use]
pub fn standard_sim() -> Simulation {
    Simulation::with_builtin_catalog().expect("built-in catalog parses")
}

/// The built-in catalog.
///
/// # Panics
///
/// Panics if the built-in catalog does not parse.
#[must_use]
pub fn catalog() -> CardCatalog {
    CardCatalog::builtin().expect("built-in catalog parses")
}

/// Playing state with no towers and no units.
#[must_use]
pub fn empty_arena() -> MatchState {
    MatchState::empty(&MatchRules::default())
}

/// Fresh match with the standard tower layout and no decks.
#[must_use]
pub fn standard_match() -> MatchState {
    MatchState::new_match(&MatchRules::default(), Vec::new(), Vec::new())
}

/// Deck of card ids.
#[must_use]
pub fn deck(ids: &[&str]) -> Vec<CardId> {
    ids.iter().map(|id| CardId::new(*id)).collect()
}

/// Standard match with a few units from both sides already in both lanes.
#[must_use]
pub fn skirmish() -> MatchState {
    let catalog = catalog();
    let mut state = standard_match();
    let placements = [
        ("shock_trooper", Team::Player, 420, 150, Lane::Top),
        ("marine_squad", Team::Player, 400, 520, Lane::Bottom),
        ("sky_fighter", Team::Player, 300, 337, Lane::Top),
        ("shock_trooper", Team::Ai, 780, 150, Lane::Top),
        ("nova_brawler", Team::Ai, 800, 520, Lane::Bottom),
        ("field_medic", Team::Ai, 900, 520, Lane::Bottom),
    ];
    for (card, team, x, y, lane) in placements {
        if let Some(def) = catalog.get_str(card) {
            let unit = build_unit(&mut state, def, team, Vec2Fixed::from_ints(x, y), lane);
            state.units.push(unit);
        }
    }
    state
}

/// Spawn a catalog card at a point without jitter and return its first id.
///
/// # Panics
///
/// Panics if the card is unknown or is a spell.
pub fn spawn_card(state: &mut MatchState, card: &str, team: Team, x: i32, y: i32) -> EntityId {
    let catalog = catalog();
    let def = catalog.get_str(card).expect("known card");
    let origin = Vec2Fixed::from_ints(x, y);
    let lane = nexo_core::arena::lane_for_y(origin.y);
    nexo_core::factory::spawn_squad(state, def, team, origin, lane, 0, &mut NoJitter)[0]
}

/// Builder for hand-tuned units.
///
/// Defaults to a 100 hp ground melee unit dealing 20 damage every 1000 ms
/// at range 10.
#[derive(Debug, Clone)]
pub struct UnitBuilder {
    unit: Unit,
}

impl UnitBuilder {
    /// Start a unit for `team` at `(x, y)`.
    #[must_use]
    pub fn new(id: EntityId, team: Team, x: i32, y: i32) -> Self {
        Self {
            unit: Unit {
                id,
                card_id: CardId::new("fixture"),
                team,
                kind: UnitKind::Ground,
                faction: Faction::Human,
                position: Vec2Fixed::from_ints(x, y),
                hp: fixed(100),
                max_hp: fixed(100),
                damage: fixed(20),
                range: fixed(10),
                speed: fixed(40),
                attack_interval_ms: 1000,
                last_attack_ms: 0,
                target: None,
                target_pref: TargetPreference::Any,
                lane: Lane::Top,
                alive: true,
                projectile_style: ProjectileStyle::None,
                aoe_radius: None,
                collision_radius: fixed(22),
                overclocked: false,
                status: StatusTimers::default(),
                capabilities: Capabilities::default(),
            },
        }
    }

    /// Set hp and max hp.
    #[must_use]
    pub fn hp(mut self, hp: i32) -> Self {
        self.unit.hp = fixed(hp);
        self.unit.max_hp = fixed(hp);
        self
    }

    /// Set damage.
    #[must_use]
    pub fn damage(mut self, damage: i32) -> Self {
        self.unit.damage = fixed(damage);
        self
    }

    /// Set range.
    #[must_use]
    pub fn range(mut self, range: i32) -> Self {
        self.unit.range = fixed(range);
        self
    }

    /// Set movement kind.
    #[must_use]
    pub fn kind(mut self, kind: UnitKind) -> Self {
        self.unit.kind = kind;
        self
    }

    /// Set attack style.
    #[must_use]
    pub fn style(mut self, style: ProjectileStyle) -> Self {
        self.unit.projectile_style = style;
        self
    }

    /// Give the attack a splash radius.
    #[must_use]
    pub fn aoe(mut self, radius: i32) -> Self {
        self.unit.aoe_radius = Some(fixed(radius));
        self
    }

    /// Set lane.
    #[must_use]
    pub fn lane(mut self, lane: Lane) -> Self {
        self.unit.lane = lane;
        self
    }

    /// Set speed.
    #[must_use]
    pub fn speed(mut self, speed: i32) -> Self {
        self.unit.speed = fixed(speed);
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> Unit {
        self.unit
    }
}

/// Find a team's tower by tier and lane.
///
/// # Panics
///
/// Panics if the layout has no such tower.
#[must_use]
pub fn tower(state: &MatchState, team: Team, tier: TowerTier, lane: TowerLane) -> &Tower {
    state
        .towers
        .iter()
        .find(|t| t.team == team && t.tier == tier && t.lane == lane)
        .expect("tower in layout")
}

/// Mutable variant of [`tower`].
///
/// # Panics
///
/// Panics if the layout has no such tower.
pub fn tower_mut(state: &mut MatchState, team: Team, tier: TowerTier, lane: TowerLane) -> &mut Tower {
    state
        .towers
        .iter_mut()
        .find(|t| t.team == team && t.tier == tier && t.lane == lane)
        .expect("tower in layout")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_helpers() {
        assert_eq!(fixed(3), I32F32::from_num(3));
        assert_eq!(fixed_f(2.5), fixed(5) / fixed(2));
    }

    #[test]
    fn test_skirmish_layout() {
        let state = skirmish();
        assert_eq!(state.towers.len(), 10);
        assert_eq!(state.units.iter().filter(|u| u.team == Team::Player).count(), 3);
        assert_eq!(state.units.iter().filter(|u| u.team == Team::Ai).count(), 3);
    }

    #[test]
    fn test_builder_defaults() {
        let unit = UnitBuilder::new(1, Team::Ai, 10, 20).hp(50).build();
        assert_eq!(unit.hp, fixed(50));
        assert_eq!(unit.max_hp, fixed(50));
        assert!(unit.is_ground_melee());
    }
}
