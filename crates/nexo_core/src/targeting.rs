//! Target selection.
//!
//! Units and towers deliberately use different strategies: units chase the
//! nearest valid candidate, towers shoot the first enemy unit in range.

use crate::arena::enemy_baseline_x;
use crate::components::{EntityId, TargetPreference, Tower, Unit, UnitKind};
use crate::math::Vec2Fixed;
use crate::state::MatchState;

/// What a unit decided to pursue this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A unit (enemy, or a wounded ally for support units).
    Unit {
        /// Target id.
        id: EntityId,
        /// Position at selection time.
        position: Vec2Fixed,
    },
    /// An enemy tower.
    Tower {
        /// Target id.
        id: EntityId,
        /// Tower position.
        position: Vec2Fixed,
    },
    /// Walk-to point for support units with nobody to heal.
    Retreat {
        /// Destination.
        position: Vec2Fixed,
    },
}

impl Target {
    /// Where the target is.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        match *self {
            Target::Unit { position, .. }
            | Target::Tower { position, .. }
            | Target::Retreat { position } => position,
        }
    }

    /// Entity id, if the target is an entity.
    #[must_use]
    pub const fn id(&self) -> Option<EntityId> {
        match *self {
            Target::Unit { id, .. } | Target::Tower { id, .. } => Some(id),
            Target::Retreat { .. } => None,
        }
    }

    /// Retreat points are never attacked.
    #[must_use]
    pub const fn is_attackable(&self) -> bool {
        !matches!(self, Target::Retreat { .. })
    }
}

/// True if `attacker` may pick `candidate` as an enemy unit target.
#[must_use]
pub fn can_target_unit(attacker: &Unit, candidate: &Unit) -> bool {
    if candidate.team == attacker.team || !candidate.is_active() {
        return false;
    }
    if attacker.is_ground_melee() && candidate.kind == UnitKind::Air {
        return false;
    }
    match attacker.target_pref {
        TargetPreference::Air => candidate.kind == UnitKind::Air,
        TargetPreference::Towers => false,
        TargetPreference::Any | TargetPreference::Allies => true,
    }
}

/// True if `attacker` may pick `tower` as a target.
#[must_use]
pub fn can_target_tower(attacker: &Unit, tower: &Tower) -> bool {
    tower.team != attacker.team
        && tower.is_targetable()
        && attacker.target_pref != TargetPreference::Air
}

/// Nearest-candidate strategy used by units.
///
/// Ties keep the earliest candidate: units in list order, then towers.
#[must_use]
pub fn nearest_target(unit: &Unit, state: &MatchState) -> Option<Target> {
    if unit.target_pref == TargetPreference::Allies {
        return Some(nearest_patient(unit, state).unwrap_or(Target::Retreat {
            position: Vec2Fixed::new(enemy_baseline_x(unit.team), unit.position.y),
        }));
    }

    let units = state
        .units
        .iter()
        .filter(|candidate| can_target_unit(unit, candidate))
        .map(|u| Target::Unit {
            id: u.id,
            position: u.position,
        });
    let towers = state
        .towers
        .iter()
        .filter(|tower| can_target_tower(unit, tower))
        .map(|t| Target::Tower {
            id: t.id,
            position: t.position,
        });

    pick_nearest(unit.position, units.chain(towers))
}

fn nearest_patient(unit: &Unit, state: &MatchState) -> Option<Target> {
    let patients = state
        .units
        .iter()
        .filter(|ally| {
            ally.team == unit.team && ally.id != unit.id && ally.is_active() && ally.hp < ally.max_hp
        })
        .map(|ally| Target::Unit {
            id: ally.id,
            position: ally.position,
        });
    pick_nearest(unit.position, patients)
}

fn pick_nearest(origin: Vec2Fixed, candidates: impl Iterator<Item = Target>) -> Option<Target> {
    let mut best: Option<(Target, _)> = None;
    for candidate in candidates {
        let dist = origin.distance_squared(candidate.position());
        match best {
            Some((_, best_dist)) if best_dist <= dist => {}
            _ => best = Some((candidate, dist)),
        }
    }
    best.map(|(target, _)| target)
}

/// First-in-range strategy used by towers: the first living enemy unit in
/// list order within range, regardless of distance ranking.
#[must_use]
pub fn first_in_range(tower: &Tower, units: &[Unit]) -> Option<EntityId> {
    units
        .iter()
        .find(|u| u.team != tower.team && u.is_active() && tower.position.within(u.position, tower.range))
        .map(|u| u.id)
}
