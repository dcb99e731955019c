//! EMP pulse around the arena center.

use serde::{Deserialize, Serialize};

use crate::abilities::{charge, precheck};
use crate::arena::center;
use crate::combat::{apply_damage, Victim};
use crate::components::{EffectKind, Team};
use crate::error::ActionRejected;
use crate::math::Fixed;
use crate::state::MatchState;

/// Energy cost.
pub const COST: u32 = 3;

/// Cooldown after a cast.
pub const COOLDOWN_MS: u32 = 24_000;

/// Pulse radius around the arena center.
pub const RADIUS: i32 = 260;

/// EMP mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmpMode {
    /// Long stun, no damage.
    Lockdown,
    /// Shorter stun with damage.
    Disruptor,
}

impl EmpMode {
    /// Stun applied to each unit hit.
    #[must_use]
    pub const fn stun_ms(self) -> u32 {
        match self {
            EmpMode::Lockdown => 3600,
            EmpMode::Disruptor => 1800,
        }
    }

    /// Damage dealt to each unit hit.
    #[must_use]
    pub const fn damage(self) -> i32 {
        match self {
            EmpMode::Lockdown => 0,
            EmpMode::Disruptor => 70,
        }
    }
}

/// Stun (and in disruptor mode damage) every living enemy unit near the
/// center.
///
/// # Errors
///
/// Fails the shared ability checks.
pub fn resolve(state: &MatchState, team: Team, mode: EmpMode) -> Result<MatchState, ActionRejected> {
    precheck(state, team, COST)?;

    let mut next = state.clone();
    let origin = center();
    let radius = Fixed::from_num(RADIUS);
    let enemy = team.opponent();
    let hit: Vec<u64> = next
        .units
        .iter()
        .filter(|u| u.team == enemy && u.is_active() && origin.within(u.position, radius))
        .map(|u| u.id)
        .collect();

    for &id in &hit {
        if let Some(unit) = next.units.iter_mut().find(|u| u.id == id) {
            unit.status.stun_ms = unit.status.stun_ms.max(mode.stun_ms());
        }
        apply_damage(&mut next, Victim::Unit(id), Fixed::from_num(mode.damage()), team);
    }

    next.push_effect(EffectKind::EmpWave, origin, 1000, Some(radius), Some(team));
    charge(&mut next, team, COST, COOLDOWN_MS);
    tracing::debug!(?team, ?mode, hit = hit.len(), "emp pulse");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardCatalog;
    use crate::components::Lane;
    use crate::factory::build_unit;
    use crate::math::Vec2Fixed;
    use crate::rules::MatchRules;

    fn arena_with_enemies() -> MatchState {
        let catalog = CardCatalog::builtin().unwrap();
        let mut state = MatchState::empty(&MatchRules::default());
        let trooper = catalog.get_str("shock_trooper").unwrap();
        for (x, y) in [(600, 337), (650, 300), (560, 400)] {
            let unit = build_unit(&mut state, trooper, Team::Ai, Vec2Fixed::from_ints(x, y), Lane::Top);
            state.units.push(unit);
        }
        let far = build_unit(&mut state, trooper, Team::Ai, Vec2Fixed::from_ints(1000, 337), Lane::Top);
        state.units.push(far);
        let ally = build_unit(&mut state, trooper, Team::Player, Vec2Fixed::from_ints(600, 337), Lane::Top);
        state.units.push(ally);
        state
    }

    #[test]
    fn test_lockdown_stuns_without_damage() {
        let state = arena_with_enemies();
        let next = resolve(&state, Team::Player, EmpMode::Lockdown).unwrap();
        let hit: Vec<_> = next.units.iter().filter(|u| u.status.stun_ms > 0).collect();
        assert_eq!(hit.len(), 3);
        assert!(hit.iter().all(|u| u.team == Team::Ai && u.status.stun_ms == 3600));
        assert!(next.units.iter().all(|u| u.hp == Fixed::from_num(620)));
        assert_eq!(next.energy.player, Fixed::from_num(2));
        assert_eq!(next.ability_cooldown_ms.player, COOLDOWN_MS);
        assert_eq!(next.energy.ai, state.energy.ai);
    }

    #[test]
    fn test_disruptor_damages_and_stuns_shorter() {
        let state = arena_with_enemies();
        let next = resolve(&state, Team::Player, EmpMode::Disruptor).unwrap();
        let hit: Vec<_> = next.units.iter().filter(|u| u.status.stun_ms > 0).collect();
        assert_eq!(hit.len(), 3);
        assert!(hit.iter().all(|u| u.status.stun_ms == 1800 && u.hp == Fixed::from_num(550)));
        assert_eq!(next.damage_taken.ai, Fixed::from_num(210));
    }

    #[test]
    fn test_rejected_cast_leaves_state_alone() {
        let mut state = arena_with_enemies();
        state.energy.player = Fixed::from_num(2);
        assert!(resolve(&state, Team::Player, EmpMode::Lockdown).is_err());
        assert!(state.units.iter().all(|u| u.status.stun_ms == 0));
    }
}
