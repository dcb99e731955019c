//! Entity factory: turns card definitions into runtime units.
//!
//! Shared by normal deploys, ability spawns, hive cycles, mothership drops
//! and split-on-death children.

use crate::arena::clamp_to_arena;
use crate::cards::{CardDef, DEFAULT_COLLISION_RADIUS};
use crate::components::{Capabilities, EntityId, Lane, SplitOnDeath, StatusTimers, Team, Unit};
use crate::entropy::Entropy;
use crate::math::{Fixed, Vec2Fixed};
use crate::state::MatchState;

/// Jitter applied to each copy of a multi-unit deploy.
pub const DEPLOY_SPREAD: i32 = 40;

/// Build one unit from a card. Allocates an id but does not insert it.
#[must_use]
pub fn build_unit(
    state: &mut MatchState,
    card: &CardDef,
    team: Team,
    position: Vec2Fixed,
    lane: Lane,
) -> Unit {
    let id = state.next_id();
    let hp = Fixed::from_num(card.hp);
    Unit {
        id,
        card_id: card.id.clone(),
        team,
        kind: card.kind,
        faction: card.faction,
        position: clamp_to_arena(position),
        hp,
        max_hp: hp,
        damage: card.damage_fixed(),
        range: Fixed::from_num(card.range),
        speed: Fixed::from_num(card.speed),
        attack_interval_ms: card.attack_interval_ms,
        last_attack_ms: 0,
        target: None,
        target_pref: card.target_pref,
        lane,
        alive: true,
        projectile_style: card.projectile,
        aoe_radius: card.aoe_radius.map(Fixed::from_num),
        collision_radius: Fixed::from_num(card.collision_radius.unwrap_or(DEFAULT_COLLISION_RADIUS)),
        overclocked: false,
        status: StatusTimers::default(),
        capabilities: Capabilities {
            split: card.split_child.clone().map(|child_card| SplitOnDeath { child_card }),
            ..Capabilities::default()
        },
    }
}

/// Spawn every copy of a card around `origin` and insert them.
///
/// Each copy is offset by up to `spread` units on both axes. Spell cards
/// spawn nothing. Returns the new unit ids in spawn order.
pub fn spawn_squad(
    state: &mut MatchState,
    card: &CardDef,
    team: Team,
    origin: Vec2Fixed,
    lane: Lane,
    spread: i32,
    entropy: &mut dyn Entropy,
) -> Vec<EntityId> {
    if card.is_spell() {
        return Vec::new();
    }
    let mut ids = Vec::with_capacity(card.count as usize);
    for _ in 0..card.count.max(1) {
        let position = entropy.jitter_point(origin, spread);
        let unit = build_unit(state, card, team, position, lane);
        ids.push(unit.id);
        state.units.push(unit);
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardCatalog;
    use crate::entropy::{NoJitter, SeededEntropy};
    use crate::rules::MatchRules;

    #[test]
    fn test_build_unit_copies_stats() {
        let catalog = CardCatalog::builtin().unwrap();
        let card = catalog.get_str("shock_trooper").unwrap();
        let mut state = MatchState::empty(&MatchRules::default());
        let unit = build_unit(&mut state, card, Team::Player, Vec2Fixed::from_ints(200, 300), Lane::Top);
        assert_eq!(unit.hp, Fixed::from_num(620));
        assert_eq!(unit.max_hp, unit.hp);
        assert_eq!(unit.collision_radius, Fixed::from_num(22));
        assert!(unit.alive);
        assert!(state.units.is_empty());
    }

    #[test]
    fn test_spawn_squad_count_and_ids() {
        let catalog = CardCatalog::builtin().unwrap();
        let card = catalog.get_str("marine_squad").unwrap();
        let mut state = MatchState::empty(&MatchRules::default());
        let ids = spawn_squad(
            &mut state,
            card,
            Team::Ai,
            Vec2Fixed::from_ints(900, 300),
            Lane::Top,
            DEPLOY_SPREAD,
            &mut SeededEntropy::new(3),
        );
        assert_eq!(ids.len(), 3);
        assert_eq!(state.units.len(), 3);
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_spawn_without_jitter_stacks_on_origin() {
        let catalog = CardCatalog::builtin().unwrap();
        let card = catalog.get_str("plasma_drones").unwrap();
        let mut state = MatchState::empty(&MatchRules::default());
        let origin = Vec2Fixed::from_ints(300, 200);
        spawn_squad(&mut state, card, Team::Player, origin, Lane::Top, DEPLOY_SPREAD, &mut NoJitter);
        assert!(state.units.iter().all(|u| u.position == origin));
    }

    #[test]
    fn test_spell_spawns_nothing() {
        let catalog = CardCatalog::builtin().unwrap();
        let card = catalog.get_str("plasma_bomb").unwrap();
        let mut state = MatchState::empty(&MatchRules::default());
        let ids = spawn_squad(
            &mut state,
            card,
            Team::Player,
            Vec2Fixed::from_ints(300, 200),
            Lane::Top,
            DEPLOY_SPREAD,
            &mut NoJitter,
        );
        assert!(ids.is_empty());
    }
}
