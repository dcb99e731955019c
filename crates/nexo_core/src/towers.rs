//! Tower behaviour: first-in-range fire, the defensive shockwave and
//! destruction.

use tracing::info;

use crate::arena::clamp_to_arena;
use crate::movement::clamp_to_bridge;
use crate::combat::Victim;
use crate::components::{EffectKind, ProjectileStyle, TowerTier, UnitKind};
use crate::math::Fixed;
use crate::projectiles::{launch, Launch};
use crate::state::{MatchState, MatchStatus};
use crate::targeting::first_in_range;

/// Distance at which ground enemies trigger the shockwave.
pub const SHOCKWAVE_RADIUS: i32 = 120;

/// Knock-back distance.
pub const SHOCKWAVE_PUSH: i32 = 60;

/// Stun applied to knocked-back units.
pub const SHOCKWAVE_STUN_MS: u32 = 1000;

/// Shockwave cooldown.
pub const SHOCKWAVE_COOLDOWN_MS: u32 = 15_000;

/// Run shockwaves and attacks for every living tower.
pub fn tick_towers(state: &mut MatchState, delta_ms: u32) {
    for index in 0..state.towers.len() {
        let tower = &mut state.towers[index];
        if !tower.alive || tower.hp <= Fixed::ZERO {
            continue;
        }
        tower.shockwave_cooldown_ms = tower.shockwave_cooldown_ms.saturating_sub(delta_ms);
        if tower.shockwave_cooldown_ms == 0 {
            try_shockwave(state, index);
        }
        tower_attack(state, index);
    }
}

fn try_shockwave(state: &mut MatchState, index: usize) {
    let tower = &state.towers[index];
    let radius = Fixed::from_num(SHOCKWAVE_RADIUS);
    let nearby: Vec<usize> = state
        .units
        .iter()
        .enumerate()
        .filter(|(_, u)| {
            u.team != tower.team
                && u.kind == UnitKind::Ground
                && u.is_active()
                && tower.position.distance_squared(u.position) < radius * radius
        })
        .map(|(i, _)| i)
        .collect();

    let wounded = tower.hp < tower.max_hp / Fixed::from_num(2);
    if nearby.len() < 2 && !(nearby.len() == 1 && wounded) {
        return;
    }

    let origin = tower.position;
    let team = tower.team;
    let push = Fixed::from_num(SHOCKWAVE_PUSH);
    for i in nearby {
        let unit = &mut state.units[i];
        let away = (unit.position - origin).normalize();
        let pushed = clamp_to_bridge(unit.position, unit.position + away.scale(push));
        unit.position = clamp_to_arena(pushed);
        unit.status.stun_ms = unit.status.stun_ms.max(SHOCKWAVE_STUN_MS);
    }
    state.towers[index].shockwave_cooldown_ms = SHOCKWAVE_COOLDOWN_MS;
    state.push_effect(
        EffectKind::Shockwave,
        origin,
        600,
        Some(Fixed::from_num(150)),
        Some(team),
    );
}

fn tower_attack(state: &mut MatchState, index: usize) {
    let tower = &state.towers[index];
    let elapsed = state.time_ms.saturating_sub(tower.last_attack_ms);
    if elapsed < u64::from(tower.attack_interval_ms) {
        return;
    }
    let Some(target) = first_in_range(tower, &state.units) else {
        return;
    };
    let Some(target_position) = state.unit(target).map(|u| u.position) else {
        return;
    };
    let (origin, team, damage) = (tower.position, tower.team, tower.damage);

    state.towers[index].last_attack_ms = state.time_ms;
    launch(
        state,
        Launch {
            origin,
            target: Victim::Unit(target),
            target_position,
            damage,
            team,
            style: ProjectileStyle::Plasma,
            on_hit: None,
            source_unit: None,
            from_tower: true,
            from_air: false,
        },
    );
    state.push_effect(EffectKind::Muzzle, origin, 200, None, Some(team));
}

/// Mark towers at zero hp as destroyed and end the match when that decides it.
///
/// A fallen king always decides the match; during sudden death any fallen
/// tower does.
pub fn resolve_tower_deaths(state: &mut MatchState) {
    let fallen: Vec<usize> = state
        .towers
        .iter()
        .enumerate()
        .filter(|(_, t)| t.alive && t.hp <= Fixed::ZERO)
        .map(|(i, _)| i)
        .collect();
    if fallen.is_empty() {
        return;
    }

    let ruin_ms = u32::try_from(state.remaining_ms()).unwrap_or(u32::MAX);
    for index in fallen {
        let tower = &mut state.towers[index];
        tower.alive = false;
        tower.hp = Fixed::ZERO;
        let (position, team, tier) = (tower.position, tower.team, tower.tier);
        info!(?team, ?tier, time_ms = state.time_ms, "tower destroyed");

        state.push_effect(EffectKind::Explosion, position, 1200, Some(Fixed::from_num(80)), Some(team));
        state.push_effect(EffectKind::TowerRuin, position, ruin_ms, None, Some(team));

        if state.status == MatchStatus::Playing && (tier == TowerTier::King || state.sudden_death) {
            state.status = MatchStatus::win_for(team.opponent());
            info!(status = ?state.status, "match decided by tower destruction");
        }
    }
    state.refresh_lane_locks();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardCatalog;
    use crate::components::{Lane, Team, TowerLane};
    use crate::factory::build_unit;
    use crate::math::Vec2Fixed;
    use crate::rules::MatchRules;

    fn fresh() -> MatchState {
        MatchState::new_match(&MatchRules::default(), Vec::new(), Vec::new())
    }

    fn place(state: &mut MatchState, card: &str, team: Team, x: i32, y: i32) -> u64 {
        let catalog = CardCatalog::builtin().unwrap();
        let unit = build_unit(state, catalog.get_str(card).unwrap(), team, Vec2Fixed::from_ints(x, y), Lane::Top);
        let id = unit.id;
        state.units.push(unit);
        id
    }

    fn player_outer_top(state: &MatchState) -> usize {
        state
            .towers
            .iter()
            .position(|t| t.team == Team::Player && t.tier == TowerTier::Outer && t.lane == TowerLane::Top)
            .unwrap()
    }

    #[test]
    fn test_tower_fires_plasma_projectile() {
        let mut state = fresh();
        state.time_ms = 2000;
        let target = place(&mut state, "sky_fighter", Team::Ai, 500, 157);
        tick_towers(&mut state, 16);
        let shot = state.projectiles.iter().find(|p| p.from_tower).unwrap();
        assert_eq!(shot.target, target);
        assert_eq!(shot.style, ProjectileStyle::Plasma);

        // Interval not elapsed: no second shot.
        let count = state.projectiles.len();
        tick_towers(&mut state, 16);
        assert_eq!(state.projectiles.len(), count);
    }

    #[test]
    fn test_shockwave_needs_two_or_wounded() {
        let mut state = fresh();
        let index = player_outer_top(&state);
        let pos = state.towers[index].position;
        let x = pos.x.to_num::<i32>();
        let y = pos.y.to_num::<i32>();
        let lone = place(&mut state, "shock_trooper", Team::Ai, x + 50, y);
        tick_towers(&mut state, 16);
        assert_eq!(state.unit(lone).unwrap().status.stun_ms, 0);

        state.towers[index].hp = Fixed::from_num(100);
        tick_towers(&mut state, 16);
        let unit = state.unit(lone).unwrap();
        assert_eq!(unit.status.stun_ms, SHOCKWAVE_STUN_MS);
        assert!(unit.position.x > Fixed::from_num(x + 105));
        assert!(pos.distance(unit.position) > Fixed::from_num(105));
        assert_eq!(state.towers[index].shockwave_cooldown_ms, SHOCKWAVE_COOLDOWN_MS);
        assert!(state.effects.iter().any(|e| e.kind == EffectKind::Shockwave));
    }

    #[test]
    fn test_shockwave_cannot_push_through_the_wall() {
        let mut state = fresh();
        let index = state
            .towers
            .iter()
            .position(|t| t.team == Team::Ai && t.tier == TowerTier::Outer && t.lane == TowerLane::Top)
            .unwrap();
        state.towers[index].position = Vec2Fixed::from_ints(660, 337);
        let a = place(&mut state, "shock_trooper", Team::Player, 610, 337);
        let b = place(&mut state, "shock_trooper", Team::Player, 610, 350);
        let before = [state.unit(a).unwrap().position, state.unit(b).unwrap().position];

        tick_towers(&mut state, 16);

        for (id, from) in [a, b].into_iter().zip(before) {
            let unit = state.unit(id).unwrap();
            assert_eq!(unit.status.stun_ms, SHOCKWAVE_STUN_MS);
            assert!(unit.position.x > Fixed::from_num(600), "unit {id} knocked through the wall");
            assert_ne!(unit.position, from);
        }
    }

    #[test]
    fn test_shockwave_ignores_air() {
        let mut state = fresh();
        let index = player_outer_top(&state);
        let pos = state.towers[index].position;
        let x = pos.x.to_num::<i32>();
        let y = pos.y.to_num::<i32>();
        let a = place(&mut state, "sky_fighter", Team::Ai, x + 30, y);
        let b = place(&mut state, "sky_fighter", Team::Ai, x + 40, y);
        tick_towers(&mut state, 16);
        assert_eq!(state.unit(a).unwrap().status.stun_ms, 0);
        assert_eq!(state.unit(b).unwrap().status.stun_ms, 0);
    }

    #[test]
    fn test_outer_death_unlocks_inner_and_keeps_playing() {
        let mut state = fresh();
        let index = player_outer_top(&state);
        state.towers[index].hp = Fixed::ZERO;
        resolve_tower_deaths(&mut state);
        assert!(!state.towers[index].alive);
        assert_eq!(state.status, MatchStatus::Playing);
        assert_eq!(state.destroyed_towers(Team::Player), 1);
        let inner = state
            .towers
            .iter()
            .find(|t| t.team == Team::Player && t.tier == TowerTier::Inner && t.lane == TowerLane::Top)
            .unwrap();
        assert!(!inner.locked);
        assert!(state.effects.iter().any(|e| e.kind == EffectKind::TowerRuin));
    }

    #[test]
    fn test_king_death_ends_match() {
        let mut state = fresh();
        let king = state.towers.iter().position(|t| t.team == Team::Ai && t.tier == TowerTier::King).unwrap();
        state.towers[king].hp = Fixed::ZERO;
        resolve_tower_deaths(&mut state);
        assert_eq!(state.status, MatchStatus::Victory);
    }

    #[test]
    fn test_any_tower_ends_sudden_death() {
        let mut state = fresh();
        state.sudden_death = true;
        let index = player_outer_top(&state);
        state.towers[index].hp = Fixed::ZERO;
        resolve_tower_deaths(&mut state);
        assert_eq!(state.status, MatchStatus::Defeat);
    }
}
