//! Combat resolution: hits, area splash, healing, status effects and the
//! dual health pool.
//!
//! All damage goes through [`apply_damage`] so the mecha shield ordering,
//! the zero floor and the damage metrics are applied in exactly one place.

use crate::components::{EffectKind, EntityId, OnHitEffect, Team, Unit, UnitKind};
use crate::math::{ratio, Fixed, Vec2Fixed};
use crate::state::MatchState;

/// Poison drain in hp per millisecond (7.5 hp/s).
#[must_use]
pub fn dot_rate_per_ms() -> Fixed {
    ratio(3, 400)
}

/// Something that can be hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Victim {
    /// A unit by id.
    Unit(EntityId),
    /// A tower by id.
    Tower(EntityId),
}

impl Victim {
    /// Resolve an id against the state; units are checked first.
    #[must_use]
    pub fn find(state: &MatchState, id: EntityId) -> Option<Self> {
        if state.units.iter().any(|u| u.id == id) {
            Some(Victim::Unit(id))
        } else if state.towers.iter().any(|t| t.id == id) {
            Some(Victim::Tower(id))
        } else {
            None
        }
    }

    /// Current position and liveness.
    #[must_use]
    pub fn locate(self, state: &MatchState) -> Option<(Vec2Fixed, Team, bool)> {
        match self {
            Victim::Unit(id) => state
                .unit(id)
                .map(|u| (u.position, u.team, u.is_active())),
            Victim::Tower(id) => state
                .tower(id)
                .map(|t| (t.position, t.team, t.alive && t.hp > Fixed::ZERO)),
        }
    }
}

/// Everything needed to resolve an attack after it leaves the attacker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackProfile {
    /// Attacking side.
    pub team: Team,
    /// Damage (negative heals).
    pub damage: Fixed,
    /// Secondary effect.
    pub on_hit: Option<OnHitEffect>,
    /// Splash radius, if the attack splashes.
    pub aoe_radius: Option<Fixed>,
    /// Ground attacker without a projectile.
    pub ground_melee: bool,
    /// Attacking unit, if any.
    pub source_unit: Option<EntityId>,
}

impl AttackProfile {
    /// Profile for a unit's own attack.
    #[must_use]
    pub fn from_unit(unit: &Unit) -> Self {
        Self {
            team: unit.team,
            damage: unit.damage,
            on_hit: unit.capabilities.on_hit,
            aoe_radius: unit.aoe_radius,
            ground_melee: unit.is_ground_melee(),
            source_unit: Some(unit.id),
        }
    }

    /// Profile for a tower shot.
    #[must_use]
    pub fn tower(team: Team, damage: Fixed) -> Self {
        Self {
            team,
            damage,
            on_hit: None,
            aoe_radius: None,
            ground_melee: false,
            source_unit: None,
        }
    }
}

/// Remove hp from a victim, shield first, never below zero.
///
/// Records the damage actually removed as taken by the victim's side and
/// dealt by `attacker`. Returns that amount.
pub fn apply_damage(state: &mut MatchState, victim: Victim, amount: Fixed, attacker: Team) -> Fixed {
    if amount <= Fixed::ZERO {
        return Fixed::ZERO;
    }
    let (removed, victim_team, is_tower) = match victim {
        Victim::Unit(id) => {
            let Some(unit) = state.units.iter_mut().find(|u| u.id == id && u.is_active()) else {
                return Fixed::ZERO;
            };
            (damage_unit(unit, amount), unit.team, false)
        }
        Victim::Tower(id) => {
            let Some(tower) = state
                .towers
                .iter_mut()
                .find(|t| t.id == id && t.alive && t.hp > Fixed::ZERO)
            else {
                return Fixed::ZERO;
            };
            let removed = amount.min(tower.hp);
            tower.hp -= removed;
            (removed, tower.team, true)
        }
    };

    *state.damage_taken.get_mut(victim_team) += removed;
    *state.metrics.damage_dealt.get_mut(attacker) += removed;
    if is_tower {
        *state.metrics.tower_damage_dealt.get_mut(attacker) += removed;
    }
    removed
}

/// Shield-then-hp damage on a single unit. Marks it dead at zero hp.
pub fn damage_unit(unit: &mut Unit, amount: Fixed) -> Fixed {
    let mut remaining = amount;
    let mut removed = Fixed::ZERO;
    if let Some(pool) = unit.capabilities.dual_pool.as_mut() {
        let absorbed = remaining.min(pool.shield_hp);
        pool.shield_hp -= absorbed;
        remaining -= absorbed;
        removed += absorbed;
    }
    let lost = remaining.min(unit.hp);
    unit.hp -= lost;
    removed += lost;
    if unit.hp <= Fixed::ZERO {
        unit.hp = Fixed::ZERO;
        unit.alive = false;
    }
    removed
}

/// Restore hp, capped at the maximum. Dead targets are ignored.
pub fn apply_heal(state: &mut MatchState, victim: Victim, amount: Fixed) {
    if amount <= Fixed::ZERO {
        return;
    }
    match victim {
        Victim::Unit(id) => {
            if let Some(unit) = state.units.iter_mut().find(|u| u.id == id && u.is_active()) {
                unit.hp = (unit.hp + amount).min(unit.max_hp);
            }
        }
        Victim::Tower(id) => {
            if let Some(tower) = state.towers.iter_mut().find(|t| t.id == id && t.alive) {
                tower.hp = (tower.hp + amount).min(tower.max_hp);
            }
        }
    }
}

/// Kill a unit outright (kamikaze attackers).
pub fn kill_unit(state: &mut MatchState, id: EntityId) {
    if let Some(unit) = state.units.iter_mut().find(|u| u.id == id) {
        unit.hp = Fixed::ZERO;
        unit.alive = false;
    }
}

/// Apply a landed attack.
///
/// In priority order: heal on-hit helps allies only; splash hits every valid
/// enemy around `impact` (only when `allow_splash`); otherwise the single
/// victim is healed or damaged. Poison on-hit then refreshes the victim's
/// timer and a kamikaze attacker dies.
pub fn resolve_hit(
    state: &mut MatchState,
    profile: &AttackProfile,
    victim: Victim,
    impact: Vec2Fixed,
    allow_splash: bool,
) {
    let Some((victim_pos, victim_team, true)) = victim.locate(state) else {
        return;
    };
    if profile.ground_melee && victim_is_air(state, victim) {
        return;
    }

    if profile.on_hit == Some(OnHitEffect::Heal) {
        if victim_team == profile.team {
            apply_heal(state, victim, profile.damage.abs());
            state.push_effect(EffectKind::Heal, victim_pos, 400, None, Some(profile.team));
        }
    } else if let (Some(radius), true) = (profile.aoe_radius, allow_splash) {
        splash(state, profile, impact, radius);
    } else if profile.damage < Fixed::ZERO {
        apply_heal(state, victim, profile.damage.abs());
        state.push_effect(EffectKind::Heal, victim_pos, 400, None, Some(profile.team));
    } else {
        apply_damage(state, victim, profile.damage, profile.team);
    }

    if let Some(OnHitEffect::Poison { dot_ms, kamikaze }) = profile.on_hit {
        if let Victim::Unit(id) = victim {
            if let Some(unit) = state.units.iter_mut().find(|u| u.id == id && u.is_active()) {
                unit.status.dot_ms = unit.status.dot_ms.max(dot_ms);
            }
        }
        if kamikaze {
            if let Some(source) = profile.source_unit {
                kill_unit(state, source);
            }
        }
    }
}

fn victim_is_air(state: &MatchState, victim: Victim) -> bool {
    match victim {
        Victim::Unit(id) => state.unit(id).is_some_and(|u| u.kind == UnitKind::Air),
        Victim::Tower(_) => false,
    }
}

/// Damage every living enemy unit and tower within `radius` of `impact`.
///
/// Ground melee splash skips air units. Splash is not targeting, so locked
/// towers are hit too.
fn splash(state: &mut MatchState, profile: &AttackProfile, impact: Vec2Fixed, radius: Fixed) {
    let enemy = profile.team.opponent();
    let mut victims: Vec<Victim> = state
        .units
        .iter()
        .filter(|u| u.team == enemy && u.is_active() && impact.within(u.position, radius))
        .filter(|u| !(profile.ground_melee && u.kind == UnitKind::Air))
        .map(|u| Victim::Unit(u.id))
        .collect();
    victims.extend(
        state
            .towers
            .iter()
            .filter(|t| t.team == enemy && t.alive && impact.within(t.position, radius))
            .map(|t| Victim::Tower(t.id)),
    );
    for victim in victims {
        apply_damage(state, victim, profile.damage, profile.team);
    }
    state.push_effect(EffectKind::Explosion, impact, 300, Some(radius), Some(profile.team));
}

/// One-time overtime buff: +20% max hp to both hp and max hp.
///
/// Returns false if the unit was already overclocked.
pub fn overclock(unit: &mut Unit) -> bool {
    if unit.overclocked {
        return false;
    }
    let bonus = unit.max_hp / Fixed::from_num(5);
    unit.hp += bonus;
    unit.max_hp += bonus;
    unit.overclocked = true;
    true
}

/// Poison drain for this tick; advances the timer.
pub fn tick_poison(unit: &mut Unit, delta_ms: u32) -> Fixed {
    if unit.status.dot_ms == 0 {
        return Fixed::ZERO;
    }
    let active = delta_ms.min(unit.status.dot_ms);
    unit.status.dot_ms -= active;
    dot_rate_per_ms() * Fixed::from_num(active)
}

/// True if this attack lands immediately instead of launching a projectile.
#[must_use]
pub fn resolves_instantly(unit: &Unit) -> bool {
    unit.aoe_radius.is_some() || unit.projectile_style.is_instant()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        Capabilities, DualHealthPool, Faction, Lane, MechaMode, ProjectileStyle, StatusTimers,
        TargetPreference,
    };
    use crate::components::CardId;
    use crate::rules::MatchRules;

    fn unit(id: EntityId, team: Team, x: i32, kind: UnitKind, hp: i32) -> Unit {
        Unit {
            id,
            card_id: CardId::new("test"),
            team,
            kind,
            faction: Faction::Human,
            position: Vec2Fixed::from_ints(x, 300),
            hp: Fixed::from_num(hp),
            max_hp: Fixed::from_num(hp),
            damage: Fixed::from_num(20),
            range: Fixed::from_num(10),
            speed: Fixed::from_num(40),
            attack_interval_ms: 1000,
            last_attack_ms: 0,
            target: None,
            target_pref: TargetPreference::Any,
            lane: Lane::Top,
            alive: true,
            projectile_style: ProjectileStyle::None,
            aoe_radius: None,
            collision_radius: Fixed::from_num(22),
            overclocked: false,
            status: StatusTimers::default(),
            capabilities: Capabilities::default(),
        }
    }

    fn state_with(units: Vec<Unit>) -> MatchState {
        let mut state = MatchState::empty(&MatchRules::default());
        state.next_entity_id = 100;
        state.units = units;
        state
    }

    #[test]
    fn test_shield_absorbs_before_hp() {
        let mut mecha = unit(1, Team::Ai, 300, UnitKind::Ground, 100);
        mecha.capabilities.dual_pool = Some(DualHealthPool {
            shield_hp: Fixed::from_num(50),
            shield_max: Fixed::from_num(600),
            mode: MechaMode::Shield,
            beam: None,
        });
        let mut state = state_with(vec![mecha]);
        let removed = apply_damage(&mut state, Victim::Unit(1), Fixed::from_num(80), Team::Player);
        let mecha = state.unit(1).unwrap();
        assert_eq!(mecha.capabilities.dual_pool.unwrap().shield_hp, Fixed::ZERO);
        assert_eq!(mecha.hp, Fixed::from_num(70));
        assert_eq!(removed, Fixed::from_num(80));
        assert_eq!(state.damage_taken.ai, Fixed::from_num(80));
        assert_eq!(state.metrics.damage_dealt.player, Fixed::from_num(80));
    }

    #[test]
    fn test_hp_never_negative() {
        let mut state = state_with(vec![unit(1, Team::Ai, 300, UnitKind::Ground, 30)]);
        let removed = apply_damage(&mut state, Victim::Unit(1), Fixed::from_num(500), Team::Player);
        let victim = state.unit(1).unwrap();
        assert_eq!(victim.hp, Fixed::ZERO);
        assert!(!victim.alive);
        assert_eq!(removed, Fixed::from_num(30));
    }

    #[test]
    fn test_tower_damage_metrics() {
        let mut state = MatchState::new_match(&MatchRules::default(), Vec::new(), Vec::new());
        let tower_id = state.towers.iter().find(|t| t.team == Team::Ai).unwrap().id;
        apply_damage(&mut state, Victim::Tower(tower_id), Fixed::from_num(40), Team::Player);
        assert_eq!(state.metrics.tower_damage_dealt.player, Fixed::from_num(40));
        assert_eq!(state.metrics.damage_dealt.player, Fixed::from_num(40));
        assert_eq!(state.metrics.tower_damage_dealt.ai, Fixed::ZERO);
    }

    #[test]
    fn test_heal_on_hit_ignores_enemies() {
        let healer = unit(1, Team::Player, 300, UnitKind::Ground, 100);
        let mut enemy = unit(2, Team::Ai, 310, UnitKind::Ground, 100);
        enemy.hp = Fixed::from_num(50);
        let mut ally = unit(3, Team::Player, 290, UnitKind::Ground, 100);
        ally.hp = Fixed::from_num(50);
        let mut state = state_with(vec![healer.clone(), enemy, ally]);
        let mut profile = AttackProfile::from_unit(&healer);
        profile.on_hit = Some(OnHitEffect::Heal);

        resolve_hit(&mut state, &profile, Victim::Unit(2), Vec2Fixed::from_ints(310, 300), true);
        assert_eq!(state.unit(2).unwrap().hp, Fixed::from_num(50));

        resolve_hit(&mut state, &profile, Victim::Unit(3), Vec2Fixed::from_ints(290, 300), true);
        assert_eq!(state.unit(3).unwrap().hp, Fixed::from_num(70));
    }

    #[test]
    fn test_negative_damage_heal_is_capped() {
        let mut healer = unit(1, Team::Player, 300, UnitKind::Ground, 100);
        healer.damage = Fixed::from_num(-40);
        let mut ally = unit(2, Team::Player, 310, UnitKind::Ground, 100);
        ally.hp = Fixed::from_num(90);
        let mut state = state_with(vec![healer.clone(), ally]);
        let profile = AttackProfile::from_unit(&healer);
        resolve_hit(&mut state, &profile, Victim::Unit(2), Vec2Fixed::from_ints(310, 300), true);
        assert_eq!(state.unit(2).unwrap().hp, Fixed::from_num(100));
    }

    #[test]
    fn test_ground_melee_splash_skips_air() {
        let mut attacker = unit(1, Team::Player, 300, UnitKind::Ground, 100);
        attacker.aoe_radius = Some(Fixed::from_num(50));
        let ground = unit(2, Team::Ai, 310, UnitKind::Ground, 100);
        let air = unit(3, Team::Ai, 320, UnitKind::Air, 100);
        let mut state = state_with(vec![attacker.clone(), ground, air]);
        let profile = AttackProfile::from_unit(&attacker);
        resolve_hit(&mut state, &profile, Victim::Unit(2), Vec2Fixed::from_ints(310, 300), true);
        assert_eq!(state.unit(2).unwrap().hp, Fixed::from_num(80));
        assert_eq!(state.unit(3).unwrap().hp, Fixed::from_num(100));
    }

    #[test]
    fn test_poison_refresh_takes_max() {
        let mut attacker = unit(1, Team::Player, 300, UnitKind::Ground, 100);
        attacker.capabilities.on_hit = Some(OnHitEffect::Poison {
            dot_ms: 2000,
            kamikaze: false,
        });
        let mut victim = unit(2, Team::Ai, 310, UnitKind::Ground, 100);
        victim.status.dot_ms = 3000;
        let mut state = state_with(vec![attacker.clone(), victim]);
        let profile = AttackProfile::from_unit(&attacker);
        resolve_hit(&mut state, &profile, Victim::Unit(2), Vec2Fixed::from_ints(310, 300), true);
        assert_eq!(state.unit(2).unwrap().status.dot_ms, 3000);
        assert!(state.unit(1).unwrap().alive);
    }

    #[test]
    fn test_kamikaze_dies_after_hit() {
        let mut attacker = unit(1, Team::Player, 300, UnitKind::Ground, 100);
        attacker.capabilities.on_hit = Some(OnHitEffect::Poison {
            dot_ms: 4000,
            kamikaze: true,
        });
        let victim = unit(2, Team::Ai, 310, UnitKind::Ground, 100);
        let mut state = state_with(vec![attacker.clone(), victim]);
        let profile = AttackProfile::from_unit(&attacker);
        resolve_hit(&mut state, &profile, Victim::Unit(2), Vec2Fixed::from_ints(310, 300), true);
        let victim = state.unit(2).unwrap();
        assert_eq!(victim.hp, Fixed::from_num(80));
        assert_eq!(victim.status.dot_ms, 4000);
        assert!(!state.unit(1).unwrap().alive);
    }

    #[test]
    fn test_splash_hits_locked_towers() {
        let mut state = MatchState::new_match(&MatchRules::default(), Vec::new(), Vec::new());
        let king = state.king(Team::Ai).unwrap().clone();
        assert!(king.locked);
        let profile = AttackProfile {
            team: Team::Player,
            damage: Fixed::from_num(50),
            on_hit: None,
            aoe_radius: Some(Fixed::from_num(40)),
            ground_melee: false,
            source_unit: None,
        };
        resolve_hit(&mut state, &profile, Victim::Tower(king.id), king.position, true);
        assert_eq!(state.king(Team::Ai).unwrap().hp, king.hp - Fixed::from_num(50));
    }

    #[test]
    fn test_overclock_is_idempotent() {
        let mut u = unit(1, Team::Player, 300, UnitKind::Ground, 100);
        u.hp = Fixed::from_num(50);
        assert!(overclock(&mut u));
        assert!(!overclock(&mut u));
        assert_eq!(u.hp, Fixed::from_num(70));
        assert_eq!(u.max_hp, Fixed::from_num(120));
    }

    #[test]
    fn test_poison_tick() {
        let mut u = unit(1, Team::Player, 300, UnitKind::Ground, 100);
        u.status.dot_ms = 500;
        let drained = tick_poison(&mut u, 1000);
        assert_eq!(u.status.dot_ms, 0);
        assert_eq!(drained, dot_rate_per_ms() * Fixed::from_num(500));
        assert_eq!(tick_poison(&mut u, 1000), Fixed::ZERO);
    }
}
