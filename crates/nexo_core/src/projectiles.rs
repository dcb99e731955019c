//! Homing projectiles.
//!
//! A projectile re-aims at its target's current position every tick and
//! resolves once it is within [`HIT_THRESHOLD`]. If the target is gone it
//! disappears without effect.

use crate::combat::{resolve_hit, AttackProfile, Victim};
use crate::components::{EffectKind, OnHitEffect, Projectile, ProjectileStyle, Team};
use crate::math::{ms_to_seconds, ratio, Fixed, Vec2Fixed};
use crate::state::MatchState;

/// Distance at which a projectile lands.
pub const HIT_THRESHOLD: i32 = 12;

/// Missile speed in units per second.
pub const MISSILE_SPEED: i32 = 240;

/// Speed of every other projectile style in units per second.
pub const BOLT_SPEED: i32 = 480;

/// Travel speed for a style, with the bonus for air launchers.
#[must_use]
pub fn projectile_speed(style: ProjectileStyle, from_air: bool) -> Fixed {
    let base = match style {
        ProjectileStyle::Missile => Fixed::from_num(MISSILE_SPEED),
        _ => Fixed::from_num(BOLT_SPEED),
    };
    if from_air {
        base * ratio(115, 100)
    } else {
        base
    }
}

/// Parameters for a new projectile.
#[derive(Debug, Clone, Copy)]
pub struct Launch {
    /// Launch point.
    pub origin: Vec2Fixed,
    /// Homing target.
    pub target: Victim,
    /// Target position at launch.
    pub target_position: Vec2Fixed,
    /// Damage on arrival.
    pub damage: Fixed,
    /// Firing side.
    pub team: Team,
    /// Style.
    pub style: ProjectileStyle,
    /// On-hit behaviour carried to the impact.
    pub on_hit: Option<OnHitEffect>,
    /// Shooting unit.
    pub source_unit: Option<u64>,
    /// Fired by a tower.
    pub from_tower: bool,
    /// Fired by an air unit.
    pub from_air: bool,
}

/// Add a projectile to the state.
pub fn launch(state: &mut MatchState, launch: Launch) {
    let id = state.next_id();
    let target = match launch.target {
        Victim::Unit(id) | Victim::Tower(id) => id,
    };
    state.projectiles.push(Projectile {
        id,
        position: launch.origin,
        target_position: launch.target_position,
        target,
        speed: projectile_speed(launch.style, launch.from_air),
        damage: launch.damage,
        team: launch.team,
        style: launch.style,
        on_hit: launch.on_hit,
        source_unit: launch.source_unit,
        from_tower: launch.from_tower,
    });
}

/// Move every projectile and resolve arrivals.
pub fn tick_projectiles(state: &mut MatchState, delta_ms: u32) {
    let threshold = Fixed::from_num(HIT_THRESHOLD);
    let dt = ms_to_seconds(delta_ms);
    let in_flight = std::mem::take(&mut state.projectiles);
    let mut remaining = Vec::with_capacity(in_flight.len());

    for mut projectile in in_flight {
        let Some(victim) = Victim::find(state, projectile.target) else {
            continue;
        };
        let Some((target_pos, _, true)) = victim.locate(state) else {
            continue;
        };

        projectile.target_position = target_pos;
        projectile.position = projectile.position.step_toward(target_pos, projectile.speed * dt);

        if projectile.position.distance_squared(target_pos) < threshold * threshold {
            let profile = AttackProfile {
                team: projectile.team,
                damage: projectile.damage,
                on_hit: projectile.on_hit,
                aoe_radius: None,
                ground_melee: false,
                source_unit: projectile.source_unit,
            };
            resolve_hit(state, &profile, victim, target_pos, false);
            state.push_effect(EffectKind::Spark, target_pos, 200, None, Some(projectile.team));
        } else {
            remaining.push(projectile);
        }
    }

    // Projectiles launched while resolving hits are kept too.
    remaining.append(&mut state.projectiles);
    state.projectiles = remaining;
}
