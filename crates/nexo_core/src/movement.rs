//! Unit movement: lane waypoints, the centerline wall and separation.
//!
//! Ground and building units may only cross the centerline inside a bridge
//! gap. Air units fly straight at their goal.

use crate::arena::{
    bridge_center, centerline_crossing, clamp_to_arena, deep_in_home_half, in_any_gap,
    nearest_bridge, on_enemy_half,
};
use crate::components::{Unit, UnitKind};
use crate::math::{ms_to_seconds, Fixed, Vec2Fixed};

/// Separation stiffness: overlap removed per second.
pub const SEPARATION_RATE: i32 = 6;

/// Where a unit should head this tick on its way to `goal`.
///
/// A grounded unit still on its own half with a goal across the centerline
/// is routed to its lane's bridge first.
#[must_use]
pub fn waypoint(unit: &Unit, goal: Vec2Fixed) -> Vec2Fixed {
    if unit.kind.is_grounded()
        && deep_in_home_half(unit.team, unit.position.x)
        && on_enemy_half(unit.team, goal.x)
    {
        return bridge_center(unit.lane);
    }
    goal
}

/// Keep a grounded step from passing through the wall.
///
/// If the segment `from -> to` crosses, lands on or leaves the centerline
/// outside every gap, the step is re-aimed at the gap center nearest the
/// crossing, keeping its length.
#[must_use]
pub fn clamp_to_bridge(from: Vec2Fixed, to: Vec2Fixed) -> Vec2Fixed {
    match centerline_crossing(from, to) {
        Some(y) if !in_any_gap(y) => {
            let length = (to - from).length();
            from.step_toward(nearest_bridge(y), length)
        }
        _ => to,
    }
}

/// Separation push from same-team neighbours overlapping `unit`.
#[must_use]
pub fn separation(unit: &Unit, neighbours: &[Unit], delta_ms: u32) -> Vec2Fixed {
    let dt = ms_to_seconds(delta_ms);
    let rate = Fixed::from_num(SEPARATION_RATE);
    let mut push = Vec2Fixed::ZERO;

    for other in neighbours {
        if other.id == unit.id || other.team != unit.team || !other.is_active() {
            continue;
        }
        let min_distance = unit.collision_radius + other.collision_radius;
        if !unit.position.within(other.position, min_distance) {
            continue;
        }
        let offset = unit.position - other.position;
        let distance = offset.length();
        if distance >= min_distance {
            continue;
        }
        let away = if distance == Fixed::ZERO {
            // Coincident units split vertically by id.
            if unit.id > other.id {
                Vec2Fixed::from_ints(0, 1)
            } else {
                Vec2Fixed::from_ints(0, -1)
            }
        } else {
            offset.normalize()
        };
        push = push + away.scale((min_distance - distance) * rate * dt);
    }
    push
}

/// Next position for a moving unit.
///
/// Buildings never move. Everything else steps toward the waypoint at its
/// speed, picks up separation, is kept off the wall if grounded and is
/// clamped to the arena.
#[must_use]
pub fn next_position(unit: &Unit, goal: Vec2Fixed, neighbours: &[Unit], delta_ms: u32) -> Vec2Fixed {
    if unit.kind == UnitKind::Building {
        return unit.position;
    }
    let step = unit.speed * ms_to_seconds(delta_ms);
    let heading = waypoint(unit, goal);
    let stepped = unit.position.step_toward(heading, step);
    let mut next = stepped + separation(unit, neighbours, delta_ms);
    if unit.kind.is_grounded() {
        next = clamp_to_bridge(unit.position, next);
    }
    clamp_to_arena(next)
}
