//! Arena geometry: dimensions, the centerline wall and its two bridges.
//!
//! The player defends the left half, the opponent the right half. Ground and
//! building units may only cross the centerline through a bridge gap.

use crate::components::{Lane, Team};
use crate::math::{ratio, Fixed, Vec2Fixed};

/// Arena width in world units.
pub const ARENA_WIDTH: i32 = 1200;

/// Arena height in world units.
pub const ARENA_HEIGHT: i32 = 675;

/// Vertical offset of each bridge from the arena's horizontal midline.
pub const BRIDGE_OFFSET_Y: i32 = 190;

/// Half-height of a bridge gap.
pub const BRIDGE_GAP_HALF: i32 = 100;

/// Distance short of the centerline a unit must be to count as "home".
pub const HOME_SIDE_MARGIN: i32 = 50;

/// Inset used when clamping ability spawns inside the arena.
pub const SPAWN_INSET: i32 = 40;

/// Centerline x coordinate.
#[must_use]
pub fn centerline_x() -> Fixed {
    Fixed::from_num(ARENA_WIDTH / 2)
}

/// Horizontal midline y coordinate.
#[must_use]
pub fn midline_y() -> Fixed {
    ratio(ARENA_HEIGHT, 2)
}

/// Center of the arena.
#[must_use]
pub fn center() -> Vec2Fixed {
    Vec2Fixed::new(centerline_x(), midline_y())
}

/// Center of a lane's bridge gap, on the centerline.
#[must_use]
pub fn bridge_center(lane: Lane) -> Vec2Fixed {
    let offset = Fixed::from_num(BRIDGE_OFFSET_Y);
    let y = match lane {
        Lane::Top => midline_y() - offset,
        Lane::Bottom => midline_y() + offset,
    };
    Vec2Fixed::new(centerline_x(), y)
}

/// Lane for a y coordinate.
#[must_use]
pub fn lane_for_y(y: Fixed) -> Lane {
    if y < midline_y() {
        Lane::Top
    } else {
        Lane::Bottom
    }
}

/// True if `y` lies inside either bridge gap.
#[must_use]
pub fn in_any_gap(y: Fixed) -> bool {
    [Lane::Top, Lane::Bottom]
        .iter()
        .any(|&lane| (y - bridge_center(lane).y).abs() <= Fixed::from_num(BRIDGE_GAP_HALF))
}

/// Bridge-gap center closest to the given y.
#[must_use]
pub fn nearest_bridge(y: Fixed) -> Vec2Fixed {
    let top = bridge_center(Lane::Top);
    let bottom = bridge_center(Lane::Bottom);
    if (y - top.y).abs() <= (y - bottom.y).abs() {
        top
    } else {
        bottom
    }
}

/// True if `x` is on the given team's half.
#[must_use]
pub fn on_home_half(team: Team, x: Fixed) -> bool {
    match team {
        Team::Player => x <= centerline_x(),
        Team::Ai => x >= centerline_x(),
    }
}

/// True if the point is clearly short of the centerline on the team's side.
#[must_use]
pub fn deep_in_home_half(team: Team, x: Fixed) -> bool {
    let margin = Fixed::from_num(HOME_SIDE_MARGIN);
    match team {
        Team::Player => x < centerline_x() - margin,
        Team::Ai => x > centerline_x() + margin,
    }
}

/// True if `x` is across the centerline from the team's side.
#[must_use]
pub fn on_enemy_half(team: Team, x: Fixed) -> bool {
    match team {
        Team::Player => x > centerline_x(),
        Team::Ai => x < centerline_x(),
    }
}

/// Sign of the x direction pointing at the enemy side.
#[must_use]
pub const fn forward(team: Team) -> i32 {
    match team {
        Team::Player => 1,
        Team::Ai => -1,
    }
}

/// Baseline x of the enemy side (where support units retreat toward).
#[must_use]
pub fn enemy_baseline_x(team: Team) -> Fixed {
    match team {
        Team::Player => Fixed::from_num(ARENA_WIDTH),
        Team::Ai => Fixed::ZERO,
    }
}

/// Clamp a point into the arena rectangle.
#[must_use]
pub fn clamp_to_arena(point: Vec2Fixed) -> Vec2Fixed {
    point.clamp_to(
        Vec2Fixed::ZERO,
        Vec2Fixed::from_ints(ARENA_WIDTH, ARENA_HEIGHT),
    )
}

/// Clamp a point into the arena with the spawn inset.
#[must_use]
pub fn clamp_spawn(point: Vec2Fixed) -> Vec2Fixed {
    point.clamp_to(
        Vec2Fixed::from_ints(SPAWN_INSET, SPAWN_INSET),
        Vec2Fixed::from_ints(ARENA_WIDTH - SPAWN_INSET, ARENA_HEIGHT - SPAWN_INSET),
    )
}

/// Where a straight segment crosses the centerline, if it does.
///
/// Returns the crossing y. A segment that lands on the line or leaves it
/// counts as crossing; one that runs along the line does not.
#[must_use]
pub fn centerline_crossing(from: Vec2Fixed, to: Vec2Fixed) -> Option<Fixed> {
    let cx = centerline_x();
    let before = from.x - cx;
    let after = to.x - cx;
    let crosses = before != after
        && before.min(after) <= Fixed::ZERO
        && before.max(after) >= Fixed::ZERO;
    if !crosses {
        return None;
    }
    let t = before / (before - after);
    Some(from.y + (to.y - from.y) * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_centers() {
        assert_eq!(bridge_center(Lane::Top).y, ratio(295, 2));
        assert_eq!(bridge_center(Lane::Bottom).y, ratio(1055, 2));
        assert_eq!(bridge_center(Lane::Top).x, Fixed::from_num(600));
    }

    #[test]
    fn test_gap_membership() {
        assert!(in_any_gap(Fixed::from_num(150)));
        assert!(in_any_gap(Fixed::from_num(520)));
        assert!(!in_any_gap(Fixed::from_num(337)));
    }

    #[test]
    fn test_centerline_crossing() {
        let from = Vec2Fixed::from_ints(590, 300);
        let to = Vec2Fixed::from_ints(610, 320);
        assert_eq!(centerline_crossing(from, to), Some(Fixed::from_num(310)));
        assert_eq!(
            centerline_crossing(from, Vec2Fixed::from_ints(595, 0)),
            None
        );
    }

    #[test]
    fn test_touching_the_centerline_counts_as_crossing() {
        let on_line = Vec2Fixed::from_ints(600, 337);
        // Landing on the line from either side.
        assert_eq!(
            centerline_crossing(Vec2Fixed::from_ints(590, 337), on_line),
            Some(Fixed::from_num(337))
        );
        assert_eq!(
            centerline_crossing(Vec2Fixed::from_ints(610, 337), on_line),
            Some(Fixed::from_num(337))
        );
        // Leaving the line toward either side.
        assert_eq!(
            centerline_crossing(on_line, Vec2Fixed::from_ints(610, 340)),
            Some(Fixed::from_num(337))
        );
        assert_eq!(
            centerline_crossing(on_line, Vec2Fixed::from_ints(590, 340)),
            Some(Fixed::from_num(337))
        );
        // Sliding along the line is not a crossing.
        assert_eq!(centerline_crossing(on_line, Vec2Fixed::from_ints(600, 300)), None);
    }

    #[test]
    fn test_lane_for_y() {
        assert_eq!(lane_for_y(Fixed::from_num(10)), Lane::Top);
        assert_eq!(lane_for_y(Fixed::from_num(600)), Lane::Bottom);
    }
}
