//! Mothership: a slow flagship that drops copies of its hangar card.

use tracing::debug;

use crate::abilities::{charge, precheck};
use crate::arena::{forward, midline_y, ARENA_WIDTH};
use crate::cards::CardCatalog;
use crate::components::{CardId, EffectKind, Lane, ReinforcementPayload, Team};
use crate::entropy::Entropy;
use crate::error::ActionRejected;
use crate::factory::{build_unit, spawn_squad, DEPLOY_SPREAD};
use crate::math::{Fixed, Vec2Fixed};
use crate::state::MatchState;

/// Energy cost.
pub const COST: u32 = 8;

/// Cooldown before the hangar card's share is added.
pub const BASE_COOLDOWN_MS: u32 = 30_000;

/// Cooldown added per point of hangar card cost.
pub const COOLDOWN_PER_COST_MS: u32 = 2000;

/// Hidden card the flagship is built from.
pub const FLAGSHIP_CARD: &str = "mothership_flagship";

const BASE_INTERVAL_MS: u32 = 7000;
const INTERVAL_STEP_MS: u32 = 1000;
const MIN_INTERVAL_MS: u32 = 3000;
const SPAWN_INSET_X: i32 = 140;
const LANE_OFFSET_Y: i32 = 150;
const ESCORT_OFFSET_X: i32 = 18;

/// Reinforcement cadence for a hangar card of the given cost.
#[must_use]
pub fn payload_interval_ms(cost: u32) -> u32 {
    BASE_INTERVAL_MS
        .saturating_sub(INTERVAL_STEP_MS.saturating_mul(cost))
        .max(MIN_INTERVAL_MS)
}

/// Cooldown for a hangar card of the given cost.
#[must_use]
pub fn cooldown_ms(cost: u32) -> u32 {
    BASE_COOLDOWN_MS.saturating_add(COOLDOWN_PER_COST_MS.saturating_mul(cost))
}

/// Lane where the enemy outnumbers the caster the most. Ties go top.
#[must_use]
pub fn pressured_lane(state: &MatchState, team: Team) -> Lane {
    let pressure = |lane: Lane| {
        state.living_units().filter(|u| u.lane == lane).fold(0i64, |acc, u| {
            if u.team == team {
                acc - 1
            } else {
                acc + 1
            }
        })
    };
    if pressure(Lane::Top) >= pressure(Lane::Bottom) {
        Lane::Top
    } else {
        Lane::Bottom
    }
}

/// Launch a mothership with escorts.
///
/// # Errors
///
/// Fails the shared ability checks, when the hangar card is unknown or a
/// spell, or when the caster already has a mothership.
pub fn resolve(
    state: &MatchState,
    catalog: &CardCatalog,
    team: Team,
    hangar_card: &CardId,
    entropy: &mut dyn Entropy,
) -> Result<MatchState, ActionRejected> {
    precheck(state, team, COST)?;
    let hangar = catalog.get(hangar_card).ok_or_else(|| ActionRejected::InvalidOption {
        option: "hangar_card",
        reason: format!("unknown card {hangar_card}"),
    })?;
    if hangar.is_spell() {
        return Err(ActionRejected::InvalidOption {
            option: "hangar_card",
            reason: format!("{hangar_card} is a spell"),
        });
    }
    let flagship = catalog
        .get_str(FLAGSHIP_CARD)
        .ok_or_else(|| ActionRejected::UnknownCard(FLAGSHIP_CARD.to_string()))?;
    if state.living_units().any(|u| u.team == team && u.is_mothership()) {
        return Err(ActionRejected::AlreadyActive {
            team,
            what: "mothership",
        });
    }

    let mut next = state.clone();
    let lane = pressured_lane(&next, team);
    let x = match team {
        Team::Player => SPAWN_INSET_X,
        Team::Ai => ARENA_WIDTH - SPAWN_INSET_X,
    };
    let y = match lane {
        Lane::Top => midline_y() - Fixed::from_num(LANE_OFFSET_Y),
        Lane::Bottom => midline_y() + Fixed::from_num(LANE_OFFSET_Y),
    };
    let spawn = Vec2Fixed::new(Fixed::from_num(x), y);

    let interval = payload_interval_ms(hangar.cost);
    let mut ship = build_unit(&mut next, flagship, team, spawn, lane);
    ship.capabilities.payload = Some(ReinforcementPayload {
        payload_card: hangar.id.clone(),
        interval_ms: interval,
        countdown_ms: interval,
    });
    next.units.push(ship);

    let escort_origin = spawn + Vec2Fixed::from_ints(ESCORT_OFFSET_X * forward(team), 0);
    spawn_squad(&mut next, hangar, team, escort_origin, lane, DEPLOY_SPREAD, entropy);

    next.push_effect(EffectKind::Shockwave, spawn, 700, Some(Fixed::from_num(140)), Some(team));
    charge(&mut next, team, COST, cooldown_ms(hangar.cost));
    debug!(?team, ?lane, hangar = %hangar.id, "mothership launched");
    Ok(next)
}

/// Count down a mothership's payload and drop reinforcements when due.
pub fn tick_payload(
    state: &mut MatchState,
    catalog: &CardCatalog,
    index: usize,
    delta_ms: u32,
    entropy: &mut dyn Entropy,
) {
    let ship = &mut state.units[index];
    let Some(payload) = ship.capabilities.payload.as_mut() else {
        return;
    };
    payload.countdown_ms = payload.countdown_ms.saturating_sub(delta_ms);
    if payload.countdown_ms > 0 {
        return;
    }
    payload.countdown_ms = payload.interval_ms;
    let card_id = payload.payload_card.clone();
    let (team, lane, origin) = (ship.team, ship.lane, ship.position);

    if let Some(card) = catalog.get(&card_id) {
        spawn_squad(state, card, team, origin, lane, DEPLOY_SPREAD, entropy);
    }
}
