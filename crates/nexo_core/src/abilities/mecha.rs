//! Mecha transformation: a piloted unit with a shield pool and an optional
//! beam.

use crate::abilities::{charge, precheck};
use crate::arena::{clamp_spawn, forward, lane_for_y, midline_y, ARENA_WIDTH};
use crate::cards::CardCatalog;
use crate::combat::{apply_damage, Victim};
use crate::components::{BeamCycle, CardId, DualHealthPool, EffectKind, MechaMode, Team};
use crate::error::ActionRejected;
use crate::factory::build_unit;
use crate::math::{Fixed, Vec2Fixed};
use crate::state::MatchState;

/// Energy cost.
pub const COST: u32 = 6;

/// Cooldown after a cast.
pub const COOLDOWN_MS: u32 = 30_000;

/// Shield pool granted to the mecha.
pub const SHIELD_HP: i32 = 600;

/// Landing stun.
pub const LANDING_STUN_MS: u32 = 1000;

/// Beam firing window.
pub const BEAM_ACTIVE_MS: u32 = 3000;

/// Beam cooldown between windows.
pub const BEAM_COOLDOWN_MS: u32 = 9000;

/// Time between beam pulses.
pub const BEAM_TICK_MS: u32 = 250;

/// Damage per beam pulse.
pub const BEAM_DAMAGE: i32 = 18;

/// Beam reach.
pub const BEAM_RANGE: i32 = 160;

const KING_OFFSET_X: i32 = 140;

/// Drop a mecha piloted by `pilot_card` in front of the caster's king.
///
/// # Errors
///
/// Fails the shared ability checks, or when the pilot is unknown, not a
/// single melee ground card, or not in the caster's hand or deck.
pub fn resolve(
    state: &MatchState,
    catalog: &CardCatalog,
    team: Team,
    pilot_card: &CardId,
    mode: MechaMode,
) -> Result<MatchState, ActionRejected> {
    precheck(state, team, COST)?;
    let invalid = |reason: String| ActionRejected::InvalidOption {
        option: "pilot_card",
        reason,
    };
    let pilot = catalog
        .get(pilot_card)
        .ok_or_else(|| invalid(format!("unknown card {pilot_card}")))?;
    if !pilot.is_melee_single() {
        return Err(invalid(format!("{pilot_card} is not a single melee unit")));
    }
    let owned = state.hands.get(team).contains(pilot_card) || state.decks.get(team).contains(pilot_card);
    if !owned {
        return Err(invalid(format!("{pilot_card} is not in the caster's deck")));
    }

    let position = match state.king(team) {
        Some(king) => clamp_spawn(king.position + Vec2Fixed::from_ints(KING_OFFSET_X * forward(team), 0)),
        None => {
            let x = match team {
                Team::Player => KING_OFFSET_X,
                Team::Ai => ARENA_WIDTH - KING_OFFSET_X,
            };
            Vec2Fixed::new(Fixed::from_num(x), midline_y())
        }
    };

    let mut next = state.clone();
    let mut mecha = build_unit(&mut next, pilot, team, position, lane_for_y(position.y));
    mecha.status.stun_ms = LANDING_STUN_MS;
    mecha.capabilities.dual_pool = Some(DualHealthPool {
        shield_hp: Fixed::from_num(SHIELD_HP),
        shield_max: Fixed::from_num(SHIELD_HP),
        mode,
        beam: (mode == MechaMode::Laser).then_some(BeamCycle {
            active_ms: BEAM_ACTIVE_MS,
            cooldown_ms: 0,
            tick_ms: 0,
        }),
    });
    next.units.push(mecha);

    next.push_effect(EffectKind::Shockwave, position, 800, Some(Fixed::from_num(150)), Some(team));
    charge(&mut next, team, COST, COOLDOWN_MS);
    tracing::debug!(?team, ?mode, pilot = %pilot_card, "mecha deployed");
    Ok(next)
}

/// Run the beam cycle for the unit at `index`.
///
/// The cycle keeps running while the mecha is stunned, but pulses that fall
/// inside a stun are lost.
pub fn tick_beam(state: &mut MatchState, index: usize, delta_ms: u32) {
    let unit = &mut state.units[index];
    let stunned = unit.status.stun_ms > 0;
    let Some(beam) = unit.capabilities.dual_pool.as_mut().and_then(|p| p.beam.as_mut()) else {
        return;
    };

    if beam.active_ms == 0 {
        beam.cooldown_ms = beam.cooldown_ms.saturating_sub(delta_ms);
        if beam.cooldown_ms == 0 {
            beam.active_ms = BEAM_ACTIVE_MS;
            beam.tick_ms = 0;
        }
        return;
    }

    beam.tick_ms = beam.tick_ms.saturating_sub(delta_ms);
    let pulse = beam.tick_ms == 0;
    if pulse {
        beam.tick_ms = BEAM_TICK_MS;
    }
    beam.active_ms = beam.active_ms.saturating_sub(delta_ms);
    if beam.active_ms == 0 {
        beam.cooldown_ms = BEAM_COOLDOWN_MS;
    }

    if pulse && !stunned {
        fire_beam(state, index);
    }
}

fn fire_beam(state: &mut MatchState, index: usize) {
    let unit = &state.units[index];
    let (origin, team) = (unit.position, unit.team);
    let range = Fixed::from_num(BEAM_RANGE);

    let units = state
        .units
        .iter()
        .filter(|u| u.team != team && u.is_active())
        .map(|u| (Victim::Unit(u.id), u.position));
    let towers = state
        .towers
        .iter()
        .filter(|t| t.team != team && t.is_targetable())
        .map(|t| (Victim::Tower(t.id), t.position));

    let mut best: Option<(Victim, Vec2Fixed, Fixed)> = None;
    for (victim, position) in units.chain(towers) {
        let dist = origin.distance_squared(position);
        if dist > range * range {
            continue;
        }
        match best {
            Some((_, _, best_dist)) if best_dist <= dist => {}
            _ => best = Some((victim, position, dist)),
        }
    }

    if let Some((victim, position, _)) = best {
        apply_damage(state, victim, Fixed::from_num(BEAM_DAMAGE), team);
        state.push_beam(origin, position, 120, team);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Lane;
    use crate::rules::MatchRules;

    fn setup() -> (MatchState, CardCatalog) {
        let deck = ["shock_trooper", "marine_squad", "plasma_bomb", "sky_fighter", "nova_brawler"]
            .into_iter()
            .map(CardId::new)
            .collect();
        let mut state = MatchState::new_match(&MatchRules::default(), deck, Vec::new());
        state.energy.player = Fixed::from_num(10);
        (state, CardCatalog::builtin().unwrap())
    }

    #[test]
    fn test_mecha_lands_stunned_with_shield() {
        let (state, catalog) = setup();
        let next = resolve(&state, &catalog, Team::Player, &CardId::new("nova_brawler"), MechaMode::Shield).unwrap();
        let mecha = next.units.iter().find(|u| u.capabilities.dual_pool.is_some()).unwrap();
        assert_eq!(mecha.status.stun_ms, LANDING_STUN_MS);
        assert_eq!(mecha.position, Vec2Fixed::new(Fixed::from_num(240), midline_y()));
        let pool = mecha.capabilities.dual_pool.unwrap();
        assert_eq!(pool.shield_hp, Fixed::from_num(600));
        assert!(pool.beam.is_none());
        assert_eq!(next.energy.player, Fixed::from_num(4));
    }

    #[test]
    fn test_pilot_must_be_owned_melee_single() {
        let (state, catalog) = setup();
        for card in ["marine_squad", "siege_walker", "unknown"] {
            assert!(matches!(
                resolve(&state, &catalog, Team::Player, &CardId::new(card), MechaMode::Shield),
                Err(ActionRejected::InvalidOption { option: "pilot_card", .. })
            ));
        }
    }

    #[test]
    fn test_beam_fires_on_cycle() {
        let (state, catalog) = setup();
        let mut next = resolve(&state, &catalog, Team::Player, &CardId::new("shock_trooper"), MechaMode::Laser).unwrap();
        let index = next.units.iter().position(|u| u.capabilities.dual_pool.is_some()).unwrap();
        let spot = next.units[index].position + Vec2Fixed::from_ints(100, 0);
        let trooper = catalog.get_str("shock_trooper").unwrap();
        let enemy = build_unit(&mut next, trooper, Team::Ai, spot, Lane::Top);
        let enemy_id = enemy.id;
        next.units.push(enemy);

        // Landing stun swallows the first pulse.
        tick_beam(&mut next, index, 100);
        assert_eq!(next.unit(enemy_id).unwrap().hp, Fixed::from_num(620));

        next.units[index].status.stun_ms = 0;
        tick_beam(&mut next, index, 250);
        assert_eq!(next.unit(enemy_id).unwrap().hp, Fixed::from_num(602));

        // Drain the window, then the beam rests for the cooldown.
        for _ in 0..20 {
            tick_beam(&mut next, index, 250);
        }
        let beam = next.units[index].capabilities.dual_pool.unwrap().beam.unwrap();
        assert_eq!(beam.active_ms, 0);
        assert!(beam.cooldown_ms > 0);
    }
}
