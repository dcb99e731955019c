//! Match clock, energy regeneration and time-out resolution.

use std::cmp::Ordering;

use tracing::info;

use crate::arena::center;
use crate::components::{EffectKind, Team};
use crate::math::{ms_to_seconds, Fixed};
use crate::state::{ArenaState, MatchState, MatchStatus};

/// Advance time, regenerate energy and cool down abilities.
///
/// Resolves the time-out on the tick where the remaining time reaches zero.
pub fn tick_clock(state: &mut MatchState, delta_ms: u32) {
    let before = state.remaining_ms();
    state.time_ms += u64::from(delta_ms);

    let mut rate = state.rules.regen_per_second();
    if state.is_overtime() {
        rate *= Fixed::from_num(state.rules.overtime_regen_multiplier);
    }
    let gain = rate * ms_to_seconds(delta_ms);
    let cap = state.rules.max_energy_fixed();
    for team in Team::ALL {
        let energy = state.energy.get_mut(team);
        *energy = (*energy + gain).clamp(Fixed::ZERO, cap);
        let cooldown = state.ability_cooldown_ms.get_mut(team);
        *cooldown = cooldown.saturating_sub(delta_ms);
    }

    if state.arena_state == ArenaState::Normal && state.is_overtime() {
        state.arena_state = ArenaState::OvertimeGlitch;
        state.arena_state_since_ms = state.time_ms;
        info!(time_ms = state.time_ms, "overtime started");
    }

    if before > 0 && state.remaining_ms() == 0 && state.status == MatchStatus::Playing {
        resolve_timeout(state);
    }
}

/// Decide the match when the clock runs out.
///
/// In sudden death the side that took less damage wins. Otherwise the side
/// that destroyed more towers wins, and a tie starts sudden death.
pub fn resolve_timeout(state: &mut MatchState) {
    if state.sudden_death {
        let player = *state.damage_taken.get(Team::Player);
        let ai = *state.damage_taken.get(Team::Ai);
        state.status = match player.cmp(&ai) {
            Ordering::Less => MatchStatus::Victory,
            Ordering::Greater => MatchStatus::Defeat,
            Ordering::Equal => MatchStatus::Draw,
        };
        info!(status = ?state.status, %player, %ai, "sudden death decided on damage taken");
        return;
    }

    let player_score = state.destroyed_towers(Team::Ai);
    let ai_score = state.destroyed_towers(Team::Player);
    match player_score.cmp(&ai_score) {
        Ordering::Greater => state.status = MatchStatus::Victory,
        Ordering::Less => state.status = MatchStatus::Defeat,
        Ordering::Equal => {
            enter_sudden_death(state);
            return;
        }
    }
    info!(status = ?state.status, player_score, ai_score, "match decided on towers at time-out");
}

fn enter_sudden_death(state: &mut MatchState) {
    state.sudden_death = true;
    state.sudden_death_extension_ms = state.rules.sudden_death_extension_ms;
    state.arena_state = ArenaState::SuddenDeath;
    state.arena_state_since_ms = state.time_ms;
    let timer = u32::try_from(state.rules.sudden_death_extension_ms).unwrap_or(u32::MAX);
    state.push_effect(EffectKind::Glitch, center(), timer, None, None);
    info!(
        time_ms = state.time_ms,
        extension_ms = state.sudden_death_extension_ms,
        "sudden death"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TowerTier;
    use crate::rules::MatchRules;

    fn fresh() -> MatchState {
        MatchState::new_match(&MatchRules::default(), Vec::new(), Vec::new())
    }

    fn destroy_outer(state: &mut MatchState, team: Team) {
        let tower = state
            .towers
            .iter_mut()
            .find(|t| t.team == team && t.tier == TowerTier::Outer && t.alive)
            .unwrap();
        tower.alive = false;
        tower.hp = Fixed::ZERO;
    }

    #[test]
    fn test_energy_regenerates_and_caps() {
        let mut state = fresh();
        tick_clock(&mut state, 1000);
        assert_eq!(state.energy.player, Fixed::from_num(5) + state.rules.regen_per_second());
        for _ in 0..20 {
            tick_clock(&mut state, 1000);
        }
        assert_eq!(state.energy.player, Fixed::from_num(10));
        assert_eq!(state.energy.ai, Fixed::from_num(10));
    }

    #[test]
    fn test_overtime_doubles_regen() {
        let mut state = fresh();
        state.time_ms = 130_000;
        state.energy = crate::components::PerTeam::splat(Fixed::ZERO);
        tick_clock(&mut state, 1000);
        assert_eq!(state.energy.player, state.rules.regen_per_second() * Fixed::from_num(2));
        assert_eq!(state.arena_state, ArenaState::OvertimeGlitch);
        assert_eq!(state.arena_state_since_ms, 131_000);
    }

    #[test]
    fn test_cooldowns_floor_at_zero() {
        let mut state = fresh();
        state.ability_cooldown_ms = crate::components::PerTeam::new(500, 5000);
        tick_clock(&mut state, 1000);
        assert_eq!(state.ability_cooldown_ms.player, 0);
        assert_eq!(state.ability_cooldown_ms.ai, 4000);
    }

    #[test]
    fn test_timeout_tower_lead_wins() {
        let mut state = fresh();
        destroy_outer(&mut state, Team::Ai);
        state.time_ms = 179_500;
        tick_clock(&mut state, 1000);
        assert_eq!(state.status, MatchStatus::Victory);
    }

    #[test]
    fn test_timeout_tie_enters_sudden_death() {
        let mut state = fresh();
        state.time_ms = 179_500;
        tick_clock(&mut state, 1000);
        assert_eq!(state.status, MatchStatus::Playing);
        assert!(state.sudden_death);
        assert_eq!(state.arena_state, ArenaState::SuddenDeath);
        assert_eq!(state.remaining_ms(), 59_500);
    }

    #[test]
    fn test_sudden_death_damage_tiebreak() {
        let mut state = fresh();
        state.time_ms = 179_500;
        tick_clock(&mut state, 1000);

        let mut draw = state.clone();
        draw.time_ms = 239_900;
        tick_clock(&mut draw, 200);
        assert_eq!(draw.status, MatchStatus::Draw);

        let mut win = state;
        *win.damage_taken.get_mut(Team::Ai) = Fixed::from_num(300);
        *win.damage_taken.get_mut(Team::Player) = Fixed::from_num(120);
        win.time_ms = 239_900;
        tick_clock(&mut win, 200);
        assert_eq!(win.status, MatchStatus::Victory);
    }

    #[test]
    fn test_timeout_only_fires_once() {
        let mut state = fresh();
        destroy_outer(&mut state, Team::Player);
        state.time_ms = 179_500;
        tick_clock(&mut state, 1000);
        assert_eq!(state.status, MatchStatus::Defeat);
        state.status = MatchStatus::Playing;
        tick_clock(&mut state, 1000);
        assert_eq!(state.status, MatchStatus::Playing);
    }
}
