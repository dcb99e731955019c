//! Spell casting: activation delay, instant area effects and lingering fields.

use tracing::debug;

use crate::arena::{midline_y, ARENA_WIDTH};
use crate::cards::{CardCatalog, CardDef};
use crate::combat::{apply_damage, apply_heal, Victim};
use crate::components::{ActiveSpell, EffectKind, PendingSpell, TargetPreference, Team};
use crate::math::{Fixed, Vec2Fixed};
use crate::state::MatchState;

/// Delay between casting a spell and its impact.
pub const SPELL_DELAY_MS: u32 = 1000;

/// Radius used when an instant spell has none.
pub const DEFAULT_SPELL_RADIUS: i32 = 100;

/// Radius used when a persistent field has none.
pub const DEFAULT_FIELD_RADIUS: i32 = 180;

/// Lifetime of a persistent field.
pub const FIELD_DURATION_MS: u32 = 5000;

/// Time between field pulses.
pub const FIELD_PULSE_MS: u32 = 1000;

/// Pulses over a field's lifetime; each carries this share of the card damage.
pub const FIELD_PULSES: i32 = 5;

const IMPACT_EFFECT_MS: u32 = 800;

/// Queue a spell for impact at `position` and draw the targeting beam from
/// the caster's king.
pub fn queue_spell(state: &mut MatchState, card: &CardDef, team: Team, position: Vec2Fixed) {
    let id = state.next_id();
    state.pending_spells.push(PendingSpell {
        id,
        card_id: card.id.clone(),
        team,
        position,
        timer_ms: SPELL_DELAY_MS,
    });

    let origin = state.king(team).map_or_else(
        || {
            let x = match team {
                Team::Player => 100,
                Team::Ai => ARENA_WIDTH - 100,
            };
            Vec2Fixed::new(Fixed::from_num(x), midline_y())
        },
        |king| king.position,
    );
    state.push_beam(origin, position, SPELL_DELAY_MS, team);
}

/// Count down pending spells and resolve the ones that are due.
pub fn tick_pending(state: &mut MatchState, catalog: &CardCatalog, delta_ms: u32) {
    let pending = std::mem::take(&mut state.pending_spells);
    let mut waiting = Vec::with_capacity(pending.len());

    for mut spell in pending {
        spell.timer_ms = spell.timer_ms.saturating_sub(delta_ms);
        if spell.timer_ms > 0 {
            waiting.push(spell);
            continue;
        }
        let Some(card) = catalog.get(&spell.card_id) else {
            debug!(card = %spell.card_id, "dropping spell with unknown card");
            continue;
        };
        if card.persistent_field {
            activate_field(state, card, &spell);
        } else {
            resolve_instant(state, card, spell.team, spell.position);
        }
    }

    waiting.append(&mut state.pending_spells);
    state.pending_spells = waiting;
}

fn activate_field(state: &mut MatchState, card: &CardDef, spell: &PendingSpell) {
    let id = state.next_id();
    state.active_spells.push(ActiveSpell {
        id,
        card_id: card.id.clone(),
        team: spell.team,
        position: spell.position,
        duration_ms: FIELD_DURATION_MS,
        next_tick_ms: 0,
    });
    let radius = Fixed::from_num(card.aoe_radius.map_or(DEFAULT_FIELD_RADIUS, to_i32));
    state.push_effect(
        EffectKind::HealingField,
        spell.position,
        FIELD_DURATION_MS,
        Some(radius),
        Some(spell.team),
    );
}

/// Resolve an instant area spell.
///
/// Hits opposing units and towers in radius, or the caster's own side for
/// support cards. Stun and poison use the longer of the current and new
/// durations.
pub fn resolve_instant(state: &mut MatchState, card: &CardDef, team: Team, position: Vec2Fixed) {
    let radius = Fixed::from_num(card.aoe_radius.map_or(DEFAULT_SPELL_RADIUS, to_i32));
    let affected = if card.target_pref == TargetPreference::Allies {
        team
    } else {
        team.opponent()
    };
    let victims = victims_in_radius(state, affected, position, radius);

    for &victim in &victims {
        if let Victim::Unit(id) = victim {
            if let Some(unit) = state.units.iter_mut().find(|u| u.id == id) {
                if let Some(stun) = card.stun_ms {
                    unit.status.stun_ms = unit.status.stun_ms.max(stun);
                }
                if let Some(dot) = card.dot_ms {
                    unit.status.dot_ms = unit.status.dot_ms.max(dot);
                }
            }
        }
        hit(state, victim, card.damage_fixed(), team);
    }

    state.push_effect(card.spell_effect(), position, IMPACT_EFFECT_MS, Some(radius), Some(team));
}

/// Pulse and expire lingering fields.
pub fn tick_active(state: &mut MatchState, catalog: &CardCatalog, delta_ms: u32) {
    let active = std::mem::take(&mut state.active_spells);
    let mut kept = Vec::with_capacity(active.len());

    for mut spell in active {
        let Some(card) = catalog.get(&spell.card_id) else {
            continue;
        };
        // Pulses land every FIELD_PULSE_MS of field time; a tick fires every
        // pulse that falls inside it, and the remainder carries over.
        let window = delta_ms.min(spell.duration_ms);
        while spell.next_tick_ms < window {
            pulse_field(state, card, &spell);
            spell.next_tick_ms += FIELD_PULSE_MS;
        }
        spell.next_tick_ms = spell.next_tick_ms.saturating_sub(delta_ms);
        spell.duration_ms = spell.duration_ms.saturating_sub(delta_ms);
        if spell.duration_ms > 0 {
            kept.push(spell);
        }
    }

    kept.append(&mut state.active_spells);
    state.active_spells = kept;
}

fn pulse_field(state: &mut MatchState, card: &CardDef, spell: &ActiveSpell) {
    let amount = card.damage_fixed() / Fixed::from_num(FIELD_PULSES);
    let radius = Fixed::from_num(card.aoe_radius.map_or(DEFAULT_FIELD_RADIUS, to_i32));
    let affected = if amount < Fixed::ZERO {
        spell.team
    } else {
        spell.team.opponent()
    };
    for victim in victims_in_radius(state, affected, spell.position, radius) {
        hit(state, victim, amount, spell.team);
    }
}

fn hit(state: &mut MatchState, victim: Victim, amount: Fixed, caster: Team) {
    if amount < Fixed::ZERO {
        apply_heal(state, victim, amount.abs());
    } else {
        apply_damage(state, victim, amount, caster);
    }
}

fn victims_in_radius(state: &MatchState, team: Team, center: Vec2Fixed, radius: Fixed) -> Vec<Victim> {
    let units = state
        .units
        .iter()
        .filter(|u| u.team == team && u.is_active() && center.within(u.position, radius))
        .map(|u| Victim::Unit(u.id));
    let towers = state
        .towers
        .iter()
        .filter(|t| t.team == team && t.alive && center.within(t.position, radius))
        .map(|t| Victim::Tower(t.id));
    units.chain(towers).collect()
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Lane;
    use crate::factory::build_unit;
    use crate::rules::MatchRules;

    fn catalog() -> CardCatalog {
        CardCatalog::builtin().unwrap()
    }

    fn place(state: &mut MatchState, catalog: &CardCatalog, card: &str, team: Team, x: i32, y: i32) -> u64 {
        let unit = build_unit(state, catalog.get_str(card).unwrap(), team, Vec2Fixed::from_ints(x, y), Lane::Top);
        let id = unit.id;
        state.units.push(unit);
        id
    }

    #[test]
    fn test_spell_waits_for_activation() {
        let catalog = catalog();
        let mut state = MatchState::new_match(&MatchRules::default(), Vec::new(), Vec::new());
        let target = place(&mut state, &catalog, "shock_trooper", Team::Ai, 800, 300);
        let bomb = catalog.get_str("plasma_bomb").unwrap();
        queue_spell(&mut state, bomb, Team::Player, Vec2Fixed::from_ints(800, 300));
        assert!(state.effects.iter().any(|e| e.kind == EffectKind::LaserBeam));

        tick_pending(&mut state, &catalog, 600);
        assert_eq!(state.unit(target).unwrap().hp, Fixed::from_num(620));
        assert_eq!(state.pending_spells.len(), 1);

        tick_pending(&mut state, &catalog, 400);
        assert!(state.pending_spells.is_empty());
        assert_eq!(state.unit(target).unwrap().hp, Fixed::from_num(440));
        assert!(state.effects.iter().any(|e| e.kind == EffectKind::Explosion));
    }

    #[test]
    fn test_instant_spell_spares_own_side() {
        let catalog = catalog();
        let mut state = MatchState::empty(&MatchRules::default());
        let ally = place(&mut state, &catalog, "shock_trooper", Team::Player, 800, 300);
        let enemy = place(&mut state, &catalog, "shock_trooper", Team::Ai, 820, 300);
        let laser = catalog.get_str("orbital_laser").unwrap();
        resolve_instant(&mut state, laser, Team::Player, Vec2Fixed::from_ints(810, 300));

        assert_eq!(state.unit(ally).unwrap().hp, Fixed::from_num(620));
        let enemy = state.unit(enemy).unwrap();
        assert_eq!(enemy.hp, Fixed::from_num(340));
        assert_eq!(enemy.status.stun_ms, 800);
        assert!(state.effects.iter().any(|e| e.kind == EffectKind::EmpWave));
    }

    #[test]
    fn test_poison_spell_sets_dot() {
        let catalog = catalog();
        let mut state = MatchState::empty(&MatchRules::default());
        let enemy = place(&mut state, &catalog, "shock_trooper", Team::Ai, 820, 300);
        state.units[0].status.dot_ms = 9000;
        let spores = catalog.get_str("toxic_spores").unwrap();
        resolve_instant(&mut state, spores, Team::Player, Vec2Fixed::from_ints(820, 300));
        assert_eq!(state.unit(enemy).unwrap().status.dot_ms, 9000);
    }

    #[test]
    fn test_healing_field_pulses_then_expires() {
        let catalog = catalog();
        let mut state = MatchState::empty(&MatchRules::default());
        let ally = place(&mut state, &catalog, "shock_trooper", Team::Player, 300, 300);
        state.units[0].hp = Fixed::from_num(100);
        let field = catalog.get_str("healing_matrix").unwrap();
        queue_spell(&mut state, field, Team::Player, Vec2Fixed::from_ints(300, 300));

        tick_pending(&mut state, &catalog, 1000);
        assert_eq!(state.active_spells.len(), 1);
        assert!(state.effects.iter().any(|e| e.kind == EffectKind::HealingField));

        // First pulse lands on activation.
        tick_active(&mut state, &catalog, 500);
        assert_eq!(state.unit(ally).unwrap().hp, Fixed::from_num(160));

        tick_active(&mut state, &catalog, 500);
        tick_active(&mut state, &catalog, 500);
        assert_eq!(state.unit(ally).unwrap().hp, Fixed::from_num(220));

        for _ in 0..7 {
            tick_active(&mut state, &catalog, 500);
        }
        assert!(state.active_spells.is_empty());
        assert_eq!(state.unit(ally).unwrap().hp, Fixed::from_num(400));
    }

    #[test]
    fn test_field_pulses_keep_cadence_on_uneven_ticks() {
        let catalog = catalog();
        let mut state = MatchState::empty(&MatchRules::default());
        let ally = place(&mut state, &catalog, "shock_trooper", Team::Player, 300, 300);
        state.units[0].hp = Fixed::from_num(100);
        let field = catalog.get_str("healing_matrix").unwrap();
        queue_spell(&mut state, field, Team::Player, Vec2Fixed::from_ints(300, 300));
        tick_pending(&mut state, &catalog, 1000);

        // 62 ticks of 16ms end at 992ms: only the opening pulse.
        for _ in 0..62 {
            tick_active(&mut state, &catalog, 16);
        }
        assert_eq!(state.unit(ally).unwrap().hp, Fixed::from_num(160));

        // The next tick spans 1000ms.
        tick_active(&mut state, &catalog, 16);
        assert_eq!(state.unit(ally).unwrap().hp, Fixed::from_num(220));

        while !state.active_spells.is_empty() {
            tick_active(&mut state, &catalog, 16);
        }
        assert_eq!(state.unit(ally).unwrap().hp, Fixed::from_num(400));
    }

    #[test]
    fn test_long_tick_fires_every_pulse_inside_it() {
        let catalog = catalog();
        let mut state = MatchState::empty(&MatchRules::default());
        let ally = place(&mut state, &catalog, "shock_trooper", Team::Player, 300, 300);
        state.units[0].hp = Fixed::from_num(100);
        let field = catalog.get_str("healing_matrix").unwrap();
        queue_spell(&mut state, field, Team::Player, Vec2Fixed::from_ints(300, 300));
        tick_pending(&mut state, &catalog, 1000);

        tick_active(&mut state, &catalog, 2500);
        assert_eq!(state.unit(ally).unwrap().hp, Fixed::from_num(280));
        tick_active(&mut state, &catalog, 2500);
        assert!(state.active_spells.is_empty());
        assert_eq!(state.unit(ally).unwrap().hp, Fixed::from_num(400));
    }

    #[test]
    fn test_unknown_spell_card_is_dropped() {
        let catalog = catalog();
        let mut state = MatchState::empty(&MatchRules::default());
        state.pending_spells.push(PendingSpell {
            id: 99,
            card_id: "missing".into(),
            team: Team::Player,
            position: Vec2Fixed::from_ints(300, 300),
            timer_ms: 10,
        });
        tick_pending(&mut state, &catalog, 16);
        assert!(state.pending_spells.is_empty());
        assert!(state.active_spells.is_empty());
    }
}
