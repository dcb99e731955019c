//! The per-tick transition function and the between-tick actions.
//!
//! Every entry point borrows a [`MatchState`] and returns a new one. The
//! input is never modified, so a caller may keep reading the previous
//! snapshot while the next one is computed.

use tracing::debug;

use crate::abilities::{self, hive, mecha, mothership, AbilitySelection};
use crate::arena::{lane_for_y, on_home_half};
use crate::cards::{CardCatalog, CardDef};
use crate::clock::tick_clock;
use crate::combat::{
    apply_damage, overclock, resolve_hit, resolves_instantly, tick_poison, AttackProfile, Victim,
};
use crate::components::{CardId, EffectKind, ProjectileStyle, Team, Unit, UnitKind};
use crate::entropy::Entropy;
use crate::error::{ActionRejected, Result};
use crate::factory::{spawn_squad, DEPLOY_SPREAD};
use crate::math::{Fixed, Vec2Fixed};
use crate::movement::next_position;
use crate::projectiles::{launch, tick_projectiles, Launch};
use crate::spells::{queue_spell, tick_active, tick_pending};
use crate::state::{MatchState, MatchStatus};
use crate::targeting::{nearest_target, Target};
use crate::towers::{resolve_tower_deaths, tick_towers};

/// Scatter radius for split-on-death children.
pub const SPLIT_SPREAD: i32 = 20;

const MUZZLE_MS: u32 = 150;
const DEATH_EFFECT_MS: u32 = 500;

/// The battle engine.
///
/// Holds the card catalog; all match data lives in [`MatchState`].
///
/// # Tick Order
///
/// Each call to [`advance`](Self::advance) runs, in order:
/// 1. **Reap** - remove units killed by actions since the last tick
/// 2. **Clock** - time, energy, cooldowns, overtime and time-out
/// 3. **Lane locks** - release locks for fallen towers
/// 4. **Effects** - count down presentation effects
/// 5. **Spells** - pending impacts, then lingering fields
/// 6. **Units** - overclock, poison, capabilities, stun, targeting, attack or move
/// 7. **Towers** - shockwave and first-in-range fire
/// 8. **Projectiles** - homing and impact
/// 9. **Tower deaths** - destruction and match end
/// 10. **Reap** - remove units that died this tick
#[derive(Debug, Clone)]
pub struct Simulation {
    catalog: CardCatalog,
}

impl Simulation {
    /// Engine over the given catalog.
    #[must_use]
    pub fn new(catalog: CardCatalog) -> Self {
        Self { catalog }
    }

    /// Engine over the compiled-in card table.
    ///
    /// # Example
    ///
    /// ```
    /// use nexo_core::entropy::NoJitter;
    /// use nexo_core::rules::MatchRules;
    /// use nexo_core::simulation::Simulation;
    /// use nexo_core::state::MatchState;
    ///
    /// let sim = Simulation::with_builtin_catalog().unwrap();
    /// let state = MatchState::new_match(&MatchRules::default(), Vec::new(), Vec::new());
    /// let next = sim.advance(&state, 16, &mut NoJitter);
    /// assert_eq!(next.time_ms, 16);
    /// assert_eq!(state.time_ms, 0);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in table fails to parse.
    pub fn with_builtin_catalog() -> Result<Self> {
        Ok(Self::new(CardCatalog::builtin()?))
    }

    /// The card catalog.
    #[must_use]
    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    /// Advance the match by `delta_ms`.
    ///
    /// Matches that are not playing (finished or behind an overlay) are
    /// returned unchanged.
    #[must_use]
    pub fn advance(&self, state: &MatchState, delta_ms: u32, entropy: &mut dyn Entropy) -> MatchState {
        let mut next = state.clone();
        if next.status != MatchStatus::Playing {
            return next;
        }

        self.reap(&mut next, entropy);

        tick_clock(&mut next, delta_ms);
        // A time-out ends the tick before combat, so no king can fall on the
        // same tick the clock decides the match.
        if next.status != MatchStatus::Playing {
            return next;
        }

        next.refresh_lane_locks();

        for effect in &mut next.effects {
            effect.timer_ms = effect.timer_ms.saturating_sub(delta_ms);
        }
        next.effects.retain(|e| e.timer_ms > 0);

        tick_pending(&mut next, &self.catalog, delta_ms);
        tick_active(&mut next, &self.catalog, delta_ms);

        self.update_units(&mut next, delta_ms, entropy);

        tick_towers(&mut next, delta_ms);
        tick_projectiles(&mut next, delta_ms);
        resolve_tower_deaths(&mut next);

        self.reap(&mut next, entropy);

        debug!(time_ms = next.time_ms, state_hash = next.state_hash(), "tick");
        next
    }

    fn update_units(&self, state: &mut MatchState, delta_ms: u32, entropy: &mut dyn Entropy) {
        let overtime = state.is_overtime();
        // Units spawned during this pass act from the next tick.
        let count = state.units.len();

        for index in 0..count {
            if !state.units[index].is_active() {
                continue;
            }
            if overtime {
                overclock(&mut state.units[index]);
            }

            // Poison ticks whether or not the unit is stunned.
            let drain = tick_poison(&mut state.units[index], delta_ms);
            if drain > Fixed::ZERO {
                let (id, team) = (state.units[index].id, state.units[index].team);
                apply_damage(state, Victim::Unit(id), drain, team.opponent());
            }

            hive::tick_spawner(state, &self.catalog, index, delta_ms, entropy);
            mothership::tick_payload(state, &self.catalog, index, delta_ms, entropy);
            mecha::tick_beam(state, index, delta_ms);
            if !state.units[index].is_active() {
                continue;
            }

            let unit = &mut state.units[index];
            if unit.status.stun_ms > 0 {
                unit.status.stun_ms = unit.status.stun_ms.saturating_sub(delta_ms);
                continue;
            }

            act(state, index, delta_ms);
        }
    }

    /// Remove dead units, leaving a death effect and spawning split children.
    fn reap(&self, state: &mut MatchState, entropy: &mut dyn Entropy) {
        if state.units.iter().all(Unit::is_active) {
            return;
        }
        let (living, dead): (Vec<Unit>, Vec<Unit>) =
            std::mem::take(&mut state.units).into_iter().partition(Unit::is_active);
        state.units = living;

        for unit in dead {
            state.push_effect(EffectKind::Explosion, unit.position, DEATH_EFFECT_MS, None, Some(unit.team));
            let Some(split) = unit.capabilities.split else {
                continue;
            };
            if let Some(child) = self.catalog.get(&split.child_card) {
                spawn_squad(state, child, unit.team, unit.position, unit.lane, SPLIT_SPREAD, entropy);
            }
        }
    }

    /// Check a deploy without applying it.
    ///
    /// # Errors
    ///
    /// Returns why the deploy would be refused.
    pub fn can_deploy(
        &self,
        state: &MatchState,
        card_id: &CardId,
        team: Team,
        position: Vec2Fixed,
    ) -> std::result::Result<(), ActionRejected> {
        self.validate_deploy(state, card_id, team, position).map(|_| ())
    }

    fn validate_deploy(
        &self,
        state: &MatchState,
        card_id: &CardId,
        team: Team,
        position: Vec2Fixed,
    ) -> std::result::Result<&CardDef, ActionRejected> {
        if state.status != MatchStatus::Playing {
            return Err(ActionRejected::NotPlaying);
        }
        let card = self
            .catalog
            .get(card_id)
            .ok_or_else(|| ActionRejected::UnknownCard(card_id.to_string()))?;
        if *state.energy.get(team) < Fixed::from_num(card.cost) {
            return Err(ActionRejected::InsufficientEnergy {
                team,
                required: card.cost,
                available: state.whole_energy(team),
            });
        }
        if card.needs_home_zone() && !on_home_half(team, position.x) {
            return Err(ActionRejected::InvalidZone(card_id.to_string()));
        }
        Ok(card)
    }

    /// Deploy a card, reporting why it was refused.
    ///
    /// Deducts energy and records usage. Spells are queued for impact at
    /// `position`; units spawn around it. Hands and decks are left to the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns the refusal reason; nothing is applied in that case.
    pub fn try_deploy_card(
        &self,
        state: &MatchState,
        card_id: &CardId,
        team: Team,
        position: Vec2Fixed,
        entropy: &mut dyn Entropy,
    ) -> std::result::Result<MatchState, ActionRejected> {
        let card = self.validate_deploy(state, card_id, team, position)?;

        let mut next = state.clone();
        let energy = next.energy.get_mut(team);
        *energy = (*energy - Fixed::from_num(card.cost)).max(Fixed::ZERO);
        next.metrics.record_card(team, &card.id, card.cost);

        if card.is_spell() {
            queue_spell(&mut next, card, team, position);
        } else {
            spawn_squad(&mut next, card, team, position, lane_for_y(position.y), DEPLOY_SPREAD, entropy);
        }
        debug!(?team, card = %card.id, "card deployed");
        Ok(next)
    }

    /// Deploy a card. A refused deploy returns the input unchanged.
    #[must_use]
    pub fn deploy_card(
        &self,
        state: &MatchState,
        card_id: &CardId,
        team: Team,
        position: Vec2Fixed,
        entropy: &mut dyn Entropy,
    ) -> MatchState {
        match self.try_deploy_card(state, card_id, team, position, entropy) {
            Ok(next) => next,
            Err(reason) => {
                debug!(?team, card = %card_id, %reason, "deploy rejected");
                state.clone()
            }
        }
    }

    /// Cast a commander ability, reporting why it was refused.
    ///
    /// # Errors
    ///
    /// Returns the refusal reason; nothing is applied in that case.
    pub fn try_apply_ability(
        &self,
        state: &MatchState,
        team: Team,
        selection: &AbilitySelection,
        entropy: &mut dyn Entropy,
    ) -> std::result::Result<MatchState, ActionRejected> {
        abilities::cast(state, &self.catalog, team, selection, entropy)
    }

    /// Cast a commander ability. A refused cast returns the input unchanged.
    #[must_use]
    pub fn apply_ability(
        &self,
        state: &MatchState,
        team: Team,
        selection: &AbilitySelection,
        entropy: &mut dyn Entropy,
    ) -> MatchState {
        match self.try_apply_ability(state, team, selection, entropy) {
            Ok(next) => next,
            Err(reason) => {
                debug!(?team, ability = %selection.id(), %reason, "ability rejected");
                state.clone()
            }
        }
    }
}

/// Target, then attack if in range and ready, otherwise move.
fn act(state: &mut MatchState, index: usize, delta_ms: u32) {
    let unit = state.units[index].clone();
    let target = nearest_target(&unit, state);
    state.units[index].target = target.and_then(|t| t.id());
    let Some(target) = target else {
        return;
    };

    if target.is_attackable() && unit.position.within(target.position(), unit.range) {
        let ready = state.time_ms.saturating_sub(unit.last_attack_ms) >= u64::from(unit.attack_interval_ms);
        if ready {
            attack(state, index, &unit, target);
        }
        return;
    }

    state.units[index].position = next_position(&unit, target.position(), &state.units, delta_ms);
}

fn attack(state: &mut MatchState, index: usize, unit: &Unit, target: Target) {
    let victim = match target {
        Target::Unit { id, .. } => Victim::Unit(id),
        Target::Tower { id, .. } => Victim::Tower(id),
        Target::Retreat { .. } => return,
    };
    state.units[index].last_attack_ms = state.time_ms;
    state.push_effect(EffectKind::Muzzle, unit.position, MUZZLE_MS, None, Some(unit.team));

    if resolves_instantly(unit) {
        if unit.projectile_style == ProjectileStyle::Beam {
            state.push_beam(unit.position, target.position(), MUZZLE_MS, unit.team);
        }
        resolve_hit(state, &AttackProfile::from_unit(unit), victim, target.position(), true);
    } else {
        launch(
            state,
            Launch {
                origin: unit.position,
                target: victim,
                target_position: target.position(),
                damage: unit.damage,
                team: unit.team,
                style: unit.projectile_style,
                on_hit: unit.capabilities.on_hit,
                source_unit: Some(unit.id),
                from_tower: false,
                from_air: unit.kind == UnitKind::Air,
            },
        );
    }
}
