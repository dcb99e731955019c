//! Opponent policies for headless play.
//!
//! A policy looks at a snapshot and proposes actions for its side. It never
//! touches the state; the runner applies the actions through the engine's
//! validated entry points, so a bad proposal is simply rejected.

use nexo_core::abilities::AbilitySelection;
use nexo_core::arena::{bridge_center, forward};
use nexo_core::cards::{CardCatalog, CardDef};
use nexo_core::components::{CardId, Lane, Team, TowerLane, TowerTier};
use nexo_core::math::{Fixed, Vec2Fixed};
use nexo_core::state::MatchState;

use crate::scenario::PolicyKind;

/// Something a side wants to do between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Play a card from hand at a point.
    Deploy {
        /// Card to play.
        card: CardId,
        /// Drop point.
        position: Vec2Fixed,
    },
    /// Cast the commander ability.
    Ability(AbilitySelection),
}

/// Decision-maker for one side.
pub trait OpponentPolicy: Send {
    /// Short name for logs and summaries.
    fn name(&self) -> &'static str;

    /// Actions to attempt before the next tick, in order.
    fn decide(&mut self, state: &MatchState, team: Team, catalog: &CardCatalog) -> Vec<Action>;
}

/// Build the policy for a scenario side.
#[must_use]
pub fn policy_for(kind: PolicyKind) -> Box<dyn OpponentPolicy> {
    match kind {
        PolicyKind::Scripted => Box::new(ScriptedPolicy::default()),
        PolicyKind::Idle => Box::new(IdlePolicy),
    }
}

/// Does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdlePolicy;

impl OpponentPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn decide(&mut self, _state: &MatchState, _team: Team, _catalog: &CardCatalog) -> Vec<Action> {
        Vec::new()
    }
}

/// Distance behind the centerline where units are dropped.
const DROP_DEPTH: i32 = 180;

/// Simple scripted opponent.
///
/// Every `think_interval_ms` it casts its selected ability when ready and
/// affordable, then plays the cheapest affordable card in hand into its
/// weaker lane.
#[derive(Debug, Clone)]
pub struct ScriptedPolicy {
    /// Minimum time between decisions.
    pub think_interval_ms: u64,
    next_decision_ms: u64,
}

impl Default for ScriptedPolicy {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ScriptedPolicy {
    /// Policy that decides at most once per `think_interval_ms`.
    #[must_use]
    pub fn new(think_interval_ms: u64) -> Self {
        Self {
            think_interval_ms,
            next_decision_ms: 0,
        }
    }
}

impl OpponentPolicy for ScriptedPolicy {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn decide(&mut self, state: &MatchState, team: Team, catalog: &CardCatalog) -> Vec<Action> {
        if state.time_ms < self.next_decision_ms {
            return Vec::new();
        }
        self.next_decision_ms = state.time_ms + self.think_interval_ms;

        let mut actions = Vec::new();
        let mut budget = *state.energy.get(team);

        if let Some(selection) = state.selected_ability.get(team) {
            let cost = Fixed::from_num(selection.id().cost());
            if *state.ability_cooldown_ms.get(team) == 0 && budget >= cost {
                actions.push(Action::Ability(selection.clone()));
                budget -= cost;
            }
        }

        if let Some(card) = cheapest_affordable(state, team, catalog, budget) {
            let lane = weaker_lane(state, team);
            let position = if card.is_spell() {
                spell_target(state, team, lane)
            } else {
                drop_point(team, lane)
            };
            actions.push(Action::Deploy {
                card: card.id.clone(),
                position,
            });
        }
        actions
    }
}

/// Cheapest card in hand the side can pay for; ties keep hand order.
#[must_use]
pub fn cheapest_affordable<'a>(
    state: &MatchState,
    team: Team,
    catalog: &'a CardCatalog,
    budget: Fixed,
) -> Option<&'a CardDef> {
    state
        .hands
        .get(team)
        .iter()
        .filter_map(|id| catalog.get(id))
        .filter(|card| Fixed::from_num(card.cost) <= budget)
        .fold(None, |best: Option<&CardDef>, card| match best {
            Some(b) if b.cost <= card.cost => Some(b),
            _ => Some(card),
        })
}

/// Lane whose own outer tower has the least hp left. A fallen outer tower
/// counts as zero; ties go to the top lane.
#[must_use]
pub fn weaker_lane(state: &MatchState, team: Team) -> Lane {
    let outer_hp = |lane: TowerLane| {
        state
            .towers
            .iter()
            .find(|t| t.team == team && t.tier == TowerTier::Outer && t.lane == lane)
            .map_or(Fixed::ZERO, |t| if t.alive { t.hp } else { Fixed::ZERO })
    };
    if outer_hp(TowerLane::Bottom) < outer_hp(TowerLane::Top) {
        Lane::Bottom
    } else {
        Lane::Top
    }
}

/// Drop point on the side's own half, level with the lane's bridge.
#[must_use]
pub fn drop_point(team: Team, lane: Lane) -> Vec2Fixed {
    let bridge = bridge_center(lane);
    let x = bridge.x - Fixed::from_num(DROP_DEPTH * forward(team));
    Vec2Fixed::new(x, bridge.y)
}

/// Spell aim: the enemy unit deepest into our half in that lane, else the
/// first standing enemy tower guarding it, else the enemy king.
#[must_use]
pub fn spell_target(state: &MatchState, team: Team, lane: Lane) -> Vec2Fixed {
    let enemy = team.opponent();
    let depth = |position: Vec2Fixed| match team {
        Team::Player => -position.x,
        Team::Ai => position.x,
    };
    let deepest = state
        .living_units()
        .filter(|u| u.team == enemy && u.lane == lane)
        .max_by_key(|u| depth(u.position));
    if let Some(unit) = deepest {
        return unit.position;
    }
    state
        .towers
        .iter()
        .filter(|t| t.team == enemy && t.alive && t.lane.guards(lane))
        .max_by_key(|t| depth(t.position))
        .or_else(|| state.king(enemy))
        .map_or_else(|| bridge_center(lane), |t| t.position)
}
