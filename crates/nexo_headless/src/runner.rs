//! Match runner driving the simulation with policies.
//!
//! The runner owns the state and the jitter source, asks each side's policy
//! for actions between ticks, applies them through the engine's validated
//! entry points, then advances the clock by one tick.

use thiserror::Error;
use tracing::{debug, info};

use nexo_core::components::{CardId, PerTeam, Team};
use nexo_core::entropy::SeededEntropy;
use nexo_core::error::GameError;
use nexo_core::simulation::Simulation;
use nexo_core::state::MatchState;

use crate::metrics::MatchSummary;
use crate::policy::{policy_for, Action, OpponentPolicy};
use crate::scenario::{Scenario, ScenarioError};

/// Error type for setting up a run.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The scenario is unusable.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// The card catalog failed to load.
    #[error(transparent)]
    Catalog(#[from] GameError),
}

/// Runs one match from a scenario.
pub struct MatchRunner {
    scenario: String,
    seed: u64,
    sim: Simulation,
    state: MatchState,
    entropy: SeededEntropy,
    policies: PerTeam<Box<dyn OpponentPolicy>>,
    tick_ms: u32,
    max_ticks: u64,
    ticks: u64,
}

impl std::fmt::Debug for MatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchRunner")
            .field("scenario", &self.scenario)
            .field("seed", &self.seed)
            .field("ticks", &self.ticks)
            .field("status", &self.state.status)
            .finish_non_exhaustive()
    }
}

impl MatchRunner {
    /// Set up a match from a scenario and simulation.
    ///
    /// # Errors
    ///
    /// Fails if the scenario does not validate against the catalog.
    pub fn new(scenario: &Scenario, sim: Simulation) -> Result<Self, RunnerError> {
        scenario.validate(sim.catalog())?;

        let mut state = MatchState::new_match(
            &scenario.rules,
            scenario.player.deck_ids(),
            scenario.ai.deck_ids(),
        );
        for team in Team::ALL {
            if let Some(ability) = &scenario.side(team).ability {
                *state.selected_ability.get_mut(team) = Some(ability.selection()?);
            }
        }

        Ok(Self {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            sim,
            state,
            entropy: SeededEntropy::new(scenario.seed),
            policies: PerTeam::new(
                policy_for(scenario.player.policy),
                policy_for(scenario.ai.policy),
            ),
            tick_ms: scenario.tick_ms,
            max_ticks: scenario.max_ticks,
            ticks: 0,
        })
    }

    /// Set up a match using the built-in card catalog.
    ///
    /// # Errors
    ///
    /// Fails if the catalog does not load or the scenario is invalid.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self, RunnerError> {
        Self::new(scenario, Simulation::with_builtin_catalog()?)
    }

    /// Current match state.
    #[must_use]
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Ticks simulated so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// True once the match is decided or the tick budget is spent.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state.status.is_finished() || self.ticks >= self.max_ticks
    }

    /// Let both sides act, then advance one tick.
    pub fn step(&mut self) {
        for team in Team::ALL {
            let actions = self
                .policies
                .get_mut(team)
                .decide(&self.state, team, self.sim.catalog());
            for action in actions {
                self.apply(team, action);
            }
        }
        self.state = self.sim.advance(&self.state, self.tick_ms, &mut self.entropy);
        self.ticks += 1;
    }

    /// Run until decided or out of ticks.
    pub fn run(&mut self) -> MatchSummary {
        info!(
            scenario = %self.scenario,
            seed = self.seed,
            player = self.policies.player.name(),
            ai = self.policies.ai.name(),
            "match started"
        );
        while !self.is_done() {
            self.step();
        }
        let summary = self.summary();
        info!(
            status = ?summary.status,
            ticks = summary.ticks,
            duration_ms = summary.duration_ms,
            "match finished"
        );
        summary
    }

    /// Summary of the match as it stands.
    #[must_use]
    pub fn summary(&self) -> MatchSummary {
        MatchSummary::from_state(&self.scenario, self.seed, self.ticks, &self.state)
    }

    fn apply(&mut self, team: Team, action: Action) {
        let result = match &action {
            Action::Deploy { card, position } => self
                .sim
                .try_deploy_card(&self.state, card, team, *position, &mut self.entropy)
                .map(|mut next| {
                    cycle_card(&mut next, team, card);
                    next
                }),
            Action::Ability(selection) => {
                self.sim
                    .try_apply_ability(&self.state, team, selection, &mut self.entropy)
            }
        };
        match result {
            Ok(next) => self.state = next,
            Err(reason) => debug!(?team, ?action, %reason, "action rejected"),
        }
    }
}

/// Move a played card from hand to the back of the deck and draw the next.
///
/// Cards not in hand (for example scripted test deploys) leave hand and deck
/// untouched.
pub fn cycle_card(state: &mut MatchState, team: Team, card: &CardId) {
    let hand = state.hands.get_mut(team);
    let Some(slot) = hand.iter().position(|c| c == card) else {
        return;
    };
    let played = hand.remove(slot);
    let deck = state.decks.get_mut(team);
    deck.push(played);
    let drawn = deck.remove(0);
    state.hands.get_mut(team).insert(slot, drawn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::PolicyKind;
    use nexo_core::rules::MatchRules;

    fn ids(cards: &[&str]) -> Vec<CardId> {
        cards.iter().map(|c| CardId::new(*c)).collect()
    }

    #[test]
    fn test_cycle_card_draws_into_same_slot() {
        let deck = ids(&["a", "b", "c", "d", "e", "f"]);
        let mut state = MatchState::new_match(&MatchRules::default(), deck, Vec::new());
        cycle_card(&mut state, Team::Player, &CardId::new("b"));
        assert_eq!(state.hands.player, ids(&["a", "e", "c", "d"]));
        assert_eq!(state.decks.player, ids(&["f", "b"]));
    }

    #[test]
    fn test_cycle_card_with_four_card_deck_returns_same_card() {
        let deck = ids(&["a", "b", "c", "d"]);
        let mut state = MatchState::new_match(&MatchRules::default(), deck.clone(), Vec::new());
        cycle_card(&mut state, Team::Player, &CardId::new("c"));
        assert_eq!(state.hands.player, deck);
        assert!(state.decks.player.is_empty());
    }

    #[test]
    fn test_cycle_card_ignores_cards_not_in_hand() {
        let deck = ids(&["a", "b", "c", "d", "e"]);
        let mut state = MatchState::new_match(&MatchRules::default(), deck, Vec::new());
        cycle_card(&mut state, Team::Player, &CardId::new("e"));
        assert_eq!(state.hands.player, ids(&["a", "b", "c", "d"]));
        assert_eq!(state.decks.player, ids(&["e"]));
    }

    #[test]
    fn test_runner_sets_selected_abilities() {
        let runner = MatchRunner::from_scenario(&Scenario::skirmish()).unwrap();
        assert!(runner.state().selected_ability.player.is_some());
        assert!(runner.state().selected_ability.ai.is_some());
        assert_eq!(runner.ticks(), 0);
    }

    #[test]
    fn test_idle_sides_time_out() {
        let mut scenario = Scenario::skirmish();
        scenario.player.policy = PolicyKind::Idle;
        scenario.ai.policy = PolicyKind::Idle;
        scenario.tick_ms = 1000;
        let mut runner = MatchRunner::from_scenario(&scenario).unwrap();
        let summary = runner.run();
        assert!(summary.status.is_finished() || summary.ticks == scenario.max_ticks);
        assert_eq!(summary.player.cards_played, 0);
        assert_eq!(summary.ai.cards_played, 0);
    }
}
