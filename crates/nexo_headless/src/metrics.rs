//! Post-match metrics for headless runs.
//!
//! Summaries are plain serializable records so batch results can be written
//! to JSON and compared across runs.

use serde::{Deserialize, Serialize};

use nexo_core::components::Team;
use nexo_core::state::{MatchState, MatchStatus};

/// One side's numbers at the end of a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideSummary {
    /// Damage dealt to anything.
    pub damage_dealt: f64,
    /// Damage dealt to towers.
    pub tower_damage_dealt: f64,
    /// Damage received by this side.
    pub damage_taken: f64,
    /// Enemy towers destroyed by this side.
    pub towers_destroyed: usize,
    /// Cards deployed.
    pub cards_played: u32,
    /// Energy spent on cards.
    pub energy_spent: u32,
    /// Average cost per card played.
    pub average_cost: f64,
    /// Most deployed card and its count.
    pub most_used_card: Option<(String, u32)>,
    /// Commander abilities cast.
    pub abilities_cast: u32,
}

impl SideSummary {
    /// Collect a side's numbers from a match state.
    #[must_use]
    pub fn from_state(state: &MatchState, team: Team) -> Self {
        let metrics = &state.metrics;
        Self {
            damage_dealt: metrics.damage_dealt.get(team).to_num(),
            tower_damage_dealt: metrics.tower_damage_dealt.get(team).to_num(),
            damage_taken: state.damage_taken.get(team).to_num(),
            towers_destroyed: state.destroyed_towers(team.opponent()),
            cards_played: *metrics.cards_played.get(team),
            energy_spent: *metrics.cost_spent.get(team),
            average_cost: metrics.average_cost(team).to_num(),
            most_used_card: metrics
                .most_used_card(team)
                .map(|(id, count)| (id.to_string(), count)),
            abilities_cast: *metrics.abilities_cast.get(team),
        }
    }
}

/// Outcome of a single headless match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Scenario name.
    pub scenario: String,
    /// Seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Match clock at the end.
    pub duration_ms: u64,
    /// Final status.
    pub status: MatchStatus,
    /// Winning side, if any.
    pub winner: Option<Team>,
    /// Whether the match went to sudden death.
    pub sudden_death: bool,
    /// Hash of the final state for determinism checks.
    pub final_state_hash: u64,
    /// Left side.
    pub player: SideSummary,
    /// Right side.
    pub ai: SideSummary,
}

impl MatchSummary {
    /// Summarize a finished (or abandoned) match.
    #[must_use]
    pub fn from_state(scenario: &str, seed: u64, ticks: u64, state: &MatchState) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            ticks,
            duration_ms: state.time_ms,
            status: state.status,
            winner: state.status.winner(),
            sudden_death: state.sudden_death,
            final_state_hash: state.state_hash(),
            player: SideSummary::from_state(state, Team::Player),
            ai: SideSummary::from_state(state, Team::Ai),
        }
    }

    /// True when the match reached a result within the tick budget.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        self.status.is_finished()
    }

    /// Pretty JSON rendering.
    ///
    /// # Errors
    ///
    /// Fails only if serialization itself fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Aggregate over a batch of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches summarized.
    pub total_games: u32,
    /// Matches won by the left side.
    pub player_wins: u32,
    /// Matches won by the right side.
    pub ai_wins: u32,
    /// Drawn matches.
    pub draws: u32,
    /// Matches that hit the tick budget undecided.
    pub undecided: u32,
    /// Matches that went to sudden death.
    pub sudden_deaths: u32,
    /// Left side win rate over decided matches.
    pub player_win_rate: f64,
    /// Average match clock at the end.
    pub avg_duration_ms: f64,
    /// Shortest match.
    pub min_duration_ms: u64,
    /// Longest match.
    pub max_duration_ms: u64,
    /// Average cards played per match by the left side.
    pub avg_player_cards: f64,
    /// Average cards played per match by the right side.
    pub avg_ai_cards: f64,
}

impl BatchSummary {
    /// Calculate a summary from individual match summaries.
    #[must_use]
    pub fn from_summaries(games: &[MatchSummary]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_games: games.len() as u32,
            min_duration_ms: u64::MAX,
            ..Default::default()
        };

        let mut duration_sum = 0u64;
        let mut player_cards = 0u64;
        let mut ai_cards = 0u64;
        for game in games {
            match game.status {
                MatchStatus::Victory => summary.player_wins += 1,
                MatchStatus::Defeat => summary.ai_wins += 1,
                MatchStatus::Draw => summary.draws += 1,
                _ => summary.undecided += 1,
            }
            if game.sudden_death {
                summary.sudden_deaths += 1;
            }
            duration_sum += game.duration_ms;
            summary.min_duration_ms = summary.min_duration_ms.min(game.duration_ms);
            summary.max_duration_ms = summary.max_duration_ms.max(game.duration_ms);
            player_cards += u64::from(game.player.cards_played);
            ai_cards += u64::from(game.ai.cards_played);
        }

        let count = games.len() as f64;
        let decided = summary.player_wins + summary.ai_wins + summary.draws;
        if decided > 0 {
            summary.player_win_rate = f64::from(summary.player_wins) / f64::from(decided);
        }
        summary.avg_duration_ms = duration_sum as f64 / count;
        summary.avg_player_cards = player_cards as f64 / count;
        summary.avg_ai_cards = ai_cards as f64 / count;
        summary
    }
}
