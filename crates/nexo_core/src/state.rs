//! Match state snapshot.
//!
//! [`MatchState`] is plain data: every engine entry point takes a borrowed
//! snapshot and returns a new one, so readers of the previous snapshot are
//! never disturbed.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::abilities::AbilitySelection;
use crate::arena::{ARENA_HEIGHT, ARENA_WIDTH};
use crate::components::{
    ActiveSpell, CardId, EffectKind, EntityId, PendingSpell, PerTeam, Projectile, Team, Tower,
    TowerLane, TowerTier, Unit, VisualEffect,
};
use crate::error::{GameError, Result};
use crate::math::{ratio, Fixed, Vec2Fixed};
use crate::rules::MatchRules;

/// Cards dealt into the opening hand.
pub const HAND_SIZE: usize = 4;

/// Match flow status.
///
/// `Victory` and `Defeat` are from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Pre-match overlay.
    Start,
    /// Simulation running.
    Playing,
    /// Player won.
    Victory,
    /// Opponent won.
    Defeat,
    /// Nobody won.
    Draw,
    /// Card codex overlay.
    Codex,
    /// Deck editor overlay.
    DeckEditor,
}

impl MatchStatus {
    /// True once the match has been decided.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Victory | Self::Defeat | Self::Draw)
    }

    /// True for UI overlays that suspend the simulation.
    #[must_use]
    pub const fn is_overlay(self) -> bool {
        matches!(self, Self::Start | Self::Codex | Self::DeckEditor)
    }

    /// Status that awards the match to `team`.
    #[must_use]
    pub const fn win_for(team: Team) -> Self {
        match team {
            Team::Player => Self::Victory,
            Team::Ai => Self::Defeat,
        }
    }

    /// Winning side, if decided.
    #[must_use]
    pub const fn winner(self) -> Option<Team> {
        match self {
            Self::Victory => Some(Team::Player),
            Self::Defeat => Some(Team::Ai),
            _ => None,
        }
    }
}

/// Arena presentation and behaviour phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArenaState {
    /// Regular time.
    Normal,
    /// Final stretch of regular time.
    OvertimeGlitch,
    /// Tie-breaker extension.
    SuddenDeath,
}

/// Per-team post-match statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchMetrics {
    /// Damage dealt to anything.
    #[serde(with = "per_team_fixed")]
    pub damage_dealt: PerTeam<Fixed>,
    /// Damage dealt to towers only.
    #[serde(with = "per_team_fixed")]
    pub tower_damage_dealt: PerTeam<Fixed>,
    /// Energy spent on cards.
    pub cost_spent: PerTeam<u32>,
    /// Cards deployed.
    pub cards_played: PerTeam<u32>,
    /// Deploys per card id.
    pub card_usage: PerTeam<BTreeMap<CardId, u32>>,
    /// Commander abilities cast.
    pub abilities_cast: PerTeam<u32>,
}

impl MatchMetrics {
    /// Record a card deploy.
    pub fn record_card(&mut self, team: Team, card: &CardId, cost: u32) {
        *self.cost_spent.get_mut(team) += cost;
        *self.cards_played.get_mut(team) += 1;
        *self
            .card_usage
            .get_mut(team)
            .entry(card.clone())
            .or_insert(0) += 1;
    }

    /// Average energy per card played, or zero.
    #[must_use]
    pub fn average_cost(&self, team: Team) -> Fixed {
        let played = *self.cards_played.get(team);
        if played == 0 {
            return Fixed::ZERO;
        }
        Fixed::from_num(*self.cost_spent.get(team)) / Fixed::from_num(played)
    }

    /// Most deployed card; ties go to the smallest id.
    #[must_use]
    pub fn most_used_card(&self, team: Team) -> Option<(&CardId, u32)> {
        self.card_usage
            .get(team)
            .iter()
            .fold(None, |best: Option<(&CardId, u32)>, (id, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((id, count)),
            })
    }
}

/// Complete snapshot of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    /// Tunables in force for this match.
    pub rules: MatchRules,
    /// Elapsed match time.
    pub time_ms: u64,
    /// Flow status.
    pub status: MatchStatus,
    /// Status to restore when an overlay closes.
    pub previous_status: Option<MatchStatus>,
    /// Energy per side.
    #[serde(with = "per_team_fixed")]
    pub energy: PerTeam<Fixed>,
    /// Cards in hand. The engine never mutates these.
    pub hands: PerTeam<Vec<CardId>>,
    /// Draw queues. The engine never mutates these.
    pub decks: PerTeam<Vec<CardId>>,
    /// Commander ability cooldowns.
    pub ability_cooldown_ms: PerTeam<u32>,
    /// Configured commander ability per side.
    pub selected_ability: PerTeam<Option<AbilitySelection>>,
    /// Arena phase.
    pub arena_state: ArenaState,
    /// Match time of the last arena phase change.
    pub arena_state_since_ms: u64,
    /// Tie-breaker active.
    pub sudden_death: bool,
    /// Time added by sudden death (zero before it starts).
    pub sudden_death_extension_ms: u64,
    /// Cumulative damage taken per side.
    #[serde(with = "per_team_fixed")]
    pub damage_taken: PerTeam<Fixed>,
    /// Post-match statistics.
    pub metrics: MatchMetrics,
    /// Living units (dead ones are reaped each tick).
    pub units: Vec<Unit>,
    /// All towers, dead or alive.
    pub towers: Vec<Tower>,
    /// In-flight projectiles.
    pub projectiles: Vec<Projectile>,
    /// Spells waiting for impact.
    pub pending_spells: Vec<PendingSpell>,
    /// Lingering area spells.
    pub active_spells: Vec<ActiveSpell>,
    /// Presentation effects.
    pub effects: Vec<VisualEffect>,
    /// Next entity id to hand out.
    pub next_entity_id: EntityId,
}

/// Static placement of one tower in the player's layout.
struct TowerSlot {
    tier: TowerTier,
    lane: TowerLane,
    x: i32,
    y_offset: i32,
    hp: i32,
    range: i32,
    damage: i32,
}

const TOWER_LAYOUT: [TowerSlot; 5] = [
    TowerSlot { tier: TowerTier::King, lane: TowerLane::Center, x: 100, y_offset: 0, hp: 2975, range: 330, damage: 130 },
    TowerSlot { tier: TowerTier::Inner, lane: TowerLane::Top, x: 220, y_offset: -120, hp: 1530, range: 270, damage: 95 },
    TowerSlot { tier: TowerTier::Inner, lane: TowerLane::Bottom, x: 220, y_offset: 120, hp: 1530, range: 270, damage: 95 },
    TowerSlot { tier: TowerTier::Outer, lane: TowerLane::Top, x: 380, y_offset: -180, hp: 2040, range: 270, damage: 90 },
    TowerSlot { tier: TowerTier::Outer, lane: TowerLane::Bottom, x: 380, y_offset: 180, hp: 2040, range: 270, damage: 90 },
];

/// Milliseconds between tower shots.
pub const TOWER_ATTACK_INTERVAL_MS: u32 = 1100;

impl MatchState {
    /// Fresh match with the standard tower layout and dealt hands.
    ///
    /// The first [`HAND_SIZE`] cards of each deck form the opening hand.
    #[must_use]
    pub fn new_match(rules: &MatchRules, player_deck: Vec<CardId>, ai_deck: Vec<CardId>) -> Self {
        let (player_hand, player_rest) = deal(player_deck);
        let (ai_hand, ai_rest) = deal(ai_deck);
        let mut state = Self::empty(rules);
        state.hands = PerTeam::new(player_hand, ai_hand);
        state.decks = PerTeam::new(player_rest, ai_rest);
        for team in Team::ALL {
            for slot in &TOWER_LAYOUT {
                let id = state.next_id();
                state.towers.push(build_tower(id, team, slot));
            }
        }
        state.refresh_lane_locks();
        state
    }

    /// Playing state with no towers, units or cards.
    #[must_use]
    pub fn empty(rules: &MatchRules) -> Self {
        let start = Fixed::from_num(rules.starting_energy);
        Self {
            rules: rules.clone(),
            time_ms: 0,
            status: MatchStatus::Playing,
            previous_status: None,
            energy: PerTeam::splat(start),
            hands: PerTeam::default(),
            decks: PerTeam::default(),
            ability_cooldown_ms: PerTeam::default(),
            selected_ability: PerTeam::default(),
            arena_state: ArenaState::Normal,
            arena_state_since_ms: 0,
            sudden_death: false,
            sudden_death_extension_ms: 0,
            damage_taken: PerTeam::splat(Fixed::ZERO),
            metrics: MatchMetrics::default(),
            units: Vec::new(),
            towers: Vec::new(),
            projectiles: Vec::new(),
            pending_spells: Vec::new(),
            active_spells: Vec::new(),
            effects: Vec::new(),
            next_entity_id: 1,
        }
    }

    /// Hand out a fresh entity id.
    pub fn next_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Total clock length including any sudden-death extension.
    #[must_use]
    pub fn total_duration_ms(&self) -> u64 {
        self.rules.match_duration_ms + self.sudden_death_extension_ms
    }

    /// Time left on the clock, floored at zero.
    #[must_use]
    pub fn remaining_ms(&self) -> u64 {
        self.total_duration_ms().saturating_sub(self.time_ms)
    }

    /// True during the final overtime window of the clock.
    #[must_use]
    pub fn is_overtime(&self) -> bool {
        let remaining = self.remaining_ms();
        remaining > 0 && remaining <= self.rules.overtime_window_ms
    }

    /// Whole energy points available to a side.
    #[must_use]
    pub fn whole_energy(&self, team: Team) -> u32 {
        self.energy.get(team).to_num::<i64>().clamp(0, i64::from(u32::MAX)) as u32
    }

    /// Units that are still alive.
    pub fn living_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| u.is_active())
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn unit(&self, id: EntityId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Look up a tower by id.
    #[must_use]
    pub fn tower(&self, id: EntityId) -> Option<&Tower> {
        self.towers.iter().find(|t| t.id == id)
    }

    /// A side's living king tower.
    #[must_use]
    pub fn king(&self, team: Team) -> Option<&Tower> {
        self.towers
            .iter()
            .find(|t| t.team == team && t.tier == TowerTier::King && t.alive)
    }

    /// Number of `team`'s own towers that have been destroyed.
    #[must_use]
    pub fn destroyed_towers(&self, team: Team) -> usize {
        self.towers
            .iter()
            .filter(|t| t.team == team && !t.alive)
            .count()
    }

    /// Recompute lane locks. Locks only ever release.
    pub fn refresh_lane_locks(&mut self) {
        for team in Team::ALL {
            let outer_alive = |lane: TowerLane, towers: &[Tower]| {
                towers
                    .iter()
                    .any(|t| t.team == team && t.tier == TowerTier::Outer && t.lane == lane && t.alive)
            };
            let top_outer = outer_alive(TowerLane::Top, &self.towers);
            let bottom_outer = outer_alive(TowerLane::Bottom, &self.towers);
            let inner_dead = self
                .towers
                .iter()
                .any(|t| t.team == team && t.tier == TowerTier::Inner && !t.alive);

            for tower in self.towers.iter_mut().filter(|t| t.team == team) {
                match (tower.tier, tower.lane) {
                    (TowerTier::Inner, TowerLane::Top) => tower.locked = tower.locked && top_outer,
                    (TowerTier::Inner, TowerLane::Bottom) => {
                        tower.locked = tower.locked && bottom_outer;
                    }
                    (TowerTier::King, _) => tower.locked = tower.locked && !inner_dead,
                    _ => tower.locked = false,
                }
            }
        }
    }

    /// Add a presentation effect.
    pub fn push_effect(
        &mut self,
        kind: EffectKind,
        position: Vec2Fixed,
        timer_ms: u32,
        radius: Option<Fixed>,
        team: Option<Team>,
    ) {
        let id = self.next_id();
        self.effects.push(VisualEffect {
            id,
            kind,
            position,
            origin: None,
            timer_ms,
            max_timer_ms: timer_ms,
            radius,
            team,
        });
    }

    /// Add a beam effect from `origin` to `target`.
    pub fn push_beam(&mut self, origin: Vec2Fixed, target: Vec2Fixed, timer_ms: u32, team: Team) {
        let id = self.next_id();
        self.effects.push(VisualEffect {
            id,
            kind: EffectKind::LaserBeam,
            position: target,
            origin: Some(origin),
            timer_ms,
            max_timer_ms: timer_ms,
            radius: None,
            team: Some(team),
        });
    }

    /// Show a UI overlay, remembering the current status.
    ///
    /// Non-overlay statuses are ignored. Opening a second overlay keeps the
    /// originally saved status so closing returns to the match.
    pub fn open_overlay(&mut self, overlay: MatchStatus) {
        if !overlay.is_overlay() || self.status == overlay {
            return;
        }
        if !self.status.is_overlay() {
            self.previous_status = Some(self.status);
        }
        self.status = overlay;
    }

    /// Close the current overlay and restore the saved status.
    pub fn close_overlay(&mut self) {
        if !self.status.is_overlay() {
            return;
        }
        self.status = self.previous_status.take().unwrap_or(MatchStatus::Playing);
    }

    /// Determinism fingerprint over the simulation-relevant fields.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.time_ms.hash(&mut hasher);
        self.status.hash(&mut hasher);
        self.arena_state.hash(&mut hasher);
        self.sudden_death.hash(&mut hasher);
        for team in Team::ALL {
            self.energy.get(team).to_bits().hash(&mut hasher);
            self.damage_taken.get(team).to_bits().hash(&mut hasher);
            self.ability_cooldown_ms.get(team).hash(&mut hasher);
        }

        self.units.len().hash(&mut hasher);
        for unit in &self.units {
            unit.id.hash(&mut hasher);
            unit.position.x.to_bits().hash(&mut hasher);
            unit.position.y.to_bits().hash(&mut hasher);
            unit.hp.to_bits().hash(&mut hasher);
            unit.max_hp.to_bits().hash(&mut hasher);
            unit.status.hash(&mut hasher);
        }

        for tower in &self.towers {
            tower.id.hash(&mut hasher);
            tower.hp.to_bits().hash(&mut hasher);
            tower.alive.hash(&mut hasher);
            tower.locked.hash(&mut hasher);
        }

        self.projectiles.len().hash(&mut hasher);
        for projectile in &self.projectiles {
            projectile.id.hash(&mut hasher);
            projectile.position.x.to_bits().hash(&mut hasher);
            projectile.position.y.to_bits().hash(&mut hasher);
        }

        self.pending_spells.len().hash(&mut hasher);
        self.active_spells.len().hash(&mut hasher);
        self.next_entity_id.hash(&mut hasher);

        hasher.finish()
    }

    /// Serialize the snapshot with bincode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize match: {e}")))
    }

    /// Restore a snapshot produced by [`MatchState::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid snapshot.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize match: {e}")))
    }
}

fn deal(mut deck: Vec<CardId>) -> (Vec<CardId>, Vec<CardId>) {
    let split = deck.len().min(HAND_SIZE);
    let rest = deck.split_off(split);
    (deck, rest)
}

fn build_tower(id: EntityId, team: Team, slot: &TowerSlot) -> Tower {
    let x = match team {
        Team::Player => Fixed::from_num(slot.x),
        Team::Ai => Fixed::from_num(ARENA_WIDTH - slot.x),
    };
    let y = ratio(ARENA_HEIGHT, 2) + Fixed::from_num(slot.y_offset);
    Tower {
        id,
        team,
        tier: slot.tier,
        lane: slot.lane,
        position: Vec2Fixed::new(x, y),
        hp: Fixed::from_num(slot.hp),
        max_hp: Fixed::from_num(slot.hp),
        range: Fixed::from_num(slot.range),
        damage: Fixed::from_num(slot.damage),
        attack_interval_ms: TOWER_ATTACK_INTERVAL_MS,
        last_attack_ms: 0,
        alive: true,
        locked: slot.tier != TowerTier::Outer,
        shockwave_cooldown_ms: 0,
    }
}

/// Serde support for `PerTeam<Fixed>` via raw bits.
pub(crate) mod per_team_fixed {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::components::PerTeam;
    use crate::math::Fixed;

    pub fn serialize<S>(value: &PerTeam<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        PerTeam::new(value.player.to_bits(), value.ai.to_bits()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PerTeam<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = PerTeam::<i64>::deserialize(deserializer)?;
        Ok(PerTeam::new(Fixed::from_bits(bits.player), Fixed::from_bits(bits.ai)))
    }
}
