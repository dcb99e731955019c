//! Entity definitions for the arena.
//!
//! Units are a core record plus an explicit set of optional capability
//! components. A unit may carry any combination of capabilities at once;
//! systems check for the component they need and skip units without it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Unique identifier for units, towers, projectiles, spells and effects.
pub type EntityId = u64;

/// Identifier of a card definition in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    /// Create a card id from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Classification
// ============================================================================

/// The two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// The human player, defending the left half.
    Player,
    /// The opponent, defending the right half.
    Ai,
}

impl Team {
    /// Both teams in a fixed order.
    pub const ALL: [Team; 2] = [Team::Player, Team::Ai];

    /// The opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Team::Player => Team::Ai,
            Team::Ai => Team::Player,
        }
    }
}

/// A value held once per team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PerTeam<T> {
    /// Player-side value.
    pub player: T,
    /// Opponent-side value.
    pub ai: T,
}

impl<T> PerTeam<T> {
    /// Create from both sides.
    pub const fn new(player: T, ai: T) -> Self {
        Self { player, ai }
    }

    /// Borrow the value for one team.
    pub fn get(&self, team: Team) -> &T {
        match team {
            Team::Player => &self.player,
            Team::Ai => &self.ai,
        }
    }

    /// Mutably borrow the value for one team.
    pub fn get_mut(&mut self, team: Team) -> &mut T {
        match team {
            Team::Player => &mut self.player,
            Team::Ai => &mut self.ai,
        }
    }
}

impl<T: Clone> PerTeam<T> {
    /// Same value for both sides.
    pub fn splat(value: T) -> Self {
        Self {
            player: value.clone(),
            ai: value,
        }
    }
}

/// Attack lane. Fixed at spawn for units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lane {
    /// Upper lane.
    Top,
    /// Lower lane.
    Bottom,
}

/// Movement class of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Walks and must use a bridge to cross the centerline.
    Ground,
    /// Flies over the centerline wall.
    Air,
    /// Stationary structure.
    Building,
    /// Spell card (never becomes a unit).
    Spell,
}

impl UnitKind {
    /// True for kinds bound by the bridge constraint.
    #[must_use]
    pub const fn is_grounded(self) -> bool {
        !matches!(self, UnitKind::Air)
    }
}

/// Card faction, carried for presentation and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Human forces.
    Human,
    /// Android forces.
    Android,
    /// Alien forces.
    Alien,
}

/// Which entities a unit is willing to pick as a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPreference {
    /// Enemy units and towers.
    Any,
    /// Enemy towers only.
    Towers,
    /// Enemy air units only.
    Air,
    /// Wounded allies (support units).
    Allies,
}

/// How an attack travels from attacker to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileStyle {
    /// Fast bolt.
    Laser,
    /// Plasma ball (towers use this).
    Plasma,
    /// Slow missile.
    Missile,
    /// Instant beam.
    Beam,
    /// Melee, instant and no projectile.
    None,
}

impl ProjectileStyle {
    /// True if damage is applied on the attack itself.
    #[must_use]
    pub const fn is_instant(self) -> bool {
        matches!(self, ProjectileStyle::None | ProjectileStyle::Beam)
    }
}

// ============================================================================
// Unit capabilities
// ============================================================================

/// Secondary behaviour applied when a unit's attack lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnHitEffect {
    /// Heals same-team targets by |damage|; does nothing to enemies.
    Heal,
    /// Applies (refreshes) a poison timer on unit targets.
    Poison {
        /// Poison duration in ms.
        dot_ms: u32,
        /// Attacker dies right after the hit.
        kamikaze: bool,
    },
}

/// Mothership payload: periodic copies of the hangar card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinforcementPayload {
    /// Card spawned on each cycle.
    pub payload_card: CardId,
    /// Cycle length in ms.
    pub interval_ms: u32,
    /// Time until the next drop.
    pub countdown_ms: u32,
}

/// Decaying structure that spawns units on a cadence (hive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicSpawner {
    /// Card spawned on each cycle.
    pub spawn_card: CardId,
    /// Units per cycle.
    pub spawn_count: u32,
    /// Cycle length in ms.
    pub interval_ms: u32,
    /// Time until the next cycle.
    pub countdown_ms: u32,
    /// Constant hp loss per millisecond.
    #[serde(with = "fixed_serde")]
    pub decay_per_ms: Fixed,
    /// On-hit behaviour given to spawned units.
    pub spawn_on_hit: Option<OnHitEffect>,
}

/// Children spawned when this unit dies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitOnDeath {
    /// Card of the children.
    pub child_card: CardId,
}

/// Mecha operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MechaMode {
    /// Shield pool only.
    Shield,
    /// Shield pool plus periodic beam.
    Laser,
}

/// Periodic secondary beam attack with its own cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeamCycle {
    /// Remaining firing window; 0 while cooling down.
    pub active_ms: u32,
    /// Remaining cooldown before the next window.
    pub cooldown_ms: u32,
    /// Time until the next damage tick within a window.
    pub tick_ms: u32,
}

/// Secondary hit-point pool absorbed before primary hp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualHealthPool {
    /// Remaining shield hp.
    #[serde(with = "fixed_serde")]
    pub shield_hp: Fixed,
    /// Shield capacity.
    #[serde(with = "fixed_serde")]
    pub shield_max: Fixed,
    /// Operating mode.
    pub mode: MechaMode,
    /// Beam state, present in laser mode.
    pub beam: Option<BeamCycle>,
}

/// Optional capability components attached to a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Mothership payload drops.
    pub payload: Option<ReinforcementPayload>,
    /// Hive spawner.
    pub spawner: Option<PeriodicSpawner>,
    /// Split into children on death.
    pub split: Option<SplitOnDeath>,
    /// On-hit side effect.
    pub on_hit: Option<OnHitEffect>,
    /// Mecha shield pool.
    pub dual_pool: Option<DualHealthPool>,
}

/// Status effect timers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusTimers {
    /// Remaining stun in ms.
    pub stun_ms: u32,
    /// Remaining poison in ms.
    pub dot_ms: u32,
}

// ============================================================================
// Entities
// ============================================================================

/// A live combatant on the arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Instance id.
    pub id: EntityId,
    /// Source card.
    pub card_id: CardId,
    /// Owning side.
    pub team: Team,
    /// Movement class.
    pub kind: UnitKind,
    /// Card faction.
    pub faction: Faction,
    /// Position.
    pub position: Vec2Fixed,
    /// Current hit points.
    #[serde(with = "fixed_serde")]
    pub hp: Fixed,
    /// Maximum hit points.
    #[serde(with = "fixed_serde")]
    pub max_hp: Fixed,
    /// Damage per attack (negative heals).
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Attack range.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Movement speed in arena units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Minimum ms between attacks.
    pub attack_interval_ms: u32,
    /// Match time of the last attack.
    pub last_attack_ms: u64,
    /// Target chosen on the last tick (advisory).
    pub target: Option<EntityId>,
    /// Targeting preference.
    pub target_pref: TargetPreference,
    /// Lane, fixed at spawn.
    pub lane: Lane,
    /// Cleared when hp reaches zero.
    pub alive: bool,
    /// Attack delivery style.
    pub projectile_style: ProjectileStyle,
    /// Splash radius for area attacks.
    #[serde(with = "crate::math::option_fixed_serde")]
    pub aoe_radius: Option<Fixed>,
    /// Separation radius.
    #[serde(with = "fixed_serde")]
    pub collision_radius: Fixed,
    /// Overtime buff already applied.
    pub overclocked: bool,
    /// Stun and poison timers.
    pub status: StatusTimers,
    /// Optional behaviours.
    pub capabilities: Capabilities,
}

impl Unit {
    /// Ground attacker without a projectile: cannot reach air.
    #[must_use]
    pub fn is_ground_melee(&self) -> bool {
        self.kind == UnitKind::Ground && self.projectile_style == ProjectileStyle::None
    }

    /// True if this unit can be damaged or targeted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.alive && self.hp > Fixed::ZERO
    }

    /// True while the mothership capability is attached.
    #[must_use]
    pub fn is_mothership(&self) -> bool {
        self.capabilities.payload.is_some()
    }
}

/// Tower tier within a team's defensive layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerTier {
    /// Front tower guarding a lane.
    Outer,
    /// Second tower in a lane; locked while its outer lives.
    Inner,
    /// Command tower; locked until an inner falls.
    King,
}

/// Lane a tower guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerLane {
    /// Upper lane.
    Top,
    /// Lower lane.
    Bottom,
    /// King tower position.
    Center,
}

impl TowerLane {
    /// Whether this tower guards the given unit lane.
    #[must_use]
    pub fn guards(self, lane: Lane) -> bool {
        matches!(
            (self, lane),
            (TowerLane::Top, Lane::Top) | (TowerLane::Bottom, Lane::Bottom)
        )
    }
}

/// Defensive structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tower {
    /// Instance id.
    pub id: EntityId,
    /// Owning side.
    pub team: Team,
    /// Tier.
    pub tier: TowerTier,
    /// Guarded lane.
    pub lane: TowerLane,
    /// Position.
    pub position: Vec2Fixed,
    /// Current hit points.
    #[serde(with = "fixed_serde")]
    pub hp: Fixed,
    /// Maximum hit points.
    #[serde(with = "fixed_serde")]
    pub max_hp: Fixed,
    /// Attack range.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Damage per shot.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Minimum ms between shots.
    pub attack_interval_ms: u32,
    /// Match time of the last shot.
    pub last_attack_ms: u64,
    /// Cleared when hp reaches zero.
    pub alive: bool,
    /// Cannot be targeted while set.
    pub locked: bool,
    /// Time until the shockwave is ready.
    pub shockwave_cooldown_ms: u32,
}

impl Tower {
    /// True if this tower may be picked by enemy targeting.
    #[must_use]
    pub fn is_targetable(&self) -> bool {
        self.alive && !self.locked
    }
}

/// In-flight homing shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Instance id.
    pub id: EntityId,
    /// Current position.
    pub position: Vec2Fixed,
    /// Last known target position.
    pub target_position: Vec2Fixed,
    /// Homing target.
    pub target: EntityId,
    /// Travel speed in units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Damage on arrival (negative heals).
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Firing side.
    pub team: Team,
    /// Visual style.
    pub style: ProjectileStyle,
    /// On-hit behaviour copied from the shooter.
    pub on_hit: Option<OnHitEffect>,
    /// Shooting unit, if it was a unit.
    pub source_unit: Option<EntityId>,
    /// Fired by a tower.
    pub from_tower: bool,
}

/// Spell waiting for its activation delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSpell {
    /// Instance id.
    pub id: EntityId,
    /// Spell card.
    pub card_id: CardId,
    /// Casting side.
    pub team: Team,
    /// Impact point.
    pub position: Vec2Fixed,
    /// Remaining delay in ms.
    pub timer_ms: u32,
}

/// Persistent area spell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSpell {
    /// Instance id.
    pub id: EntityId,
    /// Spell card.
    pub card_id: CardId,
    /// Casting side.
    pub team: Team,
    /// Center.
    pub position: Vec2Fixed,
    /// Remaining duration in ms.
    pub duration_ms: u32,
    /// Time until the next pulse.
    pub next_tick_ms: u32,
}

/// Kind of presentation-only effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Death or impact blast.
    Explosion,
    /// Projectile hit.
    Spark,
    /// Heal burst.
    Heal,
    /// Attack flash at the shooter.
    Muzzle,
    /// EMP ring.
    EmpWave,
    /// Beam from a source to a target.
    LaserBeam,
    /// Tower or ability ring.
    Shockwave,
    /// Healing field area.
    HealingField,
    /// Arena glitch overlay.
    Glitch,
    /// Destroyed tower remains.
    TowerRuin,
}

/// Presentation-only effect with a countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualEffect {
    /// Instance id.
    pub id: EntityId,
    /// Effect kind.
    pub kind: EffectKind,
    /// Position.
    pub position: Vec2Fixed,
    /// Optional origin for beams.
    pub origin: Option<Vec2Fixed>,
    /// Remaining lifetime in ms.
    pub timer_ms: u32,
    /// Full lifetime in ms.
    pub max_timer_ms: u32,
    /// Optional radius.
    #[serde(with = "crate::math::option_fixed_serde")]
    pub radius: Option<Fixed>,
    /// Side that caused the effect, if any.
    pub team: Option<Team>,
}
