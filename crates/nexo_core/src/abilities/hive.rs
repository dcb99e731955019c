//! Aracno hive: a decaying structure that hatches spiders.

use serde::{Deserialize, Serialize};

use crate::abilities::{charge, precheck};
use crate::arena::{clamp_spawn, forward, lane_for_y};
use crate::cards::CardCatalog;
use crate::components::{CardId, EffectKind, OnHitEffect, PeriodicSpawner, Team};
use crate::entropy::Entropy;
use crate::error::ActionRejected;
use crate::factory::{build_unit, spawn_squad};
use crate::math::{ratio, Fixed, Vec2Fixed};
use crate::state::MatchState;

/// Energy cost.
pub const COST: u32 = 5;

/// Cooldown after a cast.
pub const COOLDOWN_MS: u32 = 28_000;

/// Hidden card the hive is built from.
pub const HIVE_CARD: &str = "aracno_hive";

/// Spiders per hatch.
pub const SPAWN_COUNT: u32 = 2;

/// Time between hatches.
pub const SPAWN_INTERVAL_MS: u32 = 4000;

/// Poison duration carried by kamikaze spiders.
pub const KAMIKAZE_DOT_MS: u32 = 4000;

const KING_OFFSET_X: i32 = 120;
const HATCH_SPREAD: i32 = 20;

/// Spider variant hatched by the hive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HiveMode {
    /// Plain damage.
    Lethal,
    /// Heals allies.
    Healing,
    /// Poisons and self-destructs.
    Kamikaze,
}

impl HiveMode {
    /// Card hatched in this mode.
    #[must_use]
    pub fn spider_card(self) -> CardId {
        CardId::new(match self {
            HiveMode::Lethal => "aracno_spider_lethal",
            HiveMode::Healing => "aracno_spider_heal",
            HiveMode::Kamikaze => "aracno_spider_kami",
        })
    }

    /// On-hit behaviour given to hatched spiders.
    #[must_use]
    pub const fn on_hit(self) -> Option<OnHitEffect> {
        match self {
            HiveMode::Lethal => None,
            HiveMode::Healing => Some(OnHitEffect::Heal),
            HiveMode::Kamikaze => Some(OnHitEffect::Poison {
                dot_ms: KAMIKAZE_DOT_MS,
                kamikaze: true,
            }),
        }
    }
}

/// Hive hp lost per millisecond (30 hp/s).
#[must_use]
pub fn decay_per_ms() -> Fixed {
    ratio(30, 1000)
}

/// Plant a hive in front of the caster's king.
///
/// # Errors
///
/// Fails the shared ability checks, when the caster has no king or when a
/// hive of theirs is still alive.
pub fn resolve(
    state: &MatchState,
    catalog: &CardCatalog,
    team: Team,
    mode: HiveMode,
) -> Result<MatchState, ActionRejected> {
    precheck(state, team, COST)?;
    let king = state.king(team).ok_or(ActionRejected::MissingKing(team))?;
    if state
        .living_units()
        .any(|u| u.team == team && u.capabilities.spawner.is_some())
    {
        return Err(ActionRejected::AlreadyActive { team, what: "hive" });
    }
    let card = catalog
        .get_str(HIVE_CARD)
        .ok_or_else(|| ActionRejected::UnknownCard(HIVE_CARD.to_string()))?;

    let position = clamp_spawn(king.position + Vec2Fixed::from_ints(KING_OFFSET_X * forward(team), 0));
    let mut next = state.clone();
    let mut hive = build_unit(&mut next, card, team, position, lane_for_y(position.y));
    hive.capabilities.spawner = Some(PeriodicSpawner {
        spawn_card: mode.spider_card(),
        spawn_count: SPAWN_COUNT,
        interval_ms: SPAWN_INTERVAL_MS,
        countdown_ms: SPAWN_INTERVAL_MS,
        decay_per_ms: decay_per_ms(),
        spawn_on_hit: mode.on_hit(),
    });
    next.units.push(hive);

    next.push_effect(EffectKind::Shockwave, position, 900, Some(Fixed::from_num(150)), Some(team));
    charge(&mut next, team, COST, COOLDOWN_MS);
    tracing::debug!(?team, ?mode, "hive planted");
    Ok(next)
}

/// Decay the hive at `index` and hatch spiders when the cycle completes.
///
/// Decay is structural hp loss, not damage: it is not credited to anyone.
pub fn tick_spawner(
    state: &mut MatchState,
    catalog: &CardCatalog,
    index: usize,
    delta_ms: u32,
    entropy: &mut dyn Entropy,
) {
    let hive = &mut state.units[index];
    let Some(spawner) = hive.capabilities.spawner.as_mut() else {
        return;
    };
    let decay = spawner.decay_per_ms * Fixed::from_num(delta_ms);
    spawner.countdown_ms = spawner.countdown_ms.saturating_sub(delta_ms);
    let hatch = spawner.countdown_ms == 0;
    if hatch {
        spawner.countdown_ms = spawner.interval_ms;
    }
    let (card_id, count, on_hit) = (spawner.spawn_card.clone(), spawner.spawn_count, spawner.spawn_on_hit);

    hive.hp = (hive.hp - decay).max(Fixed::ZERO);
    if hive.hp == Fixed::ZERO {
        hive.alive = false;
        return;
    }
    if !hatch {
        return;
    }
    let (team, lane, origin) = (hive.team, hive.lane, hive.position);
    let Some(card) = catalog.get(&card_id) else {
        return;
    };
    for _ in 0..count {
        for id in spawn_squad(state, card, team, origin, lane, HATCH_SPREAD, entropy) {
            if let Some(spider) = state.units.iter_mut().find(|u| u.id == id) {
                spider.capabilities.on_hit = on_hit;
            }
        }
    }
}
