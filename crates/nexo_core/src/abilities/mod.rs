//! Commander abilities.
//!
//! Each resolver is a pure transform: it validates the cast against the
//! borrowed state, and on success returns a new state with the ability's
//! spawns applied, energy charged and the cooldown started for the caster
//! only. Validation lives here and nowhere else.

pub mod emp;
pub mod hive;
pub mod mecha;
pub mod mothership;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::CardCatalog;
use crate::components::{CardId, MechaMode, Team};
use crate::entropy::Entropy;
use crate::error::ActionRejected;
use crate::math::Fixed;
use crate::state::{MatchState, MatchStatus};

pub use emp::EmpMode;
pub use hive::HiveMode;

/// Stable ability identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityId {
    /// Area stun around the arena center.
    EmpOverwatch,
    /// Flagship with escorts and periodic reinforcements.
    MothershipCommand,
    /// Decaying spider hive.
    AracnoHive,
    /// Piloted mecha with a shield pool.
    MechaNexodo,
}

impl AbilityId {
    /// Every ability.
    pub const ALL: [AbilityId; 4] = [
        AbilityId::EmpOverwatch,
        AbilityId::MothershipCommand,
        AbilityId::AracnoHive,
        AbilityId::MechaNexodo,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AbilityId::EmpOverwatch => "emp_overwatch",
            AbilityId::MothershipCommand => "mothership_command",
            AbilityId::AracnoHive => "aracno_hive",
            AbilityId::MechaNexodo => "mecha_nexodo",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == name)
    }

    /// Energy cost.
    #[must_use]
    pub const fn cost(self) -> u32 {
        match self {
            AbilityId::EmpOverwatch => emp::COST,
            AbilityId::MothershipCommand => mothership::COST,
            AbilityId::AracnoHive => hive::COST,
            AbilityId::MechaNexodo => mecha::COST,
        }
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully configured ability cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilitySelection {
    /// EMP pulse.
    Emp {
        /// Stun/damage trade-off.
        mode: EmpMode,
    },
    /// Mothership with a hangar card.
    Mothership {
        /// Card used for escorts and reinforcements.
        hangar_card: CardId,
    },
    /// Spider hive.
    AracnoHive {
        /// Spider variant.
        mode: HiveMode,
    },
    /// Mecha transformation.
    Mecha {
        /// Melee single-unit card that pilots the mecha.
        pilot_card: CardId,
        /// Shield only, or shield plus beam.
        mode: MechaMode,
    },
}

impl AbilitySelection {
    /// Ability this selection casts.
    #[must_use]
    pub const fn id(&self) -> AbilityId {
        match self {
            AbilitySelection::Emp { .. } => AbilityId::EmpOverwatch,
            AbilitySelection::Mothership { .. } => AbilityId::MothershipCommand,
            AbilitySelection::AracnoHive { .. } => AbilityId::AracnoHive,
            AbilitySelection::Mecha { .. } => AbilityId::MechaNexodo,
        }
    }

    /// Build a selection from an ability name and string options.
    ///
    /// Recognised keys: `mode` (all but mothership), `hangar_card`
    /// (mothership) and `pilot_card` (mecha). Modes default to the first
    /// variant when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ActionRejected::UnknownAbility`] for an unknown name and
    /// [`ActionRejected::InvalidOption`] for a missing card or a bad mode.
    pub fn from_options(
        ability: &str,
        options: &BTreeMap<String, String>,
    ) -> Result<Self, ActionRejected> {
        let id = AbilityId::parse(ability)
            .ok_or_else(|| ActionRejected::UnknownAbility(ability.to_string()))?;
        let mode = options.get("mode").map(String::as_str);
        let card = |key: &'static str| {
            options
                .get(key)
                .map(|c| CardId::new(c.as_str()))
                .ok_or_else(|| ActionRejected::InvalidOption {
                    option: key,
                    reason: "missing".to_string(),
                })
        };
        let bad_mode = |value: &str| ActionRejected::InvalidOption {
            option: "mode",
            reason: format!("unknown mode '{value}'"),
        };

        Ok(match id {
            AbilityId::EmpOverwatch => AbilitySelection::Emp {
                mode: match mode {
                    None | Some("lockdown") => EmpMode::Lockdown,
                    Some("disruptor") => EmpMode::Disruptor,
                    Some(other) => return Err(bad_mode(other)),
                },
            },
            AbilityId::MothershipCommand => AbilitySelection::Mothership {
                hangar_card: card("hangar_card")?,
            },
            AbilityId::AracnoHive => AbilitySelection::AracnoHive {
                mode: match mode {
                    None | Some("lethal") => HiveMode::Lethal,
                    Some("healing") => HiveMode::Healing,
                    Some("kamikaze") => HiveMode::Kamikaze,
                    Some(other) => return Err(bad_mode(other)),
                },
            },
            AbilityId::MechaNexodo => AbilitySelection::Mecha {
                pilot_card: card("pilot_card")?,
                mode: match mode {
                    None | Some("shield") => MechaMode::Shield,
                    Some("laser") => MechaMode::Laser,
                    Some(other) => return Err(bad_mode(other)),
                },
            },
        })
    }
}

/// Cast an ability for `team`.
///
/// # Errors
///
/// Returns the first validation failure; the input state is never modified.
pub fn cast(
    state: &MatchState,
    catalog: &CardCatalog,
    team: Team,
    selection: &AbilitySelection,
    entropy: &mut dyn Entropy,
) -> Result<MatchState, ActionRejected> {
    match selection {
        AbilitySelection::Emp { mode } => emp::resolve(state, team, *mode),
        AbilitySelection::Mothership { hangar_card } => {
            mothership::resolve(state, catalog, team, hangar_card, entropy)
        }
        AbilitySelection::AracnoHive { mode } => hive::resolve(state, catalog, team, *mode),
        AbilitySelection::Mecha { pilot_card, mode } => {
            mecha::resolve(state, catalog, team, pilot_card, *mode)
        }
    }
}

/// Checks shared by every ability: match running, cooldown elapsed and
/// enough energy.
pub(crate) fn precheck(state: &MatchState, team: Team, cost: u32) -> Result<(), ActionRejected> {
    if state.status != MatchStatus::Playing {
        return Err(ActionRejected::NotPlaying);
    }
    let cooldown = *state.ability_cooldown_ms.get(team);
    if cooldown > 0 {
        return Err(ActionRejected::OnCooldown {
            team,
            remaining_ms: cooldown,
        });
    }
    if *state.energy.get(team) < Fixed::from_num(cost) {
        return Err(ActionRejected::InsufficientEnergy {
            team,
            required: cost,
            available: state.whole_energy(team),
        });
    }
    Ok(())
}

/// Charge the caster after a successful cast.
pub(crate) fn charge(state: &mut MatchState, team: Team, cost: u32, cooldown_ms: u32) {
    let energy = state.energy.get_mut(team);
    *energy = (*energy - Fixed::from_num(cost)).max(Fixed::ZERO);
    *state.ability_cooldown_ms.get_mut(team) = cooldown_ms;
    *state.metrics.abilities_cast.get_mut(team) += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::MatchRules;

    fn options(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_ability_names_round_trip() {
        for id in AbilityId::ALL {
            assert_eq!(AbilityId::parse(id.as_str()), Some(id));
        }
        assert_eq!(AbilityId::parse("nuke"), None);
    }

    #[test]
    fn test_from_options_defaults_modes() {
        let emp = AbilitySelection::from_options("emp_overwatch", &BTreeMap::new()).unwrap();
        assert_eq!(emp, AbilitySelection::Emp { mode: EmpMode::Lockdown });

        let mecha = AbilitySelection::from_options(
            "mecha_nexodo",
            &options(&[("pilot_card", "shock_trooper"), ("mode", "laser")]),
        )
        .unwrap();
        assert_eq!(
            mecha,
            AbilitySelection::Mecha {
                pilot_card: CardId::new("shock_trooper"),
                mode: MechaMode::Laser,
            }
        );
    }

    #[test]
    fn test_from_options_rejects_bad_input() {
        assert_eq!(
            AbilitySelection::from_options("nuke", &BTreeMap::new()),
            Err(ActionRejected::UnknownAbility("nuke".to_string()))
        );
        assert!(matches!(
            AbilitySelection::from_options("mothership_command", &BTreeMap::new()),
            Err(ActionRejected::InvalidOption { option: "hangar_card", .. })
        ));
        assert!(matches!(
            AbilitySelection::from_options("aracno_hive", &options(&[("mode", "angry")])),
            Err(ActionRejected::InvalidOption { option: "mode", .. })
        ));
    }

    #[test]
    fn test_precheck_order() {
        let mut state = MatchState::empty(&MatchRules::default());
        state.ability_cooldown_ms.player = 100;
        state.energy.player = Fixed::ZERO;
        assert!(matches!(
            precheck(&state, Team::Player, 3),
            Err(ActionRejected::OnCooldown { remaining_ms: 100, .. })
        ));
        state.ability_cooldown_ms.player = 0;
        assert!(matches!(
            precheck(&state, Team::Player, 3),
            Err(ActionRejected::InsufficientEnergy { required: 3, available: 0, .. })
        ));
        state.status = MatchStatus::Draw;
        assert_eq!(precheck(&state, Team::Player, 3), Err(ActionRejected::NotPlaying));
    }

    #[test]
    fn test_charge_touches_only_caster() {
        let mut state = MatchState::empty(&MatchRules::default());
        charge(&mut state, Team::Ai, 3, 24_000);
        assert_eq!(state.energy.ai, Fixed::from_num(2));
        assert_eq!(state.energy.player, Fixed::from_num(5));
        assert_eq!(state.ability_cooldown_ms.ai, 24_000);
        assert_eq!(state.ability_cooldown_ms.player, 0);
        assert_eq!(state.metrics.abilities_cast.ai, 1);
    }
}
