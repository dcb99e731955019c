//! Match tunables.
//!
//! Everything the clock and energy economy needs lives here so scenarios can
//! override it from RON without touching the engine.

use serde::{Deserialize, Serialize};

use crate::math::{ratio, Fixed};

/// Clock and energy configuration for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    /// Regular match length.
    pub match_duration_ms: u64,
    /// Final stretch of regular time that counts as overtime.
    pub overtime_window_ms: u64,
    /// Time added to the clock when sudden death begins.
    pub sudden_death_extension_ms: u64,
    /// Energy cap for both sides.
    pub max_energy: u32,
    /// Energy each side starts with.
    pub starting_energy: u32,
    /// Regeneration in thousandths of an energy point per second.
    pub energy_regen_milli_per_sec: u32,
    /// Regeneration multiplier while in overtime.
    pub overtime_regen_multiplier: u32,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            match_duration_ms: 180_000,
            overtime_window_ms: 60_000,
            sudden_death_extension_ms: 60_000,
            max_energy: 10,
            starting_energy: 5,
            energy_regen_milli_per_sec: 900,
            overtime_regen_multiplier: 2,
        }
    }
}

impl MatchRules {
    /// Energy cap as fixed-point.
    #[must_use]
    pub fn max_energy_fixed(&self) -> Fixed {
        Fixed::from_num(self.max_energy)
    }

    /// Base regeneration per second as fixed-point.
    #[must_use]
    pub fn regen_per_second(&self) -> Fixed {
        ratio(
            i32::try_from(self.energy_regen_milli_per_sec).unwrap_or(i32::MAX),
            1000,
        )
    }

    /// Validate internal consistency.
    ///
    /// # Errors
    ///
    /// Returns a description of the first inconsistent field.
    pub fn validate(&self) -> Result<(), String> {
        if self.match_duration_ms == 0 {
            return Err("match_duration_ms must be positive".into());
        }
        if self.overtime_window_ms > self.match_duration_ms {
            return Err("overtime_window_ms cannot exceed match_duration_ms".into());
        }
        if self.starting_energy > self.max_energy {
            return Err("starting_energy cannot exceed max_energy".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_are_valid() {
        let rules = MatchRules::default();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.regen_per_second(), ratio(9, 10));
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let rules: MatchRules = ron::from_str("(match_duration_ms: 90000)").unwrap();
        assert_eq!(rules.match_duration_ms, 90_000);
        assert_eq!(rules.max_energy, 10);
    }

    #[test]
    fn test_invalid_starting_energy() {
        let rules = MatchRules {
            starting_energy: 11,
            ..MatchRules::default()
        };
        assert!(rules.validate().is_err());
    }
}
