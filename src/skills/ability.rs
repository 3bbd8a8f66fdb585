//! Ability definitions: input patterns, cooldowns, and effects

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, StealthError};
use crate::core::types::Beat;

/// One key of a rhythm pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSymbol {
    A,
    B,
    X,
    Y,
}

impl std::str::FromStr for InputSymbol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(InputSymbol::A),
            "B" => Ok(InputSymbol::B),
            "X" => Ok(InputSymbol::X),
            "Y" => Ok(InputSymbol::Y),
            other => Err(format!("unknown input symbol '{}'", other)),
        }
    }
}

/// What an ability does once its pattern matches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbilityEffect {
    /// Player is hidden from full detection
    Conceal { beats: u64 },
    /// Guards see an illusion instead of a valid target
    Illusion { beats: u64 },
    /// Noise maker dropped at the player's position
    Decoy { beats: u64 },
    Paralyze { radius: f32, beats: u64 },
    Flash { radius: f32, beats: u64 },
}

impl AbilityEffect {
    pub fn duration_beats(&self) -> u64 {
        match *self {
            AbilityEffect::Conceal { beats }
            | AbilityEffect::Illusion { beats }
            | AbilityEffect::Decoy { beats }
            | AbilityEffect::Paralyze { beats, .. }
            | AbilityEffect::Flash { beats, .. } => beats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub name: String,
    pub required_input_sequence: Vec<InputSymbol>,
    #[serde(default)]
    pub cooldown_beats: u64,
    #[serde(default)]
    pub focus_cost: f32,
    #[serde(default)]
    pub effect: Option<AbilityEffect>,
}

impl AbilityDefinition {
    pub fn new(name: impl Into<String>, sequence: Vec<InputSymbol>, cooldown_beats: u64) -> Self {
        Self {
            name: name.into(),
            required_input_sequence: sequence,
            cooldown_beats,
            focus_cost: 0.0,
            effect: None,
        }
    }

    pub fn with_focus_cost(mut self, focus_cost: f32) -> Self {
        self.focus_cost = focus_cost;
        self
    }

    pub fn with_effect(mut self, effect: AbilityEffect) -> Self {
        self.effect = Some(effect);
        self
    }

    /// Cooldown length for an activation; a fully Perfect combo halves it
    ///
    /// Halving rounds up and never drops below one beat. A zero cooldown stays zero.
    pub fn effective_cooldown(&self, perfect: bool) -> Beat {
        if self.cooldown_beats == 0 || !perfect {
            return self.cooldown_beats;
        }
        self.cooldown_beats.div_ceil(2).max(1)
    }

    pub fn validate(&self, buffer_capacity: usize) -> Result<()> {
        let malformed = |reason: String| StealthError::MalformedAbility {
            ability: self.name.clone(),
            reason,
        };

        if self.required_input_sequence.is_empty() {
            return Err(malformed("required_input_sequence is empty".into()));
        }
        if self.required_input_sequence.len() > buffer_capacity {
            return Err(malformed(format!(
                "pattern length {} exceeds input buffer capacity {}",
                self.required_input_sequence.len(),
                buffer_capacity
            )));
        }
        if !self.focus_cost.is_finite() || self.focus_cost < 0.0 {
            return Err(malformed(format!(
                "focus_cost must be a non-negative number (got {})",
                self.focus_cost
            )));
        }
        if let Some(AbilityEffect::Paralyze { radius, .. } | AbilityEffect::Flash { radius, .. }) =
            self.effect
        {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(malformed(format!("effect radius must be positive (got {})", radius)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InputSymbol::*;

    #[test]
    fn test_perfect_cooldown_halves_rounding_up() {
        let ability = AbilityDefinition::new("dash", vec![A, B], 10);
        assert_eq!(ability.effective_cooldown(false), 10);
        assert_eq!(ability.effective_cooldown(true), 5);

        let odd = AbilityDefinition::new("odd", vec![A], 7);
        assert_eq!(odd.effective_cooldown(true), 4);

        let one = AbilityDefinition::new("one", vec![A], 1);
        assert_eq!(one.effective_cooldown(true), 1);

        let free = AbilityDefinition::new("free", vec![A], 0);
        assert_eq!(free.effective_cooldown(true), 0);
    }

    #[test]
    fn test_validate_rejects_malformed_patterns() {
        assert!(AbilityDefinition::new("empty", vec![], 1).validate(10).is_err());
        assert!(AbilityDefinition::new("long", vec![A; 11], 1).validate(10).is_err());
        assert!(AbilityDefinition::new("neg", vec![A], 1)
            .with_focus_cost(-1.0)
            .validate(10)
            .is_err());
        assert!(AbilityDefinition::new("flash", vec![A], 1)
            .with_effect(AbilityEffect::Flash { radius: 0.0, beats: 2 })
            .validate(10)
            .is_err());
        assert!(AbilityDefinition::new("ok", vec![A, B, X, Y], 4)
            .with_focus_cost(10.0)
            .validate(10)
            .is_ok());
    }

    #[test]
    fn test_symbol_parse() {
        assert_eq!("x".parse::<InputSymbol>(), Ok(X));
        assert!("Z".parse::<InputSymbol>().is_err());
    }

    #[test]
    fn test_effect_toml_shape() {
        let ability: AbilityDefinition = toml::from_str(
            r#"
            name = "smoke"
            required_input_sequence = ["A", "A", "B"]
            cooldown_beats = 8
            focus_cost = 20.0
            effect = { kind = "conceal", beats = 6 }
            "#,
        )
        .unwrap();
        assert_eq!(ability.required_input_sequence, vec![A, A, B]);
        assert_eq!(ability.effect, Some(AbilityEffect::Conceal { beats: 6 }));
        assert_eq!(ability.effect.unwrap().duration_beats(), 6);
    }
}
