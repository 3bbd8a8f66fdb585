//! Rhythm pattern matching - judged inputs become ability activations
//!
//! Inputs accumulate in a sliding buffer. After each hit, abilities are checked
//! in configured priority order; the first whose pattern ends the buffer, is off
//! cooldown, and is affordable fires.
//!
//! A Miss clears the buffer and marks the combo non-perfect. The flag only goes
//! back to true after a successful activation, so a combo that recovered from a
//! Miss never earns the Perfect cooldown discount.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::config::SkillConfig;
use crate::core::types::Beat;
use crate::rhythm::dispatcher::{BeatListener, ListenerFault};
use crate::rhythm::judge::Judgment;
use crate::skills::ability::{AbilityDefinition, AbilityEffect, InputSymbol};
use crate::skills::buffer::InputSequenceBuffer;

/// A matched ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activation {
    /// Index into the configured ability list
    pub ability: usize,
    pub name: String,
    pub beat: Beat,
    /// Whole combo was judged Perfect
    pub perfect: bool,
    pub ready_at: Beat,
    pub effect: Option<AbilityEffect>,
}

#[derive(Debug, Clone)]
pub struct SkillSequenceMatcher {
    abilities: Vec<AbilityDefinition>,
    buffer: InputSequenceBuffer,
    combo_perfect: bool,
    /// ability index -> ready-at beat
    cooldowns: AHashMap<usize, Beat>,
    current_beat: Beat,
    focus: f32,
    max_focus: f32,
    focus_per_perfect: f32,
    focus_per_good: f32,
}

impl SkillSequenceMatcher {
    pub fn new(abilities: Vec<AbilityDefinition>, config: &SkillConfig) -> Self {
        Self {
            abilities,
            buffer: InputSequenceBuffer::new(config.buffer_capacity),
            combo_perfect: true,
            cooldowns: AHashMap::new(),
            current_beat: 0,
            focus: config.starting_focus.clamp(0.0, config.max_focus),
            max_focus: config.max_focus,
            focus_per_perfect: config.focus_per_perfect,
            focus_per_good: config.focus_per_good,
        }
    }

    pub fn abilities(&self) -> &[AbilityDefinition] {
        &self.abilities
    }

    pub fn buffer(&self) -> &InputSequenceBuffer {
        &self.buffer
    }

    pub fn combo_perfect(&self) -> bool {
        self.combo_perfect
    }

    pub fn current_beat(&self) -> Beat {
        self.current_beat
    }

    pub fn focus(&self) -> f32 {
        self.focus
    }

    pub fn is_on_cooldown(&self, ability: usize) -> bool {
        self.cooldowns
            .get(&ability)
            .is_some_and(|&ready_at| self.current_beat < ready_at)
    }

    pub fn ready_at(&self, ability: usize) -> Option<Beat> {
        self.cooldowns.get(&ability).copied()
    }

    pub fn active_cooldowns(&self) -> usize {
        self.cooldowns.len()
    }

    /// Feed one judged input
    pub fn on_input(&mut self, symbol: InputSymbol, judgment: Judgment) -> Option<Activation> {
        match judgment {
            Judgment::Miss => {
                self.buffer.clear();
                self.combo_perfect = false;
                return None;
            }
            Judgment::Good => {
                self.combo_perfect = false;
                self.gain_focus(self.focus_per_good);
            }
            Judgment::Perfect => self.gain_focus(self.focus_per_perfect),
        }
        self.buffer.push(symbol);

        let matched = self.abilities.iter().enumerate().find_map(|(idx, ability)| {
            let ready = !self.is_on_cooldown(idx) && self.focus >= ability.focus_cost;
            (ready && self.buffer.ends_with(&ability.required_input_sequence)).then_some(idx)
        })?;

        Some(self.activate(matched))
    }

    fn activate(&mut self, idx: usize) -> Activation {
        let ability = &self.abilities[idx];
        let perfect = self.combo_perfect;
        let cooldown = ability.effective_cooldown(perfect);
        let ready_at = self.current_beat + cooldown;

        self.focus = (self.focus - ability.focus_cost).max(0.0);
        if cooldown > 0 {
            self.cooldowns.insert(idx, ready_at);
        }
        self.buffer.clear();
        self.combo_perfect = true;

        tracing::debug!(
            ability = %ability.name,
            beat = self.current_beat,
            perfect,
            ready_at,
            "Ability activated"
        );

        Activation {
            ability: idx,
            name: ability.name.clone(),
            beat: self.current_beat,
            perfect,
            ready_at,
            effect: ability.effect,
        }
    }

    fn gain_focus(&mut self, amount: f32) {
        self.focus = (self.focus + amount).min(self.max_focus);
    }

    /// Advance the beat and drop expired cooldowns
    pub fn advance_beat(&mut self, beat: Beat) {
        self.current_beat = self.current_beat.max(beat);
        let now = self.current_beat;
        self.cooldowns.retain(|_, ready_at| now < *ready_at);
    }
}

impl BeatListener for SkillSequenceMatcher {
    fn on_beat(&mut self, beat: Beat) -> Result<(), ListenerFault> {
        self.advance_beat(beat);
        Ok(())
    }
}
