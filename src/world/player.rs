//! Reference player: position tracking plus beat-stamped capabilities

use serde::{Deserialize, Serialize};

use crate::core::types::{Beat, Vec2};
use crate::skills::ability::{AbilityDefinition, AbilityEffect};
use crate::skills::matcher::Activation;
use crate::world::collaborators::{PlayerCapabilities, PlayerSnapshot};

/// A placed noise maker and the beat it expires on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decoy {
    pub position: Vec2,
    pub until_beat: Beat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub targetable: bool,
    pub concealed_until_beat: Option<Beat>,
    pub illusion_until_beat: Option<Beat>,
    pub decoy: Option<Decoy>,
    /// Names of abilities activated, in order
    pub activations: Vec<String>,
}

impl PlayerState {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            targetable: true,
            ..Self::default()
        }
    }

    /// Teleport-free movement: velocity is derived from the displacement
    pub fn move_to(&mut self, position: Vec2, dt: f32) {
        self.velocity = if dt > 0.0 {
            (position - self.position) * (1.0 / dt)
        } else {
            Vec2::ZERO
        };
        self.position = position;
    }

    pub fn is_concealed(&self, beat: Beat) -> bool {
        self.concealed_until_beat.is_some_and(|until| beat < until)
    }

    pub fn has_illusion(&self, beat: Beat) -> bool {
        self.illusion_until_beat.is_some_and(|until| beat < until)
    }

    pub fn active_decoy(&self, beat: Beat) -> Option<Vec2> {
        self.decoy
            .filter(|d| beat < d.until_beat)
            .map(|d| d.position)
    }
}

fn extend(stamp: &mut Option<Beat>, until: Beat) {
    *stamp = Some(stamp.map_or(until, |current| current.max(until)));
}

impl PlayerCapabilities for PlayerState {
    fn snapshot(&self, beat: Beat) -> PlayerSnapshot {
        PlayerSnapshot {
            position: self.position,
            velocity: self.velocity,
            concealed: self.is_concealed(beat),
            illusion: self.has_illusion(beat),
            decoy: self.active_decoy(beat),
            targetable: self.targetable,
        }
    }

    fn activate(&mut self, ability: &AbilityDefinition, activation: &Activation) {
        self.activations.push(ability.name.clone());

        match activation.effect {
            Some(AbilityEffect::Conceal { beats }) => {
                extend(&mut self.concealed_until_beat, activation.beat + beats)
            }
            Some(AbilityEffect::Illusion { beats }) => {
                extend(&mut self.illusion_until_beat, activation.beat + beats)
            }
            Some(AbilityEffect::Decoy { beats }) => {
                self.decoy = Some(Decoy {
                    position: self.position,
                    until_beat: activation.beat + beats,
                });
            }
            // Stuns land on guards, not the player
            Some(AbilityEffect::Paralyze { .. } | AbilityEffect::Flash { .. }) | None => {}
        }
    }
}
