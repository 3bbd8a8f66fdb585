//! Contracts between the simulation core and the rest of the game
//!
//! The core never owns playback, physics, mission scripting, or UI. It talks
//! to them through these narrow traits.

use bitflags::bitflags;

use crate::core::types::{Beat, EntityId, GuardId, Vec2};
use crate::rhythm::judge::Judgment;
use crate::skills::ability::AbilityDefinition;
use crate::skills::matcher::Activation;

bitflags! {
    /// Physics layers consulted by vision queries
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LayerMask: u32 {
        const OBSTACLE = 1 << 0;
        const NOISE = 1 << 1;
        const DECOY = 1 << 2;
    }
}

/// Supplies the authoritative audio playback time
pub trait AudioSource {
    fn current_audio_time(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapHit {
    pub entity: EntityId,
    pub position: Vec2,
    pub layer: LayerMask,
}

/// Line-of-sight and proximity queries
///
/// Implementations must be pure: calling them never changes world state.
pub trait VisionQuery {
    fn raycast_clear(&self, from: Vec2, to: Vec2, mask: LayerMask) -> bool;
    fn overlap_query(&self, point: Vec2, radius: f32, mask: LayerMask) -> Vec<OverlapHit>;
}

/// Receives mission-level signals
pub trait MissionSink {
    fn on_alert_increase(&mut self, amount: f32);
    fn on_alert_decrease(&mut self, amount: f32);
    fn on_mission_fail(&mut self);
    fn on_guard_eliminated(&mut self, guard: GuardId);

    /// Whether the player may currently be targeted at all
    fn is_target_valid(&self) -> bool {
        true
    }
}

/// Everything a guard may know about the player during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSnapshot {
    pub position: Vec2,
    pub velocity: Vec2,
    pub concealed: bool,
    pub illusion: bool,
    pub decoy: Option<Vec2>,
    /// Mission-level targetability (e.g. false during cutscenes)
    pub targetable: bool,
}

impl PlayerSnapshot {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            concealed: false,
            illusion: false,
            decoy: None,
            targetable: true,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// A valid target is not hidden behind a stealth or illusion capability
    pub fn is_valid_target(&self) -> bool {
        self.targetable && !self.concealed && !self.illusion
    }
}

/// Player-side capability flags and ability activation
pub trait PlayerCapabilities {
    fn snapshot(&self, beat: Beat) -> PlayerSnapshot;
    fn activate(&mut self, ability: &AbilityDefinition, activation: &Activation);
}

/// Display-only notifications; implementations cannot reach back into the core
pub trait UiSink {
    fn on_beat(&self, beat: Beat);
    fn on_judgment(&self, judgment: Judgment);
    fn on_detection_progress(&self, guard: GuardId, progress: f32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_target_flags() {
        let mut snapshot = PlayerSnapshot::at(Vec2::new(1.0, 2.0));
        assert!(snapshot.is_valid_target());

        snapshot.concealed = true;
        assert!(!snapshot.is_valid_target());

        snapshot.concealed = false;
        snapshot.illusion = true;
        assert!(!snapshot.is_valid_target());

        snapshot.illusion = false;
        snapshot.targetable = false;
        assert!(!snapshot.is_valid_target());
    }

    #[test]
    fn test_layer_mask_combination() {
        let mask = LayerMask::NOISE | LayerMask::DECOY;
        assert!(mask.intersects(LayerMask::DECOY));
        assert!(!mask.contains(LayerMask::OBSTACLE));
    }
}
