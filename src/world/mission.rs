//! Reference mission sink: an alert meter plus a record of mission signals

use serde::{Deserialize, Serialize};

use crate::core::types::GuardId;
use crate::world::collaborators::MissionSink;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionLog {
    /// Global alert in `[0, 1]`
    alert_level: f32,
    alert_increases: u32,
    alert_decreases: u32,
    failed: bool,
    eliminated: Vec<GuardId>,
    target_valid: bool,
}

impl Default for MissionLog {
    fn default() -> Self {
        Self {
            alert_level: 0.0,
            alert_increases: 0,
            alert_decreases: 0,
            failed: false,
            eliminated: Vec::new(),
            target_valid: true,
        }
    }
}

impl MissionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alert_level(&self) -> f32 {
        self.alert_level
    }

    pub fn alert_increases(&self) -> u32 {
        self.alert_increases
    }

    pub fn alert_decreases(&self) -> u32 {
        self.alert_decreases
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn eliminated(&self) -> &[GuardId] {
        &self.eliminated
    }

    /// Scripted sequences can make the player untargetable
    pub fn set_target_valid(&mut self, valid: bool) {
        self.target_valid = valid;
    }
}

impl MissionSink for MissionLog {
    fn on_alert_increase(&mut self, amount: f32) {
        self.alert_increases += 1;
        self.alert_level = (self.alert_level + amount.max(0.0)).min(1.0);
    }

    fn on_alert_decrease(&mut self, amount: f32) {
        self.alert_decreases += 1;
        self.alert_level = (self.alert_level - amount.max(0.0)).max(0.0);
    }

    fn on_mission_fail(&mut self) {
        if !self.failed {
            tracing::warn!(alert = self.alert_level, "Mission failed");
        }
        self.failed = true;
    }

    fn on_guard_eliminated(&mut self, guard: GuardId) {
        self.eliminated.push(guard);
    }

    fn is_target_valid(&self) -> bool {
        self.target_valid
    }
}
