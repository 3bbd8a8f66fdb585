//! Gradual detection - suspicion that builds while a target stays in view

use serde::{Deserialize, Serialize};

use crate::core::config::DetectionConfig;

/// Rising progress within this distance of 1.0 counts as full detection
///
/// Only absorbs rounding of `f32` rates and timesteps. Never applied while decaying.
pub const FULL_DETECTION_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionUpdate {
    pub progress: f32,
    /// Set exactly once per crossing of 1.0
    pub detected: bool,
}

/// Per-guard detection meter in `[0, 1]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionAccumulator {
    /// Kept in `f64` so thousands of small frames do not drift
    progress: f64,
    increase_rate: f32,
    decrease_rate: f32,
    /// False while sitting at 1.0 after an event; re-armed once progress drops
    armed: bool,
}

impl DetectionAccumulator {
    pub fn new(increase_rate: f32, decrease_rate: f32) -> Self {
        Self {
            progress: 0.0,
            increase_rate: increase_rate.max(0.0),
            decrease_rate: decrease_rate.max(0.0),
            armed: true,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.increase_rate(), config.decrease_rate)
    }

    pub fn progress(&self) -> f32 {
        self.progress as f32
    }

    pub fn is_full(&self) -> bool {
        self.progress >= 1.0
    }

    /// Advance by `dt` seconds
    ///
    /// Non-finite or negative `dt` and `visibility_factor` are treated as zero.
    pub fn update(&mut self, dt: f32, is_visible: bool, visibility_factor: f32) -> DetectionUpdate {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let factor = if visibility_factor.is_finite() {
            visibility_factor.max(0.0)
        } else {
            0.0
        };

        let dt = f64::from(dt);
        if is_visible {
            let gain = f64::from(factor) * f64::from(self.increase_rate) * dt;
            self.progress += gain;
            if gain > 0.0 && self.progress >= 1.0 - FULL_DETECTION_EPSILON {
                self.progress = 1.0;
            }
        } else {
            self.progress -= f64::from(self.decrease_rate) * dt;
        }
        self.progress = self.progress.clamp(0.0, 1.0);

        let mut detected = false;
        if self.progress >= 1.0 {
            if self.armed {
                self.armed = false;
                detected = true;
            }
        } else {
            self.armed = true;
        }

        DetectionUpdate {
            progress: self.progress as f32,
            detected,
        }
    }
}
