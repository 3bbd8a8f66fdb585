//! Mission configuration loaded from TOML
//!
//! Every section has documented defaults so a config file only needs to list
//! what it changes. Tempo and judgment tolerances are validated as a whole;
//! guards and abilities are validated one by one so a single bad entry is
//! rejected without taking the rest of the mission down with it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, StealthError};
use crate::core::types::Vec2;
use crate::rhythm::judge::JudgmentWindow;
use crate::skills::ability::AbilityDefinition;
use crate::skills::buffer::DEFAULT_BUFFER_CAPACITY;

/// Name of the first field that is NaN or infinite
fn first_non_finite(fields: &[(&'static str, f32)]) -> Option<&'static str> {
    fields
        .iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(name, _)| *name)
}

/// Tempo and timing tolerances
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmConfig {
    /// Beats per minute of the mission track
    pub bpm: f64,

    /// Maximum distance (seconds) from a beat boundary for a Perfect
    ///
    /// At 120 bpm a beat lasts 0.5s, so 0.05 is a 10% window either side.
    pub perfect_tolerance: f64,

    /// Maximum distance (seconds) from a beat boundary for a Good
    ///
    /// Must be >= perfect_tolerance and <= half a beat.
    pub good_tolerance: f64,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            perfect_tolerance: 0.05,
            good_tolerance: 0.12,
        }
    }
}

impl RhythmConfig {
    pub fn beat_interval(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Validate tempo and tolerances, producing the judgment window
    pub fn validate(&self) -> Result<JudgmentWindow> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(StealthError::InvalidBpm(self.bpm));
        }
        let window = JudgmentWindow::new(self.perfect_tolerance, self.good_tolerance)?;
        window.validate_for_interval(self.beat_interval())?;
        Ok(window)
    }
}

/// Detection accumulation and alert tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Seconds of continuous, fully visible exposure to reach detection
    ///
    /// The per-second increase rate is `1 / time_to_full_detection`.
    pub time_to_full_detection: f32,

    /// Progress lost per second while the target is not visible
    ///
    /// At 0.25, a full meter drains in 4 seconds.
    pub decrease_rate: f32,

    /// Visibility multiplier while the target is concealed
    pub concealed_multiplier: f32,

    /// Target speed (units/s) that counts as a normal walk
    ///
    /// Walking at this speed gives a movement multiplier of 1.0.
    pub reference_speed: f32,

    /// Movement multiplier for a stationary target
    pub min_movement_multiplier: f32,

    /// Cap on the movement multiplier for fast targets
    pub max_movement_multiplier: f32,

    /// Alert raised per second while a guard watches an invalid target
    pub sighting_alert_rate: f32,

    /// Alert raised when a guard starts chasing
    pub chase_alert: f32,

    /// Alert raised when detection completes outside a chase
    pub detected_alert: f32,

    /// Alert lowered when an investigation gives up
    pub calm_alert: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            time_to_full_detection: 2.0,
            decrease_rate: 0.25,
            concealed_multiplier: 0.25,
            reference_speed: 2.0,
            min_movement_multiplier: 0.5,
            max_movement_multiplier: 1.5,
            sighting_alert_rate: 0.1,
            chase_alert: 0.25,
            detected_alert: 0.5,
            calm_alert: 0.1,
        }
    }
}

impl DetectionConfig {
    pub fn increase_rate(&self) -> f32 {
        1.0 / self.time_to_full_detection
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| StealthError::InvalidSection {
            section: "detection",
            reason,
        };
        if !(self.time_to_full_detection.is_finite() && self.time_to_full_detection > 0.0) {
            return Err(invalid(format!(
                "time_to_full_detection must be positive (got {})",
                self.time_to_full_detection
            )));
        }
        if let Some(field) = first_non_finite(&[
            ("decrease_rate", self.decrease_rate),
            ("concealed_multiplier", self.concealed_multiplier),
            ("reference_speed", self.reference_speed),
            ("min_movement_multiplier", self.min_movement_multiplier),
            ("max_movement_multiplier", self.max_movement_multiplier),
            ("sighting_alert_rate", self.sighting_alert_rate),
            ("chase_alert", self.chase_alert),
            ("detected_alert", self.detected_alert),
            ("calm_alert", self.calm_alert),
        ]) {
            return Err(invalid(format!("{} must be finite", field)));
        }
        if self.decrease_rate < 0.0 || self.reference_speed <= 0.0 {
            return Err(invalid(
                "decrease_rate must be >= 0 and reference_speed > 0".into(),
            ));
        }
        if self.min_movement_multiplier > self.max_movement_multiplier {
            return Err(invalid(format!(
                "min_movement_multiplier ({}) exceeds max_movement_multiplier ({})",
                self.min_movement_multiplier, self.max_movement_multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.concealed_multiplier) {
            return Err(invalid(format!(
                "concealed_multiplier must be within [0, 1] (got {})",
                self.concealed_multiplier
            )));
        }
        Ok(())
    }
}

/// Input buffer and focus economy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    pub buffer_capacity: usize,
    pub max_focus: f32,
    pub starting_focus: f32,
    pub focus_per_perfect: f32,
    pub focus_per_good: f32,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_focus: 100.0,
            starting_focus: 50.0,
            focus_per_perfect: 10.0,
            focus_per_good: 5.0,
        }
    }
}

impl SkillConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(StealthError::InvalidSection {
                section: "skills",
                reason: "buffer_capacity must be at least 1".into(),
            });
        }
        if let Some(field) = first_non_finite(&[
            ("starting_focus", self.starting_focus),
            ("focus_per_perfect", self.focus_per_perfect),
            ("focus_per_good", self.focus_per_good),
        ]) {
            return Err(StealthError::InvalidSection {
                section: "skills",
                reason: format!("{} must be finite", field),
            });
        }
        if !(self.max_focus.is_finite() && self.max_focus >= 0.0) {
            return Err(StealthError::InvalidSection {
                section: "skills",
                reason: format!("max_focus must be non-negative (got {})", self.max_focus),
            });
        }
        Ok(())
    }
}

/// Per-guard tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub name: String,
    /// Cyclic waypoint list; the guard spawns on the first one
    pub patrol_route: Vec<Vec2>,
    pub view_distance: f32,
    /// Full cone width in degrees
    pub view_angle: f32,
    /// Upper bound of the randomized beats between patrol steps
    pub patrol_beat_interval_max: u64,
    pub move_speed: f32,
    pub chase_speed: f32,
    pub hearing_radius: f32,
    pub investigate_timeout_beats: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            name: "guard".to_string(),
            patrol_route: Vec::new(),
            view_distance: 10.0,
            view_angle: 90.0,
            patrol_beat_interval_max: 4,
            move_speed: 2.0,
            chase_speed: 3.5,
            hearing_radius: 6.0,
            investigate_timeout_beats: 8,
        }
    }
}

impl GuardConfig {
    pub fn new(name: impl Into<String>, patrol_route: Vec<Vec2>) -> Self {
        Self {
            name: name.into(),
            patrol_route,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| StealthError::InvalidGuard {
            guard: self.name.clone(),
            reason,
        };

        if self.patrol_route.is_empty() {
            return Err(StealthError::EmptyPatrolRoute {
                guard: self.name.clone(),
            });
        }
        if self
            .patrol_route
            .iter()
            .any(|p| !(p.x.is_finite() && p.y.is_finite()))
        {
            return Err(invalid("patrol_route waypoints must be finite".into()));
        }
        if let Some(field) = first_non_finite(&[
            ("view_distance", self.view_distance),
            ("view_angle", self.view_angle),
            ("move_speed", self.move_speed),
            ("chase_speed", self.chase_speed),
            ("hearing_radius", self.hearing_radius),
        ]) {
            return Err(invalid(format!("{} must be finite", field)));
        }
        if self.view_distance <= 0.0 {
            return Err(invalid(format!(
                "view_distance must be positive (got {})",
                self.view_distance
            )));
        }
        if !(self.view_angle > 0.0 && self.view_angle <= 360.0) {
            return Err(invalid(format!(
                "view_angle must be within (0, 360] (got {})",
                self.view_angle
            )));
        }
        if self.patrol_beat_interval_max == 0 {
            return Err(invalid("patrol_beat_interval_max must be at least 1".into()));
        }
        if self.move_speed < 0.0 || self.chase_speed < 0.0 || self.hearing_radius < 0.0 {
            return Err(invalid("speeds and hearing_radius must be non-negative".into()));
        }
        Ok(())
    }
}

/// Complete mission configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for all guard randomness
    pub seed: u64,
    pub rhythm: RhythmConfig,
    pub detection: DetectionConfig,
    pub skills: SkillConfig,
    pub guards: Vec<GuardConfig>,
    pub abilities: Vec<AbilityDefinition>,
}

/// Configuration that passed validation, plus whatever was rejected
#[derive(Debug)]
pub struct ValidatedConfig {
    pub seed: u64,
    pub rhythm: RhythmConfig,
    pub window: JudgmentWindow,
    pub detection: DetectionConfig,
    pub skills: SkillConfig,
    pub guards: Vec<GuardConfig>,
    pub abilities: Vec<AbilityDefinition>,
    pub rejected: Vec<StealthError>,
}

impl GameConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the whole config
    ///
    /// Rhythm, detection, and skill sections are fatal. Guards and abilities
    /// are filtered individually.
    pub fn validate(self) -> Result<ValidatedConfig> {
        let window = self.rhythm.validate()?;
        self.detection.validate()?;
        self.skills.validate()?;

        let mut rejected = Vec::new();

        let mut guards = Vec::with_capacity(self.guards.len());
        for guard in self.guards {
            match guard.validate() {
                Ok(()) => guards.push(guard),
                Err(e) => {
                    tracing::warn!("Rejected guard config: {}", e);
                    rejected.push(e);
                }
            }
        }

        let mut abilities = Vec::with_capacity(self.abilities.len());
        for ability in self.abilities {
            match ability.validate(self.skills.buffer_capacity) {
                Ok(()) => abilities.push(ability),
                Err(e) => {
                    tracing::warn!("Rejected ability config: {}", e);
                    rejected.push(e);
                }
            }
        }

        Ok(ValidatedConfig {
            seed: self.seed,
            rhythm: self.rhythm,
            window,
            detection: self.detection,
            skills: self.skills,
            guards,
            abilities,
            rejected,
        })
    }
}

/// Load and validate a mission config from a TOML file
pub fn load_config(path: &Path) -> Result<ValidatedConfig> {
    let contents = fs::read_to_string(path)?;
    let config = GameConfig::from_toml_str(&contents)?;
    let validated = config.validate()?;
    tracing::info!(
        path = %path.display(),
        guards = validated.guards.len(),
        abilities = validated.abilities.len(),
        rejected = validated.rejected.len(),
        "Loaded mission config"
    );
    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::ability::InputSymbol;

    #[test]
    fn test_default_config_is_valid() {
        let validated = GameConfig::default().validate().unwrap();
        assert!(validated.rejected.is_empty());
        assert!((validated.window.perfect_tolerance() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_tolerances_are_fatal() {
        let mut config = GameConfig::default();
        config.rhythm.perfect_tolerance = 0.2;
        config.rhythm.good_tolerance = 0.1;
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_window_wider_than_half_beat_is_fatal() {
        let mut config = GameConfig::default();
        config.rhythm.bpm = 240.0; // 0.25s beats
        config.rhythm.good_tolerance = 0.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_guard_rejected_individually() {
        let mut config = GameConfig::default();
        config.guards.push(GuardConfig::new("ok", vec![Vec2::new(0.0, 0.0)]));
        config.guards.push(GuardConfig::new("lost", vec![]));
        config.abilities.push(AbilityDefinition::new("empty", vec![], 1));
        config
            .abilities
            .push(AbilityDefinition::new("dash", vec![InputSymbol::A], 1));

        let validated = config.validate().unwrap();
        assert_eq!(validated.guards.len(), 1);
        assert_eq!(validated.guards[0].name, "ok");
        assert_eq!(validated.abilities.len(), 1);
        assert_eq!(validated.rejected.len(), 2);
        assert!(matches!(
            validated.rejected[0],
            StealthError::EmptyPatrolRoute { .. }
        ));
    }

    #[test]
    fn test_guard_view_angle_bounds() {
        let mut guard = GuardConfig::new("g", vec![Vec2::ZERO]);
        guard.view_angle = 0.0;
        assert!(guard.validate().is_err());
        guard.view_angle = 360.0;
        assert!(guard.validate().is_ok());
        guard.patrol_beat_interval_max = 0;
        assert!(guard.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = GameConfig::from_toml_str(
            r#"
            seed = 7

            [rhythm]
            bpm = 100.0

            [[guards]]
            name = "north"
            patrol_route = [{ x = 0.0, y = 0.0 }, { x = 5.0, y = 0.0 }]
            view_angle = 70.0
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert!((config.rhythm.bpm - 100.0).abs() < 1e-9);
        // Unlisted fields keep defaults
        assert!((config.rhythm.perfect_tolerance - 0.05).abs() < 1e-9);
        assert_eq!(config.guards[0].patrol_route.len(), 2);
        assert_eq!(config.guards[0].patrol_beat_interval_max, 4);
    }

    #[test]
    fn test_detection_validation() {
        let mut detection = DetectionConfig::default();
        assert!((detection.increase_rate() - 0.5).abs() < 1e-6);
        detection.time_to_full_detection = 0.0;
        assert!(detection.validate().is_err());
    }

    #[test]
    fn test_non_finite_guard_values_rejected() {
        let mut guard = GuardConfig::new("g", vec![Vec2::ZERO]);
        guard.hearing_radius = f32::INFINITY;
        assert!(guard.validate().is_err());

        guard.hearing_radius = 6.0;
        guard.move_speed = f32::NAN;
        assert!(guard.validate().is_err());

        guard.move_speed = 2.0;
        guard.patrol_route = vec![Vec2::new(f32::NAN, 0.0)];
        assert!(guard.validate().is_err());
    }

    #[test]
    fn test_non_finite_detection_values_fatal() {
        for field in 0..3 {
            let mut detection = DetectionConfig::default();
            match field {
                0 => detection.decrease_rate = f32::NAN,
                1 => detection.reference_speed = f32::INFINITY,
                _ => detection.max_movement_multiplier = f32::NAN,
            }
            assert!(detection.validate().is_err());
        }
    }

    #[test]
    fn test_toml_inf_hearing_radius_rejects_guard() {
        let config = GameConfig::from_toml_str(
            r#"
            [[guards]]
            name = "deaf"
            patrol_route = [{ x = 0.0, y = 0.0 }]
            hearing_radius = inf
            "#,
        )
        .unwrap();

        let validated = config.validate().unwrap();
        assert!(validated.guards.is_empty());
        assert!(matches!(
            validated.rejected[0],
            StealthError::InvalidGuard { .. }
        ));
    }
}
