//! Sight sampling and visibility falloffs
//!
//! The visibility factor is a product of independent terms:
//! distance falloff, angle falloff, movement multiplier, and stealth multiplier.

use crate::core::config::{DetectionConfig, GuardConfig};
use crate::core::types::Vec2;
use crate::world::collaborators::{LayerMask, PlayerSnapshot, VisionQuery};

/// Where a guard stands and where it looks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardPose {
    pub position: Vec2,
    /// Unit vector
    pub facing: Vec2,
}

/// A successful sight check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SightSample {
    pub distance: f32,
    /// Degrees between facing and the target direction
    pub angle_off: f32,
    pub visibility_factor: f32,
}

/// 1 at distance 0, falling linearly to 0 at `view_distance`
pub fn distance_falloff(distance: f32, view_distance: f32) -> f32 {
    if view_distance <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / view_distance).clamp(0.0, 1.0)
}

/// 1 at view center, falling linearly to 0 at the cone edge
pub fn angle_falloff(angle_off: f32, view_angle: f32) -> f32 {
    let half = view_angle / 2.0;
    if half <= 0.0 {
        return 0.0;
    }
    (1.0 - angle_off / half).clamp(0.0, 1.0)
}

/// Faster targets are easier to spot
///
/// Linear from `min_movement_multiplier` when stationary to 1.0 at
/// `reference_speed`, capped at `max_movement_multiplier`.
pub fn movement_multiplier(speed: f32, config: &DetectionConfig) -> f32 {
    let ratio = (speed / config.reference_speed).max(0.0);
    let min = config.min_movement_multiplier;
    (min + (1.0 - min) * ratio).min(config.max_movement_multiplier)
}

pub fn stealth_multiplier(concealed: bool, config: &DetectionConfig) -> f32 {
    if concealed {
        config.concealed_multiplier
    } else {
        1.0
    }
}

pub fn visibility_factor(
    distance: f32,
    angle_off: f32,
    target: &PlayerSnapshot,
    guard: &GuardConfig,
    detection: &DetectionConfig,
) -> f32 {
    distance_falloff(distance, guard.view_distance)
        * angle_falloff(angle_off, guard.view_angle)
        * movement_multiplier(target.speed(), detection)
        * stealth_multiplier(target.concealed, detection)
}

/// Range, field-of-view, and line-of-sight check
pub fn sample_sight(
    pose: GuardPose,
    guard: &GuardConfig,
    detection: &DetectionConfig,
    target: &PlayerSnapshot,
    vision: &dyn VisionQuery,
) -> Option<SightSample> {
    let to_target = target.position - pose.position;
    let distance = to_target.length();
    if distance > guard.view_distance {
        return None;
    }

    let angle_off = if distance < 0.0001 {
        0.0
    } else {
        pose.facing.angle_between_deg(&to_target)
    };
    if angle_off > guard.view_angle / 2.0 {
        return None;
    }

    if !vision.raycast_clear(pose.position, target.position, LayerMask::OBSTACLE) {
        return None;
    }

    Some(SightSample {
        distance,
        angle_off,
        visibility_factor: visibility_factor(distance, angle_off, target, guard, detection),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::obstacles::{ObstacleMap, Wall};

    fn guard() -> GuardConfig {
        let mut g = GuardConfig::new("g", vec![Vec2::ZERO]);
        g.view_distance = 10.0;
        g.view_angle = 90.0;
        g
    }

    fn pose() -> GuardPose {
        GuardPose {
            position: Vec2::ZERO,
            facing: Vec2::new(1.0, 0.0),
        }
    }

    #[test]
    fn test_falloffs() {
        assert_eq!(distance_falloff(0.0, 10.0), 1.0);
        assert!((distance_falloff(5.0, 10.0) - 0.5).abs() < 1e-6);
        assert_eq!(distance_falloff(12.0, 10.0), 0.0);

        assert_eq!(angle_falloff(0.0, 90.0), 1.0);
        assert!((angle_falloff(22.5, 90.0) - 0.5).abs() < 1e-6);
        assert_eq!(angle_falloff(45.0, 90.0), 0.0);
    }

    #[test]
    fn test_movement_multiplier_curve() {
        let config = DetectionConfig::default();
        assert!((movement_multiplier(0.0, &config) - 0.5).abs() < 1e-6);
        assert!((movement_multiplier(2.0, &config) - 1.0).abs() < 1e-6);
        assert!((movement_multiplier(100.0, &config) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_concealment_reduces_factor() {
        let config = DetectionConfig::default();
        let mut target = PlayerSnapshot::at(Vec2::new(2.0, 0.0));
        target.velocity = Vec2::new(2.0, 0.0);
        let open = visibility_factor(2.0, 0.0, &target, &guard(), &config);

        target.concealed = true;
        let hidden = visibility_factor(2.0, 0.0, &target, &guard(), &config);
        assert!((hidden - open * 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_sight_requires_cone_range_and_los() {
        let config = DetectionConfig::default();
        let open = ObstacleMap::new(5.0);

        let ahead = PlayerSnapshot::at(Vec2::new(5.0, 0.0));
        let sample = sample_sight(pose(), &guard(), &config, &ahead, &open).unwrap();
        assert!((sample.distance - 5.0).abs() < 1e-6);

        let behind = PlayerSnapshot::at(Vec2::new(-5.0, 0.0));
        assert!(sample_sight(pose(), &guard(), &config, &behind, &open).is_none());

        let far = PlayerSnapshot::at(Vec2::new(15.0, 0.0));
        assert!(sample_sight(pose(), &guard(), &config, &far, &open).is_none());

        let walled = ObstacleMap::with_walls(
            5.0,
            vec![Wall::new(Vec2::new(2.0, -1.0), Vec2::new(3.0, 1.0))],
        );
        assert!(sample_sight(pose(), &guard(), &config, &ahead, &walled).is_none());
    }
}
