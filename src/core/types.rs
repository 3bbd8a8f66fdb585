//! Identifiers and 2D math shared across the simulation core

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for world entities (noise emitters, decoys)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for guards, assigned in spawn order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuardId(pub u32);

impl GuardId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for GuardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "guard#{}", self.0)
    }
}

/// Beat counter (logical rhythm time unit)
pub type Beat = u64;

/// 2D position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self { x: self.x / len, y: self.y / len }
        } else {
            Self::default()
        }
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unsigned angle in degrees between two directions
    ///
    /// Zero-length inputs yield 0.
    pub fn angle_between_deg(&self, other: &Self) -> f32 {
        let a = self.normalize();
        let b = other.normalize();
        if a.length() == 0.0 || b.length() == 0.0 {
            return 0.0;
        }
        a.dot(&b).clamp(-1.0, 1.0).acos().to_degrees()
    }

    /// Step toward `target` by at most `max_step`, never overshooting
    pub fn move_towards(&self, target: Vec2, max_step: f32) -> Vec2 {
        let delta = target - *self;
        let dist = delta.length();
        if dist <= max_step || dist < 0.0001 {
            target
        } else {
            *self + delta * (max_step / dist)
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_id_ordering() {
        assert!(GuardId(1) < GuardId(2));
        assert_eq!(GuardId::new(3), GuardId(3));
        assert_eq!(GuardId(7).to_string(), "guard#7");
    }

    #[test]
    fn test_angle_between() {
        let right = Vec2::new(1.0, 0.0);
        let up = Vec2::new(0.0, 1.0);
        assert!((right.angle_between_deg(&up) - 90.0).abs() < 0.01);
        assert!(right.angle_between_deg(&right).abs() < 0.01);
        assert_eq!(right.angle_between_deg(&Vec2::ZERO), 0.0);
    }

    #[test]
    fn test_move_towards_does_not_overshoot() {
        let start = Vec2::new(0.0, 0.0);
        let target = Vec2::new(3.0, 4.0);

        let step = start.move_towards(target, 1.0);
        assert!((step.length() - 1.0).abs() < 0.001);

        let arrived = start.move_towards(target, 10.0);
        assert_eq!(arrived, target);
    }
}
