//! Continuous-time detection: sight checks feeding a suspicion meter

pub mod accumulator;
pub mod visibility;

pub use accumulator::{DetectionAccumulator, DetectionUpdate};
pub use visibility::{sample_sight, visibility_factor, GuardPose, SightSample};
