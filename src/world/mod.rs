//! Collaborator contracts and reference implementations

pub mod audio;
pub mod collaborators;
pub mod mission;
pub mod obstacles;
pub mod player;

pub use audio::ManualAudioClock;
pub use collaborators::{
    AudioSource, LayerMask, MissionSink, OverlapHit, PlayerCapabilities, PlayerSnapshot, UiSink,
    VisionQuery,
};
pub use mission::MissionLog;
pub use obstacles::{ObstacleMap, Wall};
pub use player::{Decoy, PlayerState};
