//! Beat Stealth - simulation core for a rhythm-synchronized stealth game
//!
//! Audio time drives a beat clock; guards patrol on beat boundaries and
//! detect the player continuously; player inputs are judged against the beat
//! grid and matched into abilities.

pub mod core;
pub mod detection;
pub mod guard;
pub mod rhythm;
pub mod simulation;
pub mod skills;
pub mod spatial;
pub mod world;
