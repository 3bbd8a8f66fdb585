//! Rhythm-pattern abilities: definitions, the input buffer, and the matcher

pub mod ability;
pub mod buffer;
pub mod matcher;

pub use ability::{AbilityDefinition, AbilityEffect, InputSymbol};
pub use buffer::InputSequenceBuffer;
pub use matcher::{Activation, SkillSequenceMatcher};
