//! Guard AI: behavior states and the per-guard state machine

pub mod machine;
pub mod state;

pub use machine::{GuardEvent, GuardLinks, GuardStateMachine, StatusEffects};
pub use state::{GuardState, GuardStateKind, Stimulus, StunCause, TransitionContext};
