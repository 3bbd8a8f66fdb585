//! Guard behavior states and the pure transition function
//!
//! All guard behavior changes go through `GuardState::transition`. It has no
//! side effects; the state machine reads the result and performs the
//! bookkeeping (patrol timing, alerts, status stamps).

use serde::{Deserialize, Serialize};

use crate::core::types::{Beat, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StunCause {
    Paralysis,
    Flash,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GuardState {
    Patrolling,
    Investigating { target: Vec2, give_up_beat: Beat },
    Chasing { last_known: Vec2 },
    Stunned { recovery_beat: Beat, cause: StunCause },
}

/// State tag without payload, for events and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuardStateKind {
    Patrolling,
    Investigating,
    Chasing,
    Stunned,
}

impl GuardState {
    pub fn kind(&self) -> GuardStateKind {
        match self {
            GuardState::Patrolling => GuardStateKind::Patrolling,
            GuardState::Investigating { .. } => GuardStateKind::Investigating,
            GuardState::Chasing { .. } => GuardStateKind::Chasing,
            GuardState::Stunned { .. } => GuardStateKind::Stunned,
        }
    }

    pub fn is_stunned(&self) -> bool {
        matches!(self, GuardState::Stunned { .. })
    }

    pub fn is_chasing(&self) -> bool {
        matches!(self, GuardState::Chasing { .. })
    }

    pub fn transition(&self, stimulus: &Stimulus, ctx: &TransitionContext) -> GuardState {
        use GuardState::*;

        match (*self, *stimulus) {
            // Stuns override everything; a shorter stun never cuts a longer one
            (
                Stunned {
                    recovery_beat: current,
                    ..
                },
                Stimulus::Stun { recovery_beat, .. },
            ) if current >= recovery_beat => *self,
            (_, Stimulus::Stun {
                cause,
                recovery_beat,
            }) => Stunned {
                recovery_beat,
                cause,
            },
            (Stunned { recovery_beat, .. }, Stimulus::Beat(beat)) if beat >= recovery_beat => {
                Patrolling
            }
            (Stunned { .. }, _) => *self,

            (_, Stimulus::TargetSighted { position }) => Chasing {
                last_known: position,
            },
            (Chasing { last_known }, Stimulus::TargetLost) => ctx.investigate(last_known),

            (Patrolling | Investigating { .. }, Stimulus::NoiseHeard { position }) => {
                ctx.investigate(position)
            }
            (Patrolling | Investigating { .. }, Stimulus::Detected { position }) => {
                ctx.investigate(position)
            }
            (Investigating { give_up_beat, .. }, Stimulus::Beat(beat)) if beat >= give_up_beat => {
                Patrolling
            }

            _ => *self,
        }
    }
}

/// Inputs that can change a guard's state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stimulus {
    /// A valid target is in view
    TargetSighted { position: Vec2 },
    NoiseHeard { position: Vec2 },
    /// The chased target is no longer a valid visible target
    TargetLost,
    /// Detection meter filled
    Detected { position: Vec2 },
    Beat(Beat),
    Stun { cause: StunCause, recovery_beat: Beat },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionContext {
    pub beat: Beat,
    pub investigate_timeout_beats: u64,
}

impl TransitionContext {
    fn investigate(&self, target: Vec2) -> GuardState {
        GuardState::Investigating {
            target,
            give_up_beat: self.beat + self.investigate_timeout_beats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(beat: Beat) -> TransitionContext {
        TransitionContext {
            beat,
            investigate_timeout_beats: 4,
        }
    }

    fn spot() -> Vec2 {
        Vec2::new(3.0, 4.0)
    }

    #[test]
    fn test_patrol_sighting_starts_chase() {
        let next = GuardState::Patrolling
            .transition(&Stimulus::TargetSighted { position: spot() }, &ctx(1));
        assert_eq!(next, GuardState::Chasing { last_known: spot() });
    }

    #[test]
    fn test_noise_starts_investigation_with_deadline() {
        let next = GuardState::Patrolling
            .transition(&Stimulus::NoiseHeard { position: spot() }, &ctx(10));
        assert_eq!(
            next,
            GuardState::Investigating {
                target: spot(),
                give_up_beat: 14
            }
        );
    }

    #[test]
    fn test_investigation_times_out_on_beat() {
        let state = GuardState::Investigating {
            target: spot(),
            give_up_beat: 14,
        };
        assert_eq!(state.transition(&Stimulus::Beat(13), &ctx(13)), state);
        assert_eq!(
            state.transition(&Stimulus::Beat(14), &ctx(14)),
            GuardState::Patrolling
        );
    }

    #[test]
    fn test_investigation_sighting_starts_chase() {
        let state = GuardState::Investigating {
            target: Vec2::ZERO,
            give_up_beat: 14,
        };
        let next = state.transition(&Stimulus::TargetSighted { position: spot() }, &ctx(5));
        assert!(next.is_chasing());
    }

    #[test]
    fn test_lost_target_investigates_last_known() {
        let state = GuardState::Chasing { last_known: spot() };
        assert_eq!(
            state.transition(&Stimulus::TargetLost, &ctx(20)),
            GuardState::Investigating {
                target: spot(),
                give_up_beat: 24
            }
        );
    }

    #[test]
    fn test_chase_ignores_noise_and_detection() {
        let state = GuardState::Chasing { last_known: spot() };
        let noise = Stimulus::NoiseHeard {
            position: Vec2::ZERO,
        };
        assert_eq!(state.transition(&noise, &ctx(1)), state);
        let detected = Stimulus::Detected {
            position: Vec2::ZERO,
        };
        assert_eq!(state.transition(&detected, &ctx(1)), state);
    }

    #[test]
    fn test_stun_from_any_state() {
        let stun = Stimulus::Stun {
            cause: StunCause::Flash,
            recovery_beat: 9,
        };
        for state in [
            GuardState::Patrolling,
            GuardState::Chasing { last_known: spot() },
            GuardState::Investigating {
                target: spot(),
                give_up_beat: 3,
            },
        ] {
            assert_eq!(
                state.transition(&stun, &ctx(5)),
                GuardState::Stunned {
                    recovery_beat: 9,
                    cause: StunCause::Flash
                }
            );
        }
    }

    #[test]
    fn test_stunned_ignores_sight_and_recovers_on_beat() {
        let state = GuardState::Stunned {
            recovery_beat: 9,
            cause: StunCause::Paralysis,
        };
        let sighted = Stimulus::TargetSighted { position: spot() };
        assert_eq!(state.transition(&sighted, &ctx(6)), state);
        assert_eq!(state.transition(&Stimulus::Beat(8), &ctx(8)), state);
        assert_eq!(
            state.transition(&Stimulus::Beat(9), &ctx(9)),
            GuardState::Patrolling
        );
    }

    #[test]
    fn test_shorter_stun_does_not_shorten() {
        let state = GuardState::Stunned {
            recovery_beat: 12,
            cause: StunCause::Paralysis,
        };
        let short = Stimulus::Stun {
            cause: StunCause::Flash,
            recovery_beat: 8,
        };
        assert_eq!(state.transition(&short, &ctx(6)), state);

        let long = Stimulus::Stun {
            cause: StunCause::Flash,
            recovery_beat: 15,
        };
        assert_eq!(
            state.transition(&long, &ctx(6)),
            GuardState::Stunned {
                recovery_beat: 15,
                cause: StunCause::Flash
            }
        );
    }

    #[test]
    fn test_patrol_beat_is_self_transition() {
        assert_eq!(
            GuardState::Patrolling.transition(&Stimulus::Beat(3), &ctx(3)),
            GuardState::Patrolling
        );
    }
}
