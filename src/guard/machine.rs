//! Guard state machine - one instance per guard
//!
//! Beat notifications gate *when* a guard picks a new destination; per-frame
//! updates handle sight, hearing, detection, and movement toward the current
//! destination.

use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::{DetectionConfig, GuardConfig};
use crate::core::error::{Result, StealthError};
use crate::core::types::{Beat, GuardId, Vec2};
use crate::detection::accumulator::DetectionAccumulator;
use crate::detection::visibility::{sample_sight, GuardPose};
use crate::guard::state::{GuardState, GuardStateKind, Stimulus, StunCause, TransitionContext};
use crate::rhythm::dispatcher::{BeatListener, ListenerFault};
use crate::world::collaborators::{LayerMask, PlayerSnapshot, VisionQuery};

/// Beat stamps for active status effects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffects {
    pub paralyzed_until_beat: Option<Beat>,
    pub flashed_until_beat: Option<Beat>,
}

impl StatusEffects {
    fn stamp(&mut self, cause: StunCause, until: Beat) {
        let slot = match cause {
            StunCause::Paralysis => &mut self.paralyzed_until_beat,
            StunCause::Flash => &mut self.flashed_until_beat,
        };
        *slot = Some(slot.map_or(until, |b| b.max(until)));
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Things a guard reports upward; drained by the simulation each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GuardEvent {
    StateChanged {
        from: GuardStateKind,
        to: GuardStateKind,
    },
    AlertRaised(f32),
    AlertLowered(f32),
    Detected,
    MissionFailed,
    PatrolAdvanced {
        waypoint: usize,
        next_move_beat: Beat,
    },
}

/// Collaborators a guard needs to run
pub struct GuardLinks {
    pub vision: Option<Rc<dyn VisionQuery>>,
    /// Beat the guard spawned on; `None` when no rhythm clock is wired
    pub spawn_beat: Option<Beat>,
    pub has_target: bool,
}

pub struct GuardStateMachine {
    id: GuardId,
    config: GuardConfig,
    detection_config: DetectionConfig,
    position: Vec2,
    facing: Vec2,
    patrol_index: usize,
    next_move_beat: Beat,
    current_beat: Beat,
    state: GuardState,
    status: StatusEffects,
    detection: DetectionAccumulator,
    vision: Option<Rc<dyn VisionQuery>>,
    rng: ChaCha8Rng,
    disabled: Option<StealthError>,
    events: Vec<GuardEvent>,
}

impl GuardStateMachine {
    /// Build a guard from validated config
    ///
    /// Invalid config is an error. Missing collaborators are not: the guard is
    /// created disabled so the rest of the simulation keeps running.
    pub fn new(
        id: GuardId,
        config: GuardConfig,
        detection_config: DetectionConfig,
        links: GuardLinks,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;

        let position = config.patrol_route[0];
        let facing = config
            .patrol_route
            .get(1)
            .map(|next| (*next - position).normalize())
            .filter(|dir| dir.length() > 0.0)
            .unwrap_or(Vec2::new(1.0, 0.0));

        let missing = if links.vision.is_none() {
            Some("vision query")
        } else if links.spawn_beat.is_none() {
            Some("rhythm clock")
        } else if !links.has_target {
            Some("player")
        } else {
            None
        };
        let disabled = missing.map(|collaborator| {
            let err = StealthError::MissingCollaborator {
                owner: id.to_string(),
                collaborator,
            };
            tracing::warn!("{}; guard disabled", err);
            err
        });

        let spawn_beat = links.spawn_beat.unwrap_or(0);
        let detection = DetectionAccumulator::from_config(&detection_config);
        let mut guard = Self {
            id,
            config,
            detection_config,
            position,
            facing,
            patrol_index: 0,
            next_move_beat: spawn_beat,
            current_beat: spawn_beat,
            state: GuardState::Patrolling,
            status: StatusEffects::default(),
            detection,
            vision: links.vision,
            rng: ChaCha8Rng::seed_from_u64(guard_seed(seed, id)),
            disabled,
            events: Vec::new(),
        };
        guard.next_move_beat = spawn_beat + guard.pick_patrol_interval();
        Ok(guard)
    }

    pub fn id(&self) -> GuardId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn facing(&self) -> Vec2 {
        self.facing
    }

    pub fn patrol_index(&self) -> usize {
        self.patrol_index
    }

    pub fn next_move_beat(&self) -> Beat {
        self.next_move_beat
    }

    pub fn current_beat(&self) -> Beat {
        self.current_beat
    }

    pub fn status(&self) -> StatusEffects {
        self.status
    }

    pub fn detection_progress(&self) -> f32 {
        self.detection.progress()
    }

    pub fn is_enabled(&self) -> bool {
        self.disabled.is_none()
    }

    pub fn disabled_reason(&self) -> Option<&StealthError> {
        self.disabled.as_ref()
    }

    pub fn drain_events(&mut self) -> Vec<GuardEvent> {
        std::mem::take(&mut self.events)
    }

    fn pose(&self) -> GuardPose {
        GuardPose {
            position: self.position,
            facing: self.facing,
        }
    }

    fn context(&self) -> TransitionContext {
        TransitionContext {
            beat: self.current_beat,
            investigate_timeout_beats: self.config.investigate_timeout_beats,
        }
    }

    /// Beats until the next patrol step, in `[2, max]` (1 only when max is 1)
    fn pick_patrol_interval(&mut self) -> u64 {
        let max = self.config.patrol_beat_interval_max;
        if max <= 1 {
            1
        } else {
            self.rng.gen_range(2..=max)
        }
    }

    fn apply(&mut self, stimulus: Stimulus) {
        let next = self.state.transition(&stimulus, &self.context());
        if next == self.state {
            return;
        }

        let from = self.state.kind();
        let to = next.kind();
        self.state = next;

        if from != to {
            tracing::debug!(
                guard = %self.id,
                ?from,
                ?to,
                beat = self.current_beat,
                "Guard state changed"
            );
            self.events.push(GuardEvent::StateChanged { from, to });
            if to == GuardStateKind::Chasing {
                self.events
                    .push(GuardEvent::AlertRaised(self.detection_config.chase_alert));
            }
        }
    }

    fn advance_patrol(&mut self, beat: Beat) {
        let route_len = self.config.patrol_route.len();
        self.patrol_index = (self.patrol_index + 1) % route_len;
        self.next_move_beat = beat + self.pick_patrol_interval();
        self.events.push(GuardEvent::PatrolAdvanced {
            waypoint: self.patrol_index,
            next_move_beat: self.next_move_beat,
        });
    }

    /// Handle one beat boundary
    pub fn handle_beat(&mut self, beat: Beat) {
        if !self.is_enabled() {
            return;
        }
        self.current_beat = self.current_beat.max(beat);
        let before = self.state;
        self.apply(Stimulus::Beat(beat));

        match (before, self.state) {
            (GuardState::Stunned { .. }, GuardState::Patrolling) => {
                self.status.clear();
                self.next_move_beat = beat + self.pick_patrol_interval();
            }
            (GuardState::Investigating { .. }, GuardState::Patrolling) => {
                self.events
                    .push(GuardEvent::AlertLowered(self.detection_config.calm_alert));
                self.next_move_beat = beat + self.pick_patrol_interval();
            }
            (GuardState::Patrolling, GuardState::Patrolling) if beat >= self.next_move_beat => {
                self.advance_patrol(beat);
            }
            _ => {}
        }
    }

    /// Paralysis or flash: stunned until `current_beat + duration_beats`
    pub fn apply_stun(&mut self, cause: StunCause, duration_beats: u64) {
        if !self.is_enabled() {
            return;
        }
        let recovery_beat = self.current_beat + duration_beats;
        self.status.stamp(cause, recovery_beat);
        self.apply(Stimulus::Stun {
            cause,
            recovery_beat,
        });
    }

    /// Per-frame continuous update against one consistent player snapshot
    pub fn update(&mut self, dt: f32, target: Option<&PlayerSnapshot>) {
        if !self.is_enabled() {
            return;
        }
        let vision = match &self.vision {
            Some(v) => Rc::clone(v),
            None => return,
        };

        if self.state.is_stunned() {
            self.detection.update(dt, false, 0.0);
            return;
        }

        let sight = target.and_then(|t| {
            sample_sight(
                self.pose(),
                &self.config,
                &self.detection_config,
                t,
                vision.as_ref(),
            )
        });
        let factor = sight.map_or(0.0, |s| s.visibility_factor);
        let detection = self.detection.update(dt, sight.is_some(), factor);

        match (target, sight) {
            (Some(t), Some(_)) if t.is_valid_target() => {
                self.apply(Stimulus::TargetSighted {
                    position: t.position,
                });
            }
            (Some(_), Some(_)) => {
                let amount = self.detection_config.sighting_alert_rate * factor * dt.max(0.0);
                if amount > 0.0 {
                    self.events.push(GuardEvent::AlertRaised(amount));
                }
                if self.state.is_chasing() {
                    self.apply(Stimulus::TargetLost);
                }
            }
            _ => {
                if self.state.is_chasing() {
                    self.apply(Stimulus::TargetLost);
                }
            }
        }

        if detection.detected {
            self.events.push(GuardEvent::Detected);
            if self.state.is_chasing() {
                tracing::warn!(
                    guard = %self.id,
                    beat = self.current_beat,
                    "Target fully detected during chase"
                );
                self.events.push(GuardEvent::MissionFailed);
            } else if let Some(t) = target {
                self.events
                    .push(GuardEvent::AlertRaised(self.detection_config.detected_alert));
                self.apply(Stimulus::Detected {
                    position: t.position,
                });
            }
        }

        if matches!(self.state, GuardState::Patrolling) {
            if let Some(position) = self.hear_noise(vision.as_ref(), target) {
                self.apply(Stimulus::NoiseHeard { position });
            }
        }

        self.move_towards_destination(dt, target);
    }

    /// Nearest decoy or noise emitter within hearing range
    fn hear_noise(
        &self,
        vision: &dyn VisionQuery,
        target: Option<&PlayerSnapshot>,
    ) -> Option<Vec2> {
        let radius = self.config.hearing_radius;
        let decoy = target
            .and_then(|t| t.decoy)
            .filter(|d| d.distance(&self.position) <= radius);

        let emitters =
            vision.overlap_query(self.position, radius, LayerMask::NOISE | LayerMask::DECOY);

        decoy
            .into_iter()
            .chain(emitters.into_iter().map(|hit| hit.position))
            .min_by(|a, b| {
                a.distance(&self.position)
                    .total_cmp(&b.distance(&self.position))
            })
    }

    fn move_towards_destination(&mut self, dt: f32, target: Option<&PlayerSnapshot>) {
        let (destination, speed) = match self.state {
            GuardState::Patrolling => (
                self.config.patrol_route[self.patrol_index],
                self.config.move_speed,
            ),
            GuardState::Investigating { target: spot, .. } => (spot, self.config.move_speed),
            GuardState::Chasing { last_known } => (
                target.map_or(last_known, |t| t.position),
                self.config.chase_speed,
            ),
            GuardState::Stunned { .. } => return,
        };

        let heading = (destination - self.position).normalize();
        if heading.length() > 0.0 {
            self.facing = heading;
        }
        self.position = self
            .position
            .move_towards(destination, speed * dt.max(0.0));
    }
}

impl BeatListener for GuardStateMachine {
    fn on_beat(&mut self, beat: Beat) -> std::result::Result<(), ListenerFault> {
        self.handle_beat(beat);
        Ok(())
    }
}

fn guard_seed(seed: u64, id: GuardId) -> u64 {
    seed ^ (id.0 as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
