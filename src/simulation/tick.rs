//! Tick system - orchestrates one frame of the stealth core
//!
//! Order within a tick:
//! clock sample -> beat dispatch -> player snapshot -> guard updates ->
//! guard events forwarded -> inputs judged -> skill matching -> ability effects
//!
//! All guards see the same player snapshot within a tick.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::config::{DetectionConfig, GuardConfig, ValidatedConfig};
use crate::core::error::Result;
use crate::core::types::{Beat, GuardId, Vec2};
use crate::guard::machine::{GuardEvent, GuardLinks, GuardStateMachine};
use crate::guard::state::{GuardState, GuardStateKind, StunCause};
use crate::rhythm::clock::RhythmClock;
use crate::rhythm::dispatcher::{
    BeatDispatcher, BeatListener, ListenerFault, ListenerId, SharedListener,
};
use crate::rhythm::judge::{Difficulty, Judgment, RhythmInputJudge};
use crate::skills::ability::{AbilityEffect, InputSymbol};
use crate::skills::matcher::{Activation, SkillSequenceMatcher};
use crate::world::collaborators::{
    AudioSource, MissionSink, PlayerCapabilities, PlayerSnapshot, UiSink, VisionQuery,
};

/// A player button press stamped with audio time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub time: f64,
    pub symbol: InputSymbol,
}

impl InputEvent {
    pub fn new(time: f64, symbol: InputSymbol) -> Self {
        Self { time, symbol }
    }
}

/// Everything observable that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    Beat {
        beat: Beat,
    },
    /// More than one beat boundary crossed in one sample
    BeatStall {
        from: Beat,
        to: Beat,
    },
    ListenerFault {
        beat: Beat,
        reason: String,
    },
    InputJudged {
        symbol: InputSymbol,
        judgment: Judgment,
        time: f64,
    },
    AbilityActivated {
        name: String,
        beat: Beat,
        perfect: bool,
        ready_at: Beat,
    },
    GuardStateChanged {
        guard: GuardId,
        from: GuardStateKind,
        to: GuardStateKind,
    },
    GuardPatrolAdvanced {
        guard: GuardId,
        waypoint: usize,
        next_move_beat: Beat,
    },
    GuardStunned {
        guard: GuardId,
        cause: StunCause,
        recovery_beat: Beat,
    },
    AlertRaised {
        guard: GuardId,
        amount: f32,
    },
    AlertLowered {
        guard: GuardId,
        amount: f32,
    },
    TargetDetected {
        guard: GuardId,
    },
    MissionFailed {
        guard: GuardId,
    },
    GuardEliminated {
        guard: GuardId,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub beat: Beat,
    pub audio_time: f64,
    pub events: Vec<SimulationEvent>,
}

struct GuardSlot {
    machine: Rc<RefCell<GuardStateMachine>>,
    listener: ListenerId,
}

/// Relays beat boundaries to the UI
struct UiBeatRelay {
    ui: Rc<dyn UiSink>,
}

impl BeatListener for UiBeatRelay {
    fn on_beat(&mut self, beat: Beat) -> std::result::Result<(), ListenerFault> {
        self.ui.on_beat(beat);
        Ok(())
    }
}

pub struct Simulation {
    seed: u64,
    clock: RhythmClock,
    judge: RhythmInputJudge,
    dispatcher: BeatDispatcher,
    matcher: Rc<RefCell<SkillSequenceMatcher>>,
    detection: DetectionConfig,
    configured_guards: Vec<GuardConfig>,
    guards: BTreeMap<GuardId, GuardSlot>,
    next_guard_id: u32,
    audio: Rc<dyn AudioSource>,
    mission: Rc<RefCell<dyn MissionSink>>,
    vision: Option<Rc<dyn VisionQuery>>,
    player: Option<Rc<RefCell<dyn PlayerCapabilities>>>,
    ui: Option<Rc<dyn UiSink>>,
    ui_relay: Option<ListenerId>,
    /// Events raised between ticks, delivered with the next report
    pending: Vec<SimulationEvent>,
}

impl Simulation {
    pub fn new(
        config: ValidatedConfig,
        audio: Rc<dyn AudioSource>,
        mission: Rc<RefCell<dyn MissionSink>>,
    ) -> Result<Self> {
        let clock = RhythmClock::new(config.rhythm.bpm)?;
        config.window.validate_for_interval(clock.beat_interval())?;

        let dispatcher = BeatDispatcher::new(clock.beat_count());
        let matcher = Rc::new(RefCell::new(SkillSequenceMatcher::new(
            config.abilities,
            &config.skills,
        )));
        let shared: SharedListener = matcher.clone();
        dispatcher.register(shared);

        Ok(Self {
            seed: config.seed,
            clock,
            judge: RhythmInputJudge::new(config.window),
            dispatcher,
            matcher,
            detection: config.detection,
            configured_guards: config.guards,
            guards: BTreeMap::new(),
            next_guard_id: 0,
            audio,
            mission,
            vision: None,
            player: None,
            ui: None,
            ui_relay: None,
            pending: Vec::new(),
        })
    }

    pub fn with_vision(mut self, vision: Rc<dyn VisionQuery>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn with_player(mut self, player: Rc<RefCell<dyn PlayerCapabilities>>) -> Self {
        self.player = Some(player);
        self
    }

    pub fn with_ui(mut self, ui: Rc<dyn UiSink>) -> Self {
        if let Some(old) = self.ui_relay.take() {
            self.dispatcher.unregister(old);
        }
        let relay: SharedListener = Rc::new(RefCell::new(UiBeatRelay { ui: Rc::clone(&ui) }));
        self.ui_relay = Some(self.dispatcher.register(relay));
        self.ui = Some(ui);
        self
    }

    pub fn clock(&self) -> &RhythmClock {
        &self.clock
    }

    pub fn judge(&self) -> &RhythmInputJudge {
        &self.judge
    }

    pub fn matcher(&self) -> Rc<RefCell<SkillSequenceMatcher>> {
        Rc::clone(&self.matcher)
    }

    pub fn current_beat(&self) -> Beat {
        self.clock.beat_count()
    }

    pub fn guard_ids(&self) -> Vec<GuardId> {
        self.guards.keys().copied().collect()
    }

    pub fn guard(&self, id: GuardId) -> Option<Rc<RefCell<GuardStateMachine>>> {
        self.guards.get(&id).map(|slot| Rc::clone(&slot.machine))
    }

    pub fn guard_state(&self, id: GuardId) -> Option<GuardState> {
        self.guards.get(&id).map(|slot| slot.machine.borrow().state())
    }

    /// Spawn a guard on the current beat
    ///
    /// Invalid config is an error. Missing collaborators yield a disabled guard.
    pub fn spawn_guard(&mut self, config: GuardConfig) -> Result<GuardId> {
        let id = GuardId(self.next_guard_id);
        let links = GuardLinks {
            vision: self.vision.clone(),
            spawn_beat: Some(self.clock.beat_count()),
            has_target: self.player.is_some(),
        };
        let machine = GuardStateMachine::new(id, config, self.detection.clone(), links, self.seed)?;
        self.next_guard_id += 1;

        tracing::info!(
            guard = %id,
            name = machine.name(),
            beat = self.clock.beat_count(),
            "Guard spawned"
        );

        let machine = Rc::new(RefCell::new(machine));
        let shared: SharedListener = machine.clone();
        let listener = self.dispatcher.register(shared);
        self.guards.insert(id, GuardSlot { machine, listener });
        Ok(id)
    }

    /// Spawn every guard from the validated config, in file order
    pub fn spawn_configured_guards(&mut self) -> Result<Vec<GuardId>> {
        let configs = std::mem::take(&mut self.configured_guards);
        configs
            .into_iter()
            .map(|config| self.spawn_guard(config))
            .collect()
    }

    /// Remove a guard; it receives no further beats
    pub fn eliminate_guard(&mut self, id: GuardId) -> bool {
        let Some(slot) = self.guards.remove(&id) else {
            return false;
        };
        self.dispatcher.unregister(slot.listener);
        self.mission.borrow_mut().on_guard_eliminated(id);
        self.pending.push(SimulationEvent::GuardEliminated { guard: id });
        tracing::info!(guard = %id, "Guard eliminated");
        true
    }

    /// Change tempo; the judgment window must still fit the new beat interval
    pub fn set_bpm(&mut self, bpm: f64) -> Result<()> {
        let mut clock = self.clock.clone();
        clock.set_bpm(bpm)?;
        self.judge.window().validate_for_interval(clock.beat_interval())?;
        self.clock = clock;
        tracing::info!(bpm, "Tempo changed");
        Ok(())
    }

    pub fn apply_difficulty(&mut self, difficulty: Difficulty) -> Result<()> {
        self.judge
            .apply_difficulty(difficulty, self.clock.beat_interval())?;
        tracing::info!(?difficulty, "Judgment difficulty changed");
        Ok(())
    }

    /// Advance one frame
    ///
    /// `dt` drives continuous updates; beat boundaries come from the audio clock.
    pub fn tick(&mut self, dt: f32, inputs: &[InputEvent]) -> TickReport {
        let mut events = std::mem::take(&mut self.pending);

        let sample = self.clock.sample(self.audio.current_audio_time());
        if let Some(stall) = sample.stall {
            events.push(SimulationEvent::BeatStall {
                from: stall.from,
                to: stall.to,
            });
        }

        let dispatch = self.dispatcher.advance(sample.beat);
        for fault in dispatch.faults {
            events.push(SimulationEvent::ListenerFault {
                beat: fault.beat,
                reason: fault.fault.to_string(),
            });
        }
        events.extend(
            dispatch
                .delivered_beats
                .into_iter()
                .map(|beat| SimulationEvent::Beat { beat }),
        );

        let snapshot = self.player_snapshot(sample.beat);
        self.update_guards(dt, snapshot.as_ref(), &mut events);

        for input in inputs {
            let judgment = self.judge.judge(&self.clock, input.time);
            if let Some(ui) = &self.ui {
                ui.on_judgment(judgment);
            }
            events.push(SimulationEvent::InputJudged {
                symbol: input.symbol,
                judgment,
                time: input.time,
            });

            let activation = self.matcher.borrow_mut().on_input(input.symbol, judgment);
            if let Some(activation) = activation {
                self.apply_activation(&activation, snapshot.as_ref(), &mut events);
            }
        }

        TickReport {
            beat: sample.beat,
            audio_time: self.clock.last_time(),
            events,
        }
    }

    fn player_snapshot(&self, beat: Beat) -> Option<PlayerSnapshot> {
        let mut snapshot = self.player.as_ref()?.borrow().snapshot(beat);
        if !self.mission.borrow().is_target_valid() {
            snapshot.targetable = false;
        }
        Some(snapshot)
    }

    fn update_guards(
        &self,
        dt: f32,
        snapshot: Option<&PlayerSnapshot>,
        events: &mut Vec<SimulationEvent>,
    ) {
        for (id, slot) in &self.guards {
            let mut guard = slot.machine.borrow_mut();
            guard.update(dt, snapshot);
            if let Some(ui) = &self.ui {
                ui.on_detection_progress(*id, guard.detection_progress());
            }
            let drained = guard.drain_events();
            drop(guard);
            forward_guard_events(*id, drained, &self.mission, events);
        }
    }

    fn apply_activation(
        &self,
        activation: &Activation,
        snapshot: Option<&PlayerSnapshot>,
        events: &mut Vec<SimulationEvent>,
    ) {
        events.push(SimulationEvent::AbilityActivated {
            name: activation.name.clone(),
            beat: activation.beat,
            perfect: activation.perfect,
            ready_at: activation.ready_at,
        });

        let stun = match activation.effect {
            Some(AbilityEffect::Paralyze { radius, beats }) => {
                Some((StunCause::Paralysis, radius, beats))
            }
            Some(AbilityEffect::Flash { radius, beats }) => Some((StunCause::Flash, radius, beats)),
            _ => None,
        };

        if let Some((cause, radius, beats)) = stun {
            match snapshot {
                Some(player) => {
                    self.stun_guards_near(player.position, radius, cause, beats, events)
                }
                None => tracing::warn!(
                    ability = %activation.name,
                    "No player position to center stun on; effect dropped"
                ),
            }
        }

        if let Some(player) = &self.player {
            let matcher = self.matcher.borrow();
            if let Some(ability) = matcher.abilities().get(activation.ability) {
                player.borrow_mut().activate(ability, activation);
            }
        }
    }

    fn stun_guards_near(
        &self,
        center: Vec2,
        radius: f32,
        cause: StunCause,
        beats: u64,
        events: &mut Vec<SimulationEvent>,
    ) {
        for (id, slot) in &self.guards {
            let mut guard = slot.machine.borrow_mut();
            if !guard.is_enabled() || guard.position().distance(&center) > radius {
                continue;
            }
            guard.apply_stun(cause, beats);
            if let GuardState::Stunned { recovery_beat, .. } = guard.state() {
                events.push(SimulationEvent::GuardStunned {
                    guard: *id,
                    cause,
                    recovery_beat,
                });
            }
            let drained = guard.drain_events();
            drop(guard);
            forward_guard_events(*id, drained, &self.mission, events);
        }
    }
}

/// Route guard outbox entries to the mission sink and the tick report
fn forward_guard_events(
    guard: GuardId,
    drained: Vec<GuardEvent>,
    mission: &Rc<RefCell<dyn MissionSink>>,
    events: &mut Vec<SimulationEvent>,
) {
    for event in drained {
        let forwarded = match event {
            GuardEvent::StateChanged { from, to } => {
                SimulationEvent::GuardStateChanged { guard, from, to }
            }
            GuardEvent::AlertRaised(amount) => {
                mission.borrow_mut().on_alert_increase(amount);
                SimulationEvent::AlertRaised { guard, amount }
            }
            GuardEvent::AlertLowered(amount) => {
                mission.borrow_mut().on_alert_decrease(amount);
                SimulationEvent::AlertLowered { guard, amount }
            }
            GuardEvent::Detected => SimulationEvent::TargetDetected { guard },
            GuardEvent::MissionFailed => {
                mission.borrow_mut().on_mission_fail();
                SimulationEvent::MissionFailed { guard }
            }
            GuardEvent::PatrolAdvanced {
                waypoint,
                next_move_beat,
            } => SimulationEvent::GuardPatrolAdvanced {
                guard,
                waypoint,
                next_move_beat,
            },
        };
        events.push(forwarded);
    }
}
