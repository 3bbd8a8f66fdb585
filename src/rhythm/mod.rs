//! Rhythm timing: audio clock, input judgment, and beat dispatch

pub mod clock;
pub mod dispatcher;
pub mod judge;

pub use clock::{BeatSample, BeatStall, RhythmClock};
pub use dispatcher::{
    BeatDispatcher, BeatListener, DispatchFault, DispatchReport, ListenerFault, ListenerId,
    SharedListener,
};
pub use judge::{Difficulty, Judgment, JudgmentTally, JudgmentWindow, RhythmInputJudge};
